use axum::body::Bytes;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::error::{ApiError, InvalidRequestSnafu};
use super::require_banner;
use super::state::{bounded, App};
use crate::store::{BannerStatPoint, ClickStore, StatPoint};
use crate::time::{parse_rfc3339, Timestamp};

/// Body of both stats queries. Fields are optional here so that a missing field is reported
/// the same way as a malformed one.
#[derive(Debug, Default, Deserialize)]
pub struct StatsRequest {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse<T> {
    pub stats: Vec<T>,
}

/// A half-open `[from, to)` window of buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub from: Timestamp,
    pub to: Timestamp,
}

impl Window {
    pub fn from_body(body: &[u8]) -> Result<Self, ApiError> {
        let request: StatsRequest = match serde_json::from_slice(body) {
            Ok(request) => request,
            Err(_) => return InvalidRequestSnafu { reason: "invalid JSON" }.fail(),
        };

        Ok(Window {
            from: timestamp("from", request.from.as_deref())?,
            to: timestamp("to", request.to.as_deref())?,
        })
    }
}

fn timestamp(field: &str, value: Option<&str>) -> Result<Timestamp, ApiError> {
    match value {
        None | Some("") => InvalidRequestSnafu {
            reason: format!("missing {field}"),
        }
        .fail(),
        Some(value) => parse_rfc3339(value).map_err(|_| {
            InvalidRequestSnafu {
                reason: format!("invalid {field}"),
            }
            .build()
        }),
    }
}

/// `POST /stats/{bannerId}`: per-minute counts of one banner, ascending by minute.
#[instrument(skip(app, body))]
pub async fn query_one<S: ClickStore>(
    State(app): State<App<S>>, banner: Result<Path<String>, PathRejection>, body: Bytes,
) -> Result<Json<StatsResponse<StatPoint>>, ApiError> {
    let banner = require_banner(banner)?;
    let Window { from, to } = Window::from_body(&body)?;

    let stats = bounded(
        "range",
        app.deadlines.stats_timeout,
        app.store.range(&banner, from, to),
    )
    .await?;

    Ok(Json(StatsResponse { stats }))
}

/// `POST /stats`: per-minute counts of every banner, ordered by banner then minute.
#[instrument(skip(app, body))]
pub async fn query_all<S: ClickStore>(
    State(app): State<App<S>>, body: Bytes,
) -> Result<Json<StatsResponse<BannerStatPoint>>, ApiError> {
    let Window { from, to } = Window::from_body(&body)?;

    let stats = bounded(
        "range_all",
        app.deadlines.stats_all_timeout,
        app.store.range_all(from, to),
    )
    .await?;

    Ok(Json(StatsResponse { stats }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(error: ApiError) -> String {
        match error {
            ApiError::InvalidRequest { reason, .. } => reason,
            other => panic!("expected an invalid request, got {other:?}"),
        }
    }

    #[test]
    fn parses_window() {
        let window =
            Window::from_body(br#"{"from":"2024-01-01T00:00:00Z","to":"2024-01-01T03:00:00+03:00"}"#)
                .unwrap();

        assert_eq!(window.from, parse_rfc3339("2024-01-01T00:00:00Z").unwrap());
        assert_eq!(window.to, window.from, "offsets are normalized to utc");
    }

    #[test]
    fn reports_which_field_is_wrong() {
        assert_eq!(reason(Window::from_body(b"").unwrap_err()), "invalid JSON");
        assert_eq!(reason(Window::from_body(b"{").unwrap_err()), "invalid JSON");
        assert_eq!(
            reason(Window::from_body(br#"{"to":"2024-01-01T00:00:00Z"}"#).unwrap_err()),
            "missing from"
        );
        assert_eq!(
            reason(Window::from_body(br#"{"from":"2024-01-01T00:00:00Z","to":""}"#).unwrap_err()),
            "missing to"
        );
        assert_eq!(
            reason(
                Window::from_body(br#"{"from":"yesterday","to":"2024-01-01T00:00:00Z"}"#)
                    .unwrap_err()
            ),
            "invalid from"
        );
    }

    #[test]
    fn non_string_timestamps_are_malformed_json() {
        let error = Window::from_body(br#"{"from":1704067200,"to":1704067260}"#).unwrap_err();
        assert_eq!(reason(error), "invalid JSON");
    }
}
