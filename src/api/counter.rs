use std::num::NonZeroU64;

use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::instrument;

use super::error::ApiError;
use super::state::{bounded, App};
use super::require_banner;
use crate::store::ClickStore;
use crate::time::current_bucket;

/// `GET /counter/{bannerId}`: count one click for the banner in the current minute.
#[instrument(skip(app))]
pub async fn record_click<S: ClickStore>(
    State(app): State<App<S>>, banner: Result<Path<String>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let banner = require_banner(banner)?;

    // attributed to the minute the request arrived in, not to when the click happened
    let bucket = current_bucket();

    bounded(
        "increment",
        app.deadlines.counter_timeout,
        app.store.increment(&banner, bucket, NonZeroU64::MIN),
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
