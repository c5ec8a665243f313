use axum::extract::path::ErrorKind;
use axum::extract::rejection::PathRejection;
use axum::extract::Path;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::store::ClickStore;

mod counter;
mod error;
mod state;
mod stats;

pub use error::*;

use self::error::InvalidRequestSnafu;
pub use state::App;
pub use stats::{StatsRequest, StatsResponse, Window};

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

/// Build the HTTP surface on top of `app`.
///
/// `/counter`, `/counter/` and `/stats/` are routed explicitly so that an empty banner segment is answered
/// with `400 Bad Request` rather than falling through to `404`.
pub fn create_router<S: ClickStore>(app: App<S>) -> Router {
    Router::new()
        .route("/counter/:banner_id", get(counter::record_click::<S>))
        .route("/counter/", get(counter::record_click::<S>))
        .route("/counter", get(counter::record_click::<S>))
        .route("/stats/:banner_id", post(stats::query_one::<S>))
        .route("/stats/", post(stats::query_one::<S>))
        .route("/stats", post(stats::query_all::<S>))
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}

/// The `bannerId` path segment. Routes without the segment reject with a parameter count mismatch.
fn require_banner(banner: Result<Path<String>, PathRejection>) -> Result<String> {
    let reason = match banner {
        Ok(Path(banner)) if !banner.is_empty() => return Ok(banner),
        Ok(_) | Err(PathRejection::MissingPathParams(_)) => "missing bannerId",
        Err(PathRejection::FailedToDeserializePathParams(error)) => match error.kind() {
            ErrorKind::WrongNumberOfParameters { .. } => "missing bannerId",
            _ => "invalid bannerId",
        },
        Err(_) => "invalid bannerId",
    };

    InvalidRequestSnafu { reason }.fail()
}
