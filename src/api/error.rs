use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use snafu::{Location, Snafu};

use crate::store::StoreError;

#[derive(Debug, Snafu, Serialize)]
#[serde(tag = "error")]
#[snafu(visibility(pub(crate)))]
pub enum ApiError {
    #[snafu(display("{reason}"))]
    InvalidRequest {
        #[serde(skip)]
        reason: String,

        #[serde(skip)]
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("{source}"))]
    StorageUnavailable {
        #[serde(skip)]
        source: StoreError,

        #[serde(skip)]
        #[snafu(implicit)]
        location: Location,
    },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::StorageUnavailable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: String,
    #[serde(flatten)]
    data: ApiError,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            ApiError::InvalidRequest { reason, .. } => {
                tracing::debug!(%reason, "rejected request");
            }
            ApiError::StorageUnavailable { source, location } => {
                tracing::error!(error = %source, %location, "store call failed");
            }
        }

        let content = ErrorResponse {
            message: self.to_string(),
            data: self,
        };

        (status, Json(content)).into_response()
    }
}
