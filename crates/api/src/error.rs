//! API error responses

use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use data_validator::ValidationError;
use serde_json::json;
use storage::StorageError;
use thiserror::Error;
use tracing::{error, warn};

/// Errors a handler can return
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request parameters; nothing was stored
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Query string could not be decoded
    #[error("{0}")]
    Query(#[from] QueryRejection),

    /// The store failed
    #[error("store error: {0}")]
    Storage(#[from] StorageError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Query(_) => StatusCode::BAD_REQUEST,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Validation(_) | ApiError::Query(_) => warn!("Rejected request: {}", self),
            ApiError::Storage(e) => error!("Store failure: {}", e),
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
