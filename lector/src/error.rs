use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LectorError {
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Recognition error: {0}")]
    Recognition(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Only transport-level rejections reach the wire through this impl.
/// Pipeline faults are folded into a `RecognitionResult` before they
/// can escape (see `pipeline.rs`).
impl IntoResponse for LectorError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            LectorError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            LectorError::Decode(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            LectorError::EngineUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            LectorError::Recognition(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            LectorError::Cancelled(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message,
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, LectorError>;
