//! Error types for the server

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::error::HarError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<HarError> for ServerError {
    fn from(err: HarError) -> Self {
        match err {
            HarError::InvalidInput(msg) => ServerError::InvalidInput(msg),
            HarError::ShapeError { expected, actual } => {
                ServerError::InvalidInput(format!("expected shape {}, got {}", expected, actual))
            }
            HarError::InferenceFailure(msg) => ServerError::Inference(msg),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ServerError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ServerError::Inference(msg) => {
                tracing::error!(detail = %msg, "Inference failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "Inference failed. Check server logs for details.".to_string())
            }
            ServerError::Internal(msg) => {
                tracing::error!(detail = %msg, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal error occurred".to_string())
            }
        };

        let body = Json(json!({
            "error": true,
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
