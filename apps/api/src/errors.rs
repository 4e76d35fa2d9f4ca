use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::ranking::error::PipelineError;
use crate::relay::RelayError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Malformed response document: {0}")]
    MalformedResponse(String),

    #[error("Resource fetch error: {0}")]
    ResourceFetch(String),

    #[error("Scoring service error: {0}")]
    ScoringService(String),

    #[error("Upstream upload error: {0}")]
    Upload(String),

    #[error("Webhook error: {0}")]
    Webhook(String),
}

impl From<PipelineError> for AppError {
    fn from(error: PipelineError) -> Self {
        match error {
            PipelineError::MalformedResponse(msg) => AppError::MalformedResponse(msg),
            e @ PipelineError::ResourceFetch { .. } => AppError::ResourceFetch(e.to_string()),
            PipelineError::ScoringService(msg) => AppError::ScoringService(msg),
        }
    }
}

impl From<RelayError> for AppError {
    fn from(error: RelayError) -> Self {
        match error {
            RelayError::Upload(msg) => AppError::Upload(msg),
            RelayError::Pipeline(e) => e.into(),
            RelayError::Webhook(msg) => AppError::Webhook(msg),
        }
    }
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::MalformedResponse(_) => (StatusCode::BAD_GATEWAY, "MALFORMED_RESPONSE"),
            AppError::ResourceFetch(_) => (StatusCode::BAD_GATEWAY, "RESOURCE_FETCH_ERROR"),
            AppError::ScoringService(_) => (StatusCode::BAD_GATEWAY, "SCORING_SERVICE_ERROR"),
            AppError::Upload(_) => (StatusCode::BAD_GATEWAY, "UPLOAD_ERROR"),
            AppError::Webhook(_) => (StatusCode::BAD_GATEWAY, "WEBHOOK_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            AppError::Validation(msg) => msg.clone(),
            other => {
                tracing::error!("{other}");
                other.to_string()
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
