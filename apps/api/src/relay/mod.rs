// Submission relay: form → upstream XML → wait → response → ranking → webhook.

use thiserror::Error;

use crate::ranking::error::PipelineError;

pub mod handlers;
pub mod service;
pub mod submission;
pub mod upstream;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("upload to matching service failed: {0}")]
    Upload(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("webhook delivery failed: {0}")]
    Webhook(String),
}
