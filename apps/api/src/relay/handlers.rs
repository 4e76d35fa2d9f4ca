//! Axum route handlers for the relay API.

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::ranking::pipeline::ScoredResult;
use crate::relay::service::RelayOutcome;
use crate::relay::submission::Submission;
use crate::state::AppState;

const DELIVERED_MESSAGE: &str = "Webhook inviato con successo.";
const NO_OPPORTUNITIES_MESSAGE: &str = "Nessun bando disponibile per questa azienda.";

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_candidates: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<ScoredResult>,
}

impl From<RelayOutcome> for ProcessResponse {
    fn from(outcome: RelayOutcome) -> Self {
        match outcome {
            RelayOutcome::Delivered {
                total_candidates,
                results,
            } => Self {
                message: DELIVERED_MESSAGE.to_string(),
                total_candidates: Some(total_candidates),
                results,
            },
            RelayOutcome::NoOpportunities => Self {
                message: NO_OPPORTUNITIES_MESSAGE.to_string(),
                total_candidates: None,
                results: Vec::new(),
            },
        }
    }
}

/// POST /api/process
///
/// Relays one business submission and reports what reached the webhook.
pub async fn handle_process(
    State(state): State<AppState>,
    Json(submission): Json<Submission>,
) -> Result<Json<ProcessResponse>, AppError> {
    let invocation_id = Uuid::new_v4();
    let profile = submission.into_profile();
    if profile.email.trim().is_empty() {
        return Err(AppError::Validation("email cannot be empty".to_string()));
    }

    let span = info_span!("process", %invocation_id);
    let outcome = async {
        info!("Received submission for '{}'", profile.company_name);
        state.relay.process(&profile).await
    }
    .instrument(span)
    .await?;

    Ok(Json(outcome.into()))
}
