//! HTTP side of the relay: XML upload to the matching service and webhook delivery.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use crate::ranking::pipeline::ScoredResult;
use crate::relay::RelayError;

const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Receives the serialised applicant XML.
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    async fn upload(&self, xml: &str) -> Result<(), RelayError>;
}

/// Receives the final ranking.
#[async_trait]
pub trait WebhookSink: Send + Sync {
    async fn deliver(&self, payload: &WebhookPayload) -> Result<(), RelayError>;
}

/// Body posted to the webhook. The automation on the other side reads a
/// single pre-formatted string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookPayload {
    pub response: String,
}

impl WebhookPayload {
    pub fn from_ranking(email: &str, total_candidates: usize, results: &[ScoredResult]) -> Self {
        let bandi = results
            .iter()
            .map(|r| {
                format!(
                    "Nome: {}, Link: {}, Punteggio: {:.3}",
                    r.name, r.document_reference, r.score
                )
            })
            .collect::<Vec<_>>()
            .join(" | ");
        Self {
            response: format!("numeroBandiTotali: {total_candidates} email={email} bandi={bandi}"),
        }
    }
}

#[derive(Clone)]
pub struct HttpRelayClient {
    client: Client,
    upload_url: String,
    webhook_url: String,
}

impl HttpRelayClient {
    pub fn new(upload_url: String, webhook_url: String) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            upload_url,
            webhook_url,
        })
    }
}

#[async_trait]
impl SubmissionSink for HttpRelayClient {
    async fn upload(&self, xml: &str) -> Result<(), RelayError> {
        debug!("Uploading applicant XML ({} bytes) to {}", xml.len(), self.upload_url);
        let response = self
            .client
            .post(&self.upload_url)
            .header(reqwest::header::CONTENT_TYPE, "application/xml")
            .body(xml.to_string())
            .send()
            .await
            .map_err(|e| RelayError::Upload(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Upload(format!("status {status}")));
        }
        info!("Applicant XML accepted by matching service");
        Ok(())
    }
}

#[async_trait]
impl WebhookSink for HttpRelayClient {
    async fn deliver(&self, payload: &WebhookPayload) -> Result<(), RelayError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(payload)
            .send()
            .await
            .map_err(|e| RelayError::Webhook(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Webhook(format!("status {status}")));
        }
        info!("Ranking delivered to webhook");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_lists_results_in_order() {
        let results = vec![
            ScoredResult {
                name: "Transizione 5.0".to_string(),
                document_reference: "https://b/t50.pdf".to_string(),
                score: 0.8731,
                rationale: None,
            },
            ScoredResult {
                name: "N/A".to_string(),
                document_reference: String::new(),
                score: 0.0,
                rationale: None,
            },
        ];
        let payload = WebhookPayload::from_ranking("info@rossi.it", 7, &results);
        assert_eq!(
            payload.response,
            "numeroBandiTotali: 7 email=info@rossi.it bandi=Nome: Transizione 5.0, Link: https://b/t50.pdf, Punteggio: 0.873 | Nome: N/A, Link: , Punteggio: 0.000"
        );
    }

    #[test]
    fn test_payload_serializes_single_field() {
        let payload = WebhookPayload::from_ranking("a@b.it", 0, &[]);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json, serde_json::json!({"response": "numeroBandiTotali: 0 email=a@b.it bandi="}));
    }
}
