//! Relay workflow — one submission, end to end.
//!
//! Flow: profile → XML upload → fixed wait → response fetch → rank →
//!       webhook (only when there is something to report).
//!
//! No webhook is sent when the invocation fails: a partial ranking must never
//! look complete downstream.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::models::applicant::ApplicantProfile;
use crate::ranking::document::ResourceFetcher;
use crate::ranking::error::PipelineError;
use crate::ranking::pipeline::{RankOutcome, RankingPipeline, ScoredResult};
use crate::ranking::scoring::ScoringStrategy;
use crate::relay::submission::profile_to_xml;
use crate::relay::upstream::{SubmissionSink, WebhookPayload, WebhookSink};
use crate::relay::RelayError;

#[derive(Debug, Clone, PartialEq)]
pub enum RelayOutcome {
    Delivered {
        total_candidates: usize,
        results: Vec<ScoredResult>,
    },
    NoOpportunities,
}

#[derive(Clone)]
pub struct RelayService {
    uploader: Arc<dyn SubmissionSink>,
    fetcher: Arc<dyn ResourceFetcher>,
    webhook: Arc<dyn WebhookSink>,
    pipeline: RankingPipeline,
    response_url: String,
    response_delay: Duration,
    top_n: usize,
}

impl RelayService {
    pub fn new(
        uploader: Arc<dyn SubmissionSink>,
        fetcher: Arc<dyn ResourceFetcher>,
        webhook: Arc<dyn WebhookSink>,
        pipeline: RankingPipeline,
        response_url: String,
        response_delay: Duration,
        top_n: usize,
    ) -> Self {
        Self {
            uploader,
            fetcher,
            webhook,
            pipeline,
            response_url,
            response_delay,
            top_n,
        }
    }

    pub fn strategy(&self) -> ScoringStrategy {
        self.pipeline.strategy()
    }

    pub async fn process(&self, profile: &ApplicantProfile) -> Result<RelayOutcome, RelayError> {
        let xml = profile_to_xml(profile);
        self.uploader.upload(&xml).await?;

        info!(
            "Waiting {}s for the matching service to build its response",
            self.response_delay.as_secs()
        );
        tokio::time::sleep(self.response_delay).await;

        let raw_response = self.fetch_response().await?;

        let outcome = self.pipeline.rank(profile, &raw_response, self.top_n).await?;
        match outcome {
            RankOutcome::NoOpportunities => {
                warn!("No bandi available for {}", profile.company_name);
                Ok(RelayOutcome::NoOpportunities)
            }
            RankOutcome::Ranked {
                results,
                total_candidates,
            } => {
                let payload =
                    WebhookPayload::from_ranking(&profile.email, total_candidates, &results);
                self.webhook.deliver(&payload).await?;
                Ok(RelayOutcome::Delivered {
                    total_candidates,
                    results,
                })
            }
        }
    }

    async fn fetch_response(&self) -> Result<String, PipelineError> {
        let bytes = self
            .fetcher
            .fetch(&self.response_url)
            .await
            .map_err(|e| PipelineError::ResourceFetch {
                url: self.response_url.clone(),
                reason: e.to_string(),
            })?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let preview: String = text.chars().take(100).collect();
        info!("Response document received: {preview}...");
        Ok(text)
    }
}
