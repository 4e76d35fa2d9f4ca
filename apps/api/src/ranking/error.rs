use thiserror::Error;

/// Failures that abort a whole ranking invocation.
///
/// An empty candidate set is not represented here: it is the
/// `RankOutcome::NoOpportunities` value.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("malformed response document: {0}")]
    MalformedResponse(String),

    #[error("failed to fetch {url}: {reason}")]
    ResourceFetch { url: String, reason: String },

    #[error("scoring service error: {0}")]
    ScoringService(String),
}
