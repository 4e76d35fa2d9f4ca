//! Relevance Scorer — pluggable strategies that rate a bando against the applicant.
//!
//! Strategy A (`EmbeddingScorer`): cosine similarity between the applicant
//! text embedding and the embedding of the first 2000 characters of the bando.
//! Strategy B (`JudgedScorer`): an LLM reads the applicant text and the first
//! 4000 characters of the bando and answers with an integer 0–100.
//!
//! Scorers report service failures as `ScoringError`; whether a failure
//! degrades one candidate or aborts the invocation is decided by the pipeline
//! from `ScoringStrategy::aborts_on_failure`.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::applicant::ApplicantProfile;
use crate::ranking::prompts::{RELEVANCE_JUDGE_PROMPT_TEMPLATE, RELEVANCE_JUDGE_SYSTEM};

/// Characters of bando text sent to the embedding service.
pub const EMBEDDING_INPUT_CHARS: usize = 2000;
/// Characters of bando text sent to the judging service.
pub const JUDGE_INPUT_CHARS: usize = 4000;
pub const MAX_JUDGED_SCORE: u32 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringStrategy {
    #[default]
    Embedding,
    Judged,
}

impl ScoringStrategy {
    /// Judged scores are authoritative: one failed call invalidates the batch.
    pub fn aborts_on_failure(self) -> bool {
        matches!(self, ScoringStrategy::Judged)
    }
}

impl fmt::Display for ScoringStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringStrategy::Embedding => f.write_str("embedding"),
            ScoringStrategy::Judged => f.write_str("judged"),
        }
    }
}

impl FromStr for ScoringStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "embedding" | "embeddings" => Ok(ScoringStrategy::Embedding),
            "judged" | "llm" => Ok(ScoringStrategy::Judged),
            other => Err(format!(
                "unknown scoring strategy '{other}' (expected embedding or judged)"
            )),
        }
    }
}

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("embedding service error: {0}")]
    Embedding(String),

    #[error("judging service error: {0}")]
    Judge(String),
}

/// Score assigned to one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Relevance {
    pub score: f64,
    /// Full judge answer; only produced by the judged strategy.
    pub rationale: Option<String>,
}

impl Relevance {
    pub fn zero() -> Self {
        Self {
            score: 0.0,
            rationale: None,
        }
    }
}

/// Applicant-side inputs, computed once per invocation and shared by every
/// candidate's scoring call.
#[derive(Debug, Clone, Default)]
pub struct ApplicantContext {
    pub particularities: String,
    pub improvement_goals: String,
    pub combined_text: String,
    pub embedding: Option<Vec<f32>>,
}

impl ApplicantContext {
    pub fn from_profile(profile: &ApplicantProfile) -> Self {
        Self {
            particularities: profile.particularities.clone(),
            improvement_goals: profile.improvement_goals.clone(),
            combined_text: profile.combined_text(),
            embedding: None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// External service contracts
// ────────────────────────────────────────────────────────────────────────────

/// Text → fixed-length vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ScoringError>;
}

/// Prompt → free-form answer.
#[async_trait]
pub trait Judge: Send + Sync {
    async fn judge(&self, prompt: &str, system: &str) -> Result<String, ScoringError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Scorer trait
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait RelevanceScorer: Send + Sync {
    fn strategy(&self) -> ScoringStrategy;

    /// Computes the applicant-side state reused for every candidate.
    async fn prepare(&self, profile: &ApplicantProfile) -> Result<ApplicantContext, ScoringError> {
        Ok(ApplicantContext::from_profile(profile))
    }

    async fn score(
        &self,
        applicant: &ApplicantContext,
        document_text: &str,
    ) -> Result<Relevance, ScoringError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Strategy A — embedding similarity
// ────────────────────────────────────────────────────────────────────────────

pub struct EmbeddingScorer {
    embedder: Arc<dyn Embedder>,
}

impl EmbeddingScorer {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }
}

#[async_trait]
impl RelevanceScorer for EmbeddingScorer {
    fn strategy(&self) -> ScoringStrategy {
        ScoringStrategy::Embedding
    }

    async fn prepare(&self, profile: &ApplicantProfile) -> Result<ApplicantContext, ScoringError> {
        let mut applicant = ApplicantContext::from_profile(profile);
        if applicant.combined_text.is_empty() {
            warn!("Applicant profile has no descriptive text; all similarities will be 0");
            return Ok(applicant);
        }
        applicant.embedding = Some(self.embedder.embed(&applicant.combined_text).await?);
        Ok(applicant)
    }

    async fn score(
        &self,
        applicant: &ApplicantContext,
        document_text: &str,
    ) -> Result<Relevance, ScoringError> {
        let Some(applicant_embedding) = applicant.embedding.as_deref() else {
            return Ok(Relevance::zero());
        };
        if document_text.trim().is_empty() {
            return Ok(Relevance::zero());
        }

        let document_embedding = self
            .embedder
            .embed(truncate_chars(document_text, EMBEDDING_INPUT_CHARS))
            .await?;

        if applicant_embedding.len() != document_embedding.len() {
            warn!(
                "Embedding dimensions differ ({} vs {}); similarity set to 0",
                applicant_embedding.len(),
                document_embedding.len()
            );
            return Ok(Relevance::zero());
        }

        Ok(Relevance {
            score: cosine_similarity(applicant_embedding, &document_embedding),
            rationale: None,
        })
    }
}

/// `dot(a, b) / (|a| * |b|)`. Returns 0 for vectors of different length and
/// for zero-norm vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum();
    let norm_a = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        // `+ 0.0` folds a negative zero from orthogonal vectors into 0.0.
        (dot / (norm_a * norm_b)).clamp(-1.0, 1.0) + 0.0
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Strategy B — judged scoring
// ────────────────────────────────────────────────────────────────────────────

pub struct JudgedScorer {
    judge: Arc<dyn Judge>,
}

impl JudgedScorer {
    pub fn new(judge: Arc<dyn Judge>) -> Self {
        Self { judge }
    }
}

#[async_trait]
impl RelevanceScorer for JudgedScorer {
    fn strategy(&self) -> ScoringStrategy {
        ScoringStrategy::Judged
    }

    async fn score(
        &self,
        applicant: &ApplicantContext,
        document_text: &str,
    ) -> Result<Relevance, ScoringError> {
        let prompt = build_judge_prompt(applicant, document_text);
        let answer = self.judge.judge(&prompt, RELEVANCE_JUDGE_SYSTEM).await?;

        let score = parse_judged_score(&answer);
        debug!("Judge answered {score}/{MAX_JUDGED_SCORE}");

        Ok(Relevance {
            score: f64::from(score),
            rationale: Some(answer),
        })
    }
}

fn build_judge_prompt(applicant: &ApplicantContext, document_text: &str) -> String {
    RELEVANCE_JUDGE_PROMPT_TEMPLATE
        .replace("{particularities}", &applicant.particularities)
        .replace("{improvement_goals}", &applicant.improvement_goals)
        .replace(
            "{document_text}",
            truncate_chars(document_text, JUDGE_INPUT_CHARS),
        )
}

/// First run of ASCII digits in `answer`, capped at 100. No digits → 0.
pub fn parse_judged_score(answer: &str) -> u32 {
    static FIRST_INTEGER: OnceLock<Regex> = OnceLock::new();
    let re = FIRST_INTEGER.get_or_init(|| Regex::new(r"[0-9]+").expect("valid regex"));

    match re.find(answer) {
        // a digit run too long for u32 is certainly above the cap
        Some(m) => m
            .as_str()
            .parse::<u32>()
            .map_or(MAX_JUDGED_SCORE, |n| n.min(MAX_JUDGED_SCORE)),
        None => 0,
    }
}

/// Prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
