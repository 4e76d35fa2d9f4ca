use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::ranking::candidates::ReferenceField;
use crate::ranking::pipeline::{DEFAULT_CONTAINER_TAG, DEFAULT_TOP_N};
use crate::ranking::scoring::ScoringStrategy;

const DEFAULT_UPLOAD_URL: &str = "https://xmlautomation-rt2n.onrender.com/upload-xml";
const DEFAULT_RESPONSE_URL: &str = "https://www.geniabusiness.com/ingplan/xmlbandiazienda.asp";
const DEFAULT_PDF_PROXY_URL: &str = "https://xmlautomation-rt2n.onrender.com/pdf-proxy";

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub webhook_url: String,
    pub upload_url: String,
    pub response_url: String,
    /// Empty string disables the proxy and PDFs are fetched directly.
    pub pdf_proxy_url: String,
    pub response_delay_secs: u64,
    pub scoring_strategy: ScoringStrategy,
    pub reference_field: ReferenceField,
    pub container_tag: String,
    pub top_n: usize,
    pub scoring_concurrency: usize,
    pub abort_on_document_failure: bool,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let scoring_strategy: ScoringStrategy = parse_env("SCORING_STRATEGY", "embedding")?;
        let openai_api_key = optional_env("OPENAI_API_KEY");
        let anthropic_api_key = optional_env("ANTHROPIC_API_KEY");

        match scoring_strategy {
            ScoringStrategy::Embedding if openai_api_key.is_none() => {
                bail!("OPENAI_API_KEY is required when SCORING_STRATEGY=embedding")
            }
            ScoringStrategy::Judged if anthropic_api_key.is_none() => {
                bail!("ANTHROPIC_API_KEY is required when SCORING_STRATEGY=judged")
            }
            _ => {}
        }

        let top_n: usize = parse_env("TOP_N", &DEFAULT_TOP_N.to_string())?;
        if top_n == 0 {
            bail!("TOP_N must be at least 1");
        }

        Ok(Config {
            openai_api_key,
            anthropic_api_key,
            webhook_url: require_env("WEBHOOK_URL")?,
            upload_url: env_or("UPLOAD_URL", DEFAULT_UPLOAD_URL),
            response_url: env_or("RESPONSE_URL", DEFAULT_RESPONSE_URL),
            pdf_proxy_url: env_or("PDF_PROXY_URL", DEFAULT_PDF_PROXY_URL),
            response_delay_secs: parse_env("RESPONSE_DELAY_SECS", "30")?,
            scoring_strategy,
            reference_field: parse_env("REFERENCE_FIELD", "schedasintetica")?,
            container_tag: env_or("CONTAINER_TAG", DEFAULT_CONTAINER_TAG),
            top_n,
            scoring_concurrency: parse_env::<usize>("SCORING_CONCURRENCY", "1")?.max(1),
            abort_on_document_failure: parse_env("ABORT_ON_DOCUMENT_FAILURE", "false")?,
            port: parse_env("PORT", "8080")?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env_or(key, default);
    raw.trim()
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("{key} has invalid value '{raw}': {e}"))
}
