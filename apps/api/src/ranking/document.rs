//! Document Text Extractor — downloads a bando sheet and flattens it to text.
//!
//! Fetching and page decoding sit behind traits so the pipeline can be driven
//! without network access or real PDFs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Url};
use thiserror::Error;
use tracing::debug;

const FETCH_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status}")]
    Status { status: u16 },

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to decode document: {0}")]
    Malformed(String),

    #[error("decoder task failed: {0}")]
    Task(String),
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Retrieves a resource by URL.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

/// Turns document bytes into pages, each a sequence of text units.
pub trait PageDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<Vec<String>>, DecodeError>;
}

// ────────────────────────────────────────────────────────────────────────────
// HTTP fetcher
// ────────────────────────────────────────────────────────────────────────────

/// reqwest-backed fetcher. Anything other than a 2xx answer is an error.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        debug!("GET {url}");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().await?)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// PDF decoder
// ────────────────────────────────────────────────────────────────────────────

/// pdf-extract backed decoder. Each non-blank line of a page is one text unit;
/// a page without text still yields an (empty) entry so page order is kept.
pub struct PdfDecoder;

impl PageDecoder for PdfDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<Vec<String>>, DecodeError> {
        let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;
        Ok(pages.iter().map(|page| page_units(page)).collect())
    }
}

fn page_units(page: &str) -> Vec<String> {
    page.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Extractor
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DocumentTextExtractor {
    fetcher: Arc<dyn ResourceFetcher>,
    decoder: Arc<dyn PageDecoder>,
}

impl DocumentTextExtractor {
    pub fn new(fetcher: Arc<dyn ResourceFetcher>, decoder: Arc<dyn PageDecoder>) -> Self {
        Self { fetcher, decoder }
    }

    /// Downloads `url` and returns its text: units joined by a space, every
    /// page terminated by a newline, page order preserved.
    pub async fn extract(&self, url: &str) -> Result<String, DocumentError> {
        let bytes = self.fetcher.fetch(url).await?;
        debug!("Fetched {} bytes from {url}", bytes.len());

        let decoder = Arc::clone(&self.decoder);
        let pages = tokio::task::spawn_blocking(move || decoder.decode(&bytes))
            .await
            .map_err(|e| DecodeError::Task(e.to_string()))??;

        debug!("Decoded {} pages from {url}", pages.len());
        Ok(join_pages(&pages))
    }
}

fn join_pages(pages: &[Vec<String>]) -> String {
    let mut text = String::new();
    for units in pages {
        text.push_str(&units.join(" "));
        text.push('\n');
    }
    text
}

/// Builds the download URL for a sheet reference. With a non-empty proxy the
/// reference travels percent-encoded in the proxy's `url` query parameter.
pub fn resolve_document_url(reference: &str, pdf_proxy_url: &str) -> Result<String, FetchError> {
    if pdf_proxy_url.is_empty() {
        return Ok(reference.to_string());
    }
    Url::parse_with_params(pdf_proxy_url, &[("url", reference)])
        .map(String::from)
        .map_err(|e| FetchError::InvalidUrl {
            url: pdf_proxy_url.to_string(),
            reason: e.to_string(),
        })
}
