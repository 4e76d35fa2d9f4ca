mod config;
mod embedding_client;
mod errors;
mod llm_client;
mod models;
mod ranking;
mod relay;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::embedding_client::EmbeddingClient;
use crate::llm_client::LlmClient;
use crate::ranking::document::{DocumentTextExtractor, HttpFetcher, PdfDecoder};
use crate::ranking::pipeline::{PipelineOptions, RankingPipeline};
use crate::ranking::scoring::{EmbeddingScorer, JudgedScorer, RelevanceScorer, ScoringStrategy};
use crate::relay::service::RelayService;
use crate::relay::upstream::HttpRelayClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting bandi relay v{}", env!("CARGO_PKG_VERSION"));

    let scorer = build_scorer(&config)?;
    info!("Relevance scorer initialized (strategy: {})", config.scoring_strategy);

    let fetcher = Arc::new(HttpFetcher::new().context("Failed to build HTTP fetcher")?);
    let documents = DocumentTextExtractor::new(fetcher.clone(), Arc::new(PdfDecoder));

    let pipeline = RankingPipeline::new(
        documents,
        scorer,
        PipelineOptions {
            container_tag: config.container_tag.clone(),
            reference_field: config.reference_field,
            pdf_proxy_url: config.pdf_proxy_url.clone(),
            concurrency: config.scoring_concurrency,
            abort_on_document_failure: config.abort_on_document_failure,
        },
    );
    info!(
        "Ranking pipeline: top_n={}, reference_field={}, concurrency={}",
        config.top_n, config.reference_field, config.scoring_concurrency
    );

    let relay_client = Arc::new(
        HttpRelayClient::new(config.upload_url.clone(), config.webhook_url.clone())
            .context("Failed to build relay HTTP client")?,
    );

    let relay = RelayService::new(
        relay_client.clone(),
        fetcher,
        relay_client,
        pipeline,
        config.response_url.clone(),
        Duration::from_secs(config.response_delay_secs),
        config.top_n,
    );

    let state = AppState { relay };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the scorer selected by `SCORING_STRATEGY`. Credentials were
/// checked by `Config::from_env`.
fn build_scorer(config: &Config) -> Result<Arc<dyn RelevanceScorer>> {
    match config.scoring_strategy {
        ScoringStrategy::Embedding => {
            let api_key = config
                .openai_api_key
                .clone()
                .context("OPENAI_API_KEY is not set")?;
            let client = EmbeddingClient::new(api_key)?;
            info!("Embedding client initialized (model: {})", embedding_client::EMBEDDING_MODEL);
            Ok(Arc::new(EmbeddingScorer::new(Arc::new(client))))
        }
        ScoringStrategy::Judged => {
            let api_key = config
                .anthropic_api_key
                .clone()
                .context("ANTHROPIC_API_KEY is not set")?;
            let client = LlmClient::new(api_key)?;
            info!("LLM client initialized (model: {})", llm_client::MODEL);
            Ok(Arc::new(JudgedScorer::new(Arc::new(client))))
        }
    }
}
