//! Ranking Pipeline — response document in, top-N scored bandi out.
//!
//! Flow: parse response → extract candidates → (per candidate) fetch and
//!       flatten the PDF sheet → score against the applicant → stable sort
//!       by score → truncate to top-N.
//!
//! Failure policy:
//! - unparseable response → `MalformedResponse`, abort
//! - sheet download/decoding failure → empty text for that candidate, unless
//!   `abort_on_document_failure` is set
//! - scoring failure → score 0 for that candidate under the embedding
//!   strategy, abort under the judged strategy

use std::cmp::Ordering;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::models::applicant::ApplicantProfile;
use crate::ranking::candidates::{extract_candidates, CandidateRecord, ReferenceField};
use crate::ranking::document::{resolve_document_url, DocumentTextExtractor};
use crate::ranking::error::PipelineError;
use crate::ranking::scoring::{ApplicantContext, Relevance, RelevanceScorer, ScoringStrategy};
use crate::ranking::xml::parse_document;

pub const DEFAULT_TOP_N: usize = 3;
pub const DEFAULT_CONTAINER_TAG: &str = "child";

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub container_tag: String,
    pub reference_field: ReferenceField,
    /// Empty string fetches sheets directly.
    pub pdf_proxy_url: String,
    /// 1 processes candidates strictly one after another.
    pub concurrency: usize,
    pub abort_on_document_failure: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            container_tag: DEFAULT_CONTAINER_TAG.to_string(),
            reference_field: ReferenceField::default(),
            pdf_proxy_url: String::new(),
            concurrency: 1,
            abort_on_document_failure: false,
        }
    }
}

/// A candidate with its final score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredResult {
    pub name: String,
    pub document_reference: String,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl ScoredResult {
    fn new(candidate: CandidateRecord, relevance: Relevance) -> Self {
        Self {
            name: candidate.name,
            document_reference: candidate.document_reference,
            score: relevance.score,
            rationale: relevance.rationale,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RankOutcome {
    Ranked {
        results: Vec<ScoredResult>,
        total_candidates: usize,
    },
    /// The response parsed but listed no bandi.
    NoOpportunities,
}

#[derive(Clone)]
pub struct RankingPipeline {
    documents: DocumentTextExtractor,
    scorer: Arc<dyn RelevanceScorer>,
    options: Arc<PipelineOptions>,
}

impl RankingPipeline {
    pub fn new(
        documents: DocumentTextExtractor,
        scorer: Arc<dyn RelevanceScorer>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            documents,
            scorer,
            options: Arc::new(options),
        }
    }

    pub fn strategy(&self) -> ScoringStrategy {
        self.scorer.strategy()
    }

    /// Ranks the bandi listed in `raw_response` for `profile` and keeps the
    /// best `top_n`. Equal scores keep their order of appearance.
    pub async fn rank(
        &self,
        profile: &ApplicantProfile,
        raw_response: &str,
        top_n: usize,
    ) -> Result<RankOutcome, PipelineError> {
        let root = parse_document(raw_response)
            .map_err(|e| PipelineError::MalformedResponse(e.to_string()))?;

        let candidates = extract_candidates(
            &root,
            &self.options.container_tag,
            self.options.reference_field,
        );
        if candidates.is_empty() {
            info!(
                "No <{}> entries in response; no opportunities for this applicant",
                self.options.container_tag
            );
            return Ok(RankOutcome::NoOpportunities);
        }

        let total_candidates = candidates.len();
        info!(
            "Ranking {total_candidates} candidates (strategy={}, reference={}, concurrency={})",
            self.strategy(),
            self.options.reference_field,
            self.options.concurrency
        );

        let applicant = self.prepare_applicant(profile).await?;

        let scored = if self.options.concurrency <= 1 {
            self.score_sequentially(candidates, &applicant).await?
        } else {
            self.score_concurrently(candidates, Arc::new(applicant))
                .await?
        };

        let results = rank_by_score(scored, top_n);
        info!(
            "Top {} of {total_candidates}: {:?}",
            results.len(),
            results.iter().map(|r| r.name.as_str()).collect::<Vec<_>>()
        );

        Ok(RankOutcome::Ranked {
            results,
            total_candidates,
        })
    }

    async fn prepare_applicant(
        &self,
        profile: &ApplicantProfile,
    ) -> Result<ApplicantContext, PipelineError> {
        match self.scorer.prepare(profile).await {
            Ok(applicant) => Ok(applicant),
            Err(e) if self.strategy().aborts_on_failure() => {
                Err(PipelineError::ScoringService(e.to_string()))
            }
            Err(e) => {
                warn!("Applicant embedding failed, every candidate will score 0: {e}");
                Ok(ApplicantContext::from_profile(profile))
            }
        }
    }

    async fn score_sequentially(
        &self,
        candidates: Vec<CandidateRecord>,
        applicant: &ApplicantContext,
    ) -> Result<Vec<ScoredResult>, PipelineError> {
        let mut scored = Vec::with_capacity(candidates.len());
        for (index, candidate) in candidates.into_iter().enumerate() {
            scored.push(self.score_candidate(index, candidate, applicant).await?);
        }
        Ok(scored)
    }

    /// Runs at most `concurrency` candidates at once. Started candidates run
    /// to completion even after another one failed; the first failure is
    /// reported once all of them are done.
    async fn score_concurrently(
        &self,
        candidates: Vec<CandidateRecord>,
        applicant: Arc<ApplicantContext>,
    ) -> Result<Vec<ScoredResult>, PipelineError> {
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency));
        let mut tasks = JoinSet::new();
        let count = candidates.len();

        for (index, candidate) in candidates.into_iter().enumerate() {
            let pipeline = self.clone();
            let applicant = Arc::clone(&applicant);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let result = pipeline.score_candidate(index, candidate, &applicant).await;
                (index, result)
            });
        }

        let mut slots: Vec<Option<ScoredResult>> = vec![None; count];
        let mut first_error: Option<(usize, PipelineError)> = None;

        while let Some(joined) = tasks.join_next().await {
            let (index, result) = joined.map_err(|e| {
                PipelineError::ScoringService(format!("candidate task failed: {e}"))
            })?;
            match result {
                Ok(scored) => slots[index] = Some(scored),
                Err(e) => {
                    if first_error.as_ref().map_or(true, |(i, _)| index < *i) {
                        first_error = Some((index, e));
                    }
                }
            }
        }

        if let Some((_, e)) = first_error {
            return Err(e);
        }
        // every slot is filled once no task failed
        Ok(slots.into_iter().flatten().collect())
    }

    async fn score_candidate(
        &self,
        index: usize,
        candidate: CandidateRecord,
        applicant: &ApplicantContext,
    ) -> Result<ScoredResult, PipelineError> {
        let document_text = self.document_text(index, &candidate).await?;

        let relevance = match self.scorer.score(applicant, &document_text).await {
            Ok(relevance) => relevance,
            Err(e) if self.strategy().aborts_on_failure() => {
                warn!("Bando {index} ({}): scoring failed, aborting: {e}", candidate.name);
                return Err(PipelineError::ScoringService(e.to_string()));
            }
            Err(e) => {
                warn!("Bando {index} ({}): scoring failed, score set to 0: {e}", candidate.name);
                Relevance::zero()
            }
        };

        info!(
            "Bando {index}: name={}, score={:.4}",
            candidate.name, relevance.score
        );
        Ok(ScoredResult::new(candidate, relevance))
    }

    async fn document_text(
        &self,
        index: usize,
        candidate: &CandidateRecord,
    ) -> Result<String, PipelineError> {
        if !candidate.has_pdf_reference() {
            debug!(
                "Bando {index}: reference '{}' is not a PDF, scoring with empty text",
                candidate.document_reference
            );
            return Ok(String::new());
        }

        let url = match resolve_document_url(
            &candidate.document_reference,
            &self.options.pdf_proxy_url,
        ) {
            Ok(url) => url,
            Err(e) => return self.document_failure(index, &candidate.document_reference, e),
        };

        match self.documents.extract(&url).await {
            Ok(text) => {
                debug!("Bando {index}: extracted {} characters", text.chars().count());
                Ok(text)
            }
            Err(e) => self.document_failure(index, &url, e),
        }
    }

    fn document_failure(
        &self,
        index: usize,
        url: &str,
        error: impl std::fmt::Display,
    ) -> Result<String, PipelineError> {
        if self.options.abort_on_document_failure {
            return Err(PipelineError::ResourceFetch {
                url: url.to_string(),
                reason: error.to_string(),
            });
        }
        warn!("Bando {index}: could not read sheet {url}, scoring with empty text: {error}");
        Ok(String::new())
    }
}

/// Sorts by descending score, ties by original position, and keeps `top_n`.
pub fn rank_by_score(scored: Vec<ScoredResult>, top_n: usize) -> Vec<ScoredResult> {
    let mut indexed: Vec<(usize, ScoredResult)> = scored.into_iter().enumerate().collect();
    // partial_cmp ties -0.0 with 0.0; scores are never NaN.
    indexed.sort_by(|(ia, a), (ib, b)| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then(ia.cmp(ib))
    });
    indexed
        .into_iter()
        .take(top_n)
        .map(|(_, result)| result)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::ranking::document::tests::{FakeDecoder, FakeFetcher};
    use crate::ranking::scoring::tests::{FakeEmbedder, FakeJudge};
    use crate::ranking::scoring::{EmbeddingScorer, JudgedScorer, ScoringError};

    /// Looks the document text up in a fixed table; counts calls.
    #[derive(Default)]
    struct TableScorer {
        scores: HashMap<String, f64>,
        prepared: AtomicUsize,
        scored: AtomicUsize,
    }

    impl TableScorer {
        fn new(entries: &[(&str, f64)]) -> Self {
            Self {
                scores: entries
                    .iter()
                    .map(|(text, score)| (text.to_string(), *score))
                    .collect(),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl RelevanceScorer for TableScorer {
        fn strategy(&self) -> ScoringStrategy {
            ScoringStrategy::Embedding
        }

        async fn prepare(
            &self,
            profile: &ApplicantProfile,
        ) -> Result<ApplicantContext, ScoringError> {
            self.prepared.fetch_add(1, Ordering::SeqCst);
            Ok(ApplicantContext::from_profile(profile))
        }

        async fn score(
            &self,
            _applicant: &ApplicantContext,
            document_text: &str,
        ) -> Result<Relevance, ScoringError> {
            self.scored.fetch_add(1, Ordering::SeqCst);
            Ok(Relevance {
                score: self.scores.get(document_text).copied().unwrap_or(0.0),
                rationale: None,
            })
        }
    }

    fn profile() -> ApplicantProfile {
        ApplicantProfile {
            company_name: "Falegnameria Rossi".to_string(),
            particularities: "mobili su misura".to_string(),
            improvement_goals: "export digitale".to_string(),
            ..ApplicantProfile::default()
        }
    }

    fn response(entries: &[(&str, &str)]) -> String {
        let children: String = entries
            .iter()
            .map(|(name, link)| {
                format!(
                    "<child><nomebando>{name}</nomebando><schedasintetica>{link}</schedasintetica></child>"
                )
            })
            .collect();
        format!("<?xml version=\"1.0\"?><bandi>{children}</bandi>")
    }

    fn pipeline(
        fetcher: Arc<FakeFetcher>,
        scorer: Arc<dyn RelevanceScorer>,
        options: PipelineOptions,
    ) -> RankingPipeline {
        let documents = DocumentTextExtractor::new(fetcher, Arc::new(FakeDecoder));
        RankingPipeline::new(documents, scorer, options)
    }

    fn names(outcome: &RankOutcome) -> Vec<String> {
        match outcome {
            RankOutcome::Ranked { results, .. } => results.iter().map(|r| r.name.clone()).collect(),
            RankOutcome::NoOpportunities => panic!("expected ranked results"),
        }
    }

    #[tokio::test]
    async fn test_ties_keep_extraction_order() {
        let fetcher = Arc::new(
            FakeFetcher::default()
                .with("https://b/x.pdf", "alpha")
                .with("https://b/y.pdf", "beta"),
        );
        let scorer = Arc::new(TableScorer::new(&[("alpha\n", 0.9), ("beta\n", 0.9), ("", 0.1)]));
        let pipeline = pipeline(fetcher, scorer, PipelineOptions::default());

        let raw = response(&[("A", "https://b/x.pdf"), ("B", "https://b/y.pdf"), ("C", "")]);
        let outcome = pipeline.rank(&profile(), &raw, 3).await.unwrap();

        assert_eq!(names(&outcome), vec!["A", "B", "C"]);
        match outcome {
            RankOutcome::Ranked {
                results,
                total_candidates,
            } => {
                assert_eq!(total_candidates, 3);
                assert_eq!(results[0].score, 0.9);
                assert_eq!(results[2].score, 0.1);
            }
            RankOutcome::NoOpportunities => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_output_is_sorted_and_truncated() {
        let fetcher = Arc::new(
            FakeFetcher::default()
                .with("https://b/1.pdf", "uno")
                .with("https://b/2.pdf", "due")
                .with("https://b/3.pdf", "tre")
                .with("https://b/4.pdf", "quattro"),
        );
        let scorer = Arc::new(TableScorer::new(&[
            ("uno\n", 0.2),
            ("due\n", 0.8),
            ("tre\n", 0.5),
            ("quattro\n", 0.8),
        ]));
        let pipeline = pipeline(fetcher, scorer, PipelineOptions::default());

        let raw = response(&[
            ("Uno", "https://b/1.pdf"),
            ("Due", "https://b/2.pdf"),
            ("Tre", "https://b/3.pdf"),
            ("Quattro", "https://b/4.pdf"),
            ("Cinque", ""),
        ]);
        let outcome = pipeline.rank(&profile(), &raw, 3).await.unwrap();
        assert_eq!(names(&outcome), vec!["Due", "Quattro", "Tre"]);
    }

    #[tokio::test]
    async fn test_fewer_candidates_than_top_n() {
        let scorer = Arc::new(TableScorer::default());
        let pipeline = pipeline(Arc::new(FakeFetcher::default()), scorer, PipelineOptions::default());

        let outcome = pipeline
            .rank(&profile(), &response(&[("Solo", "")]), 3)
            .await
            .unwrap();
        assert_eq!(names(&outcome), vec!["Solo"]);
    }

    #[tokio::test]
    async fn test_zero_candidates_is_no_opportunities_without_scoring() {
        let scorer = Arc::new(TableScorer::default());
        let pipeline = pipeline(
            Arc::new(FakeFetcher::default()),
            scorer.clone(),
            PipelineOptions::default(),
        );

        let outcome = pipeline
            .rank(&profile(), "<bandi><messaggio>nessun bando</messaggio></bandi>", 3)
            .await
            .unwrap();

        assert_eq!(outcome, RankOutcome::NoOpportunities);
        assert_eq!(scorer.prepared.load(Ordering::SeqCst), 0);
        assert_eq!(scorer.scored.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unparseable_response_is_malformed() {
        let scorer = Arc::new(TableScorer::default());
        let pipeline = pipeline(Arc::new(FakeFetcher::default()), scorer, PipelineOptions::default());

        let err = pipeline
            .rank(&profile(), "<html><body>502 Bad Gateway</html>", 3)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_non_pdf_reference_is_not_fetched_and_scores_zero() {
        let fetcher = Arc::new(FakeFetcher::default());
        let embedder = Arc::new(FakeEmbedder::default());
        let scorer = Arc::new(EmbeddingScorer::new(embedder.clone()));
        let pipeline = pipeline(fetcher.clone(), scorer, PipelineOptions::default());

        let raw = response(&[
            ("Pagina", "https://b/bando.html"),
            ("Maiuscolo", "https://b/BANDO.PDF"),
        ]);
        let outcome = pipeline.rank(&profile(), &raw, 3).await.unwrap();

        assert!(fetcher.requests().is_empty());
        match outcome {
            RankOutcome::Ranked { results, .. } => {
                assert!(results.iter().all(|r| r.score == 0.0));
            }
            RankOutcome::NoOpportunities => panic!("expected ranked results"),
        }
        // only the applicant text was embedded
        assert_eq!(embedder.inputs(), vec!["mobili su misura export digitale"]);
    }

    #[tokio::test]
    async fn test_applicant_embedding_computed_once() {
        let fetcher = Arc::new(
            FakeFetcher::default()
                .with("https://b/1.pdf", "mobili")
                .with("https://b/2.pdf", "turismo"),
        );
        let embedder = Arc::new(FakeEmbedder::default());
        let scorer = Arc::new(EmbeddingScorer::new(embedder.clone()));
        let pipeline = pipeline(fetcher, scorer, PipelineOptions::default());

        let raw = response(&[("Uno", "https://b/1.pdf"), ("Due", "https://b/2.pdf")]);
        pipeline.rank(&profile(), &raw, 3).await.unwrap();

        let inputs = embedder.inputs();
        assert_eq!(inputs.len(), 3);
        assert_eq!(
            inputs
                .iter()
                .filter(|i| i.as_str() == "mobili su misura export digitale")
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_embedding_failure_degrades_single_candidate() {
        let fetcher = Arc::new(
            FakeFetcher::default()
                .with("https://b/1.pdf", "mobili su misura")
                .with("https://b/2.pdf", "GUASTO"),
        );
        let embedder = Arc::new(FakeEmbedder {
            fail_on: Some("GUASTO".to_string()),
            ..FakeEmbedder::default()
        });
        let scorer = Arc::new(EmbeddingScorer::new(embedder));
        let pipeline = pipeline(fetcher, scorer, PipelineOptions::default());

        let raw = response(&[("Rotto", "https://b/2.pdf"), ("Buono", "https://b/1.pdf")]);
        let outcome = pipeline.rank(&profile(), &raw, 3).await.unwrap();

        match outcome {
            RankOutcome::Ranked { results, .. } => {
                assert_eq!(results[0].name, "Buono");
                assert!(results[0].score > 0.0);
                assert_eq!(results[1].name, "Rotto");
                assert_eq!(results[1].score, 0.0);
            }
            RankOutcome::NoOpportunities => panic!("expected ranked results"),
        }
    }

    #[tokio::test]
    async fn test_pdf_fetch_failure_degrades_to_empty_text() {
        let fetcher = Arc::new(
            FakeFetcher::default()
                .failing("https://b/1.pdf", 404)
                .with("https://b/2.pdf", "export"),
        );
        let scorer = Arc::new(TableScorer::new(&[("", 0.3), ("export\n", 0.6)]));
        let pipeline = pipeline(fetcher.clone(), scorer, PipelineOptions::default());

        let raw = response(&[("Mancante", "https://b/1.pdf"), ("Presente", "https://b/2.pdf")]);
        let outcome = pipeline.rank(&profile(), &raw, 3).await.unwrap();

        assert_eq!(names(&outcome), vec!["Presente", "Mancante"]);
        assert_eq!(fetcher.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_pdf_fetch_failure_aborts_when_configured() {
        let fetcher = Arc::new(FakeFetcher::default().failing("https://b/1.pdf", 500));
        let scorer = Arc::new(TableScorer::default());
        let options = PipelineOptions {
            abort_on_document_failure: true,
            ..PipelineOptions::default()
        };
        let pipeline = pipeline(fetcher, scorer, options);

        let err = pipeline
            .rank(&profile(), &response(&[("Uno", "https://b/1.pdf")]), 3)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::ResourceFetch { url, .. } if url == "https://b/1.pdf"));
    }

    #[tokio::test]
    async fn test_pdfs_are_fetched_through_proxy() {
        let proxied = "https://proxy.test/pdf-proxy?url=https%3A%2F%2Fb%2F1.pdf";
        let fetcher = Arc::new(FakeFetcher::default().with(proxied, "testo"));
        let scorer = Arc::new(TableScorer::new(&[("testo\n", 0.7)]));
        let options = PipelineOptions {
            pdf_proxy_url: "https://proxy.test/pdf-proxy".to_string(),
            ..PipelineOptions::default()
        };
        let pipeline = pipeline(fetcher.clone(), scorer, options);

        let outcome = pipeline
            .rank(&profile(), &response(&[("Uno", "https://b/1.pdf")]), 3)
            .await
            .unwrap();

        assert_eq!(fetcher.requests(), vec![proxied.to_string()]);
        match outcome {
            RankOutcome::Ranked { results, .. } => assert_eq!(results[0].score, 0.7),
            RankOutcome::NoOpportunities => panic!("expected ranked results"),
        }
    }

    #[tokio::test]
    async fn test_judge_failure_aborts_invocation() {
        let fetcher = Arc::new(
            FakeFetcher::default()
                .with("https://b/1.pdf", "uno")
                .with("https://b/2.pdf", "due")
                .with("https://b/3.pdf", "tre"),
        );
        let judge = Arc::new(FakeJudge::new(vec![Ok("80"), Err(500), Ok("40")]));
        let scorer = Arc::new(JudgedScorer::new(judge.clone()));
        let pipeline = pipeline(fetcher, scorer, PipelineOptions::default());

        let raw = response(&[
            ("Uno", "https://b/1.pdf"),
            ("Due", "https://b/2.pdf"),
            ("Tre", "https://b/3.pdf"),
        ]);
        let err = pipeline.rank(&profile(), &raw, 3).await.unwrap_err();

        assert!(matches!(err, PipelineError::ScoringService(_)));
        assert_eq!(judge.calls(), 2);
    }

    #[tokio::test]
    async fn test_judged_results_carry_rationale() {
        let fetcher = Arc::new(
            FakeFetcher::default()
                .with("https://b/1.pdf", "uno")
                .with("https://b/2.pdf", "due"),
        );
        let judge = Arc::new(FakeJudge::new(vec![Ok("35 poco pertinente"), Ok("90 ottimo")]));
        let scorer = Arc::new(JudgedScorer::new(judge));
        let pipeline = pipeline(fetcher, scorer, PipelineOptions::default());

        let raw = response(&[("Uno", "https://b/1.pdf"), ("Due", "https://b/2.pdf")]);
        let outcome = pipeline.rank(&profile(), &raw, 3).await.unwrap();

        match outcome {
            RankOutcome::Ranked { results, .. } => {
                assert_eq!(results[0].name, "Due");
                assert_eq!(results[0].score, 90.0);
                assert_eq!(results[0].rationale.as_deref(), Some("90 ottimo"));
            }
            RankOutcome::NoOpportunities => panic!("expected ranked results"),
        }
    }

    #[tokio::test]
    async fn test_bounded_concurrency_matches_sequential_order() {
        let make_fetcher = || {
            Arc::new(
                FakeFetcher::default()
                    .with("https://b/1.pdf", "uno")
                    .with("https://b/2.pdf", "due")
                    .with("https://b/3.pdf", "tre"),
            )
        };
        let table = [("uno\n", 0.4), ("due\n", 0.4), ("tre\n", 0.9)];
        let raw = response(&[
            ("Uno", "https://b/1.pdf"),
            ("Due", "https://b/2.pdf"),
            ("Tre", "https://b/3.pdf"),
            ("Quattro", ""),
        ]);

        let sequential = pipeline(
            make_fetcher(),
            Arc::new(TableScorer::new(&table)),
            PipelineOptions::default(),
        );
        let concurrent = pipeline(
            make_fetcher(),
            Arc::new(TableScorer::new(&table)),
            PipelineOptions {
                concurrency: 3,
                ..PipelineOptions::default()
            },
        );

        let a = sequential.rank(&profile(), &raw, 4).await.unwrap();
        let b = concurrent.rank(&profile(), &raw, 4).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(names(&b), vec!["Tre", "Uno", "Due", "Quattro"]);
    }

    #[tokio::test]
    async fn test_bounded_concurrency_judge_failure_still_aborts() {
        let fetcher = Arc::new(
            FakeFetcher::default()
                .with("https://b/1.pdf", "uno")
                .with("https://b/2.pdf", "due"),
        );
        let judge = Arc::new(FakeJudge::new(vec![Ok("50"), Err(503)]));
        let scorer = Arc::new(JudgedScorer::new(judge));
        let options = PipelineOptions {
            concurrency: 2,
            ..PipelineOptions::default()
        };
        let pipeline = pipeline(fetcher, scorer, options);

        let raw = response(&[("Uno", "https://b/1.pdf"), ("Due", "https://b/2.pdf")]);
        assert!(matches!(
            pipeline.rank(&profile(), &raw, 3).await,
            Err(PipelineError::ScoringService(_))
        ));
    }

    #[test]
    fn test_rank_by_score_stable_on_ties() {
        let result = |name: &str, score: f64| ScoredResult {
            name: name.to_string(),
            document_reference: String::new(),
            score,
            rationale: None,
        };
        let ranked = rank_by_score(
            vec![
                result("a", 0.5),
                result("b", 0.7),
                result("c", 0.5),
                result("d", 0.7),
                result("e", 0.5),
            ],
            10,
        );
        let order: Vec<_> = ranked.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(order, vec!["b", "d", "a", "c", "e"]);
    }

    #[test]
    fn test_rank_by_score_empty_input() {
        assert!(rank_by_score(vec![], 3).is_empty());
    }

    #[test]
    fn test_rank_by_score_top_n_zero() {
        let result = ScoredResult {
            name: "a".to_string(),
            document_reference: String::new(),
            score: 0.9,
            rationale: None,
        };
        assert!(rank_by_score(vec![result], 0).is_empty());
    }

    #[test]
    fn test_rank_by_score_signed_zeros_tie() {
        let result = |name: &str, score: f64| ScoredResult {
            name: name.to_string(),
            document_reference: String::new(),
            score,
            rationale: None,
        };
        let ranked = rank_by_score(vec![result("a", -0.0), result("b", 0.0)], 3);
        let order: Vec<_> = ranked.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(order, vec!["a", "b"]);
    }
}
