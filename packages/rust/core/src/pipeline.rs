//! Pipeline orchestrator: the four public operations.
//!
//! Each operation composes search → fetch → chunk → invoke → parse → merge
//! with the concurrency the step calls for, and applies the degrade-to-empty
//! policy at this boundary: the public methods never fail. Every degrade is
//! logged and counted in the returned outcome, so "we found nothing" and
//! "everything broke" stay distinguishable to callers and operators.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Datelike, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use execintel_fetch::{FetchOptions, Fetcher};
use execintel_search::{FreshnessWindow, SearchClient};
use execintel_shared::{Article, Executive, PipelineConfig, Result, RunId};

use crate::backend::CompletionBackend;
use crate::extract::{Invoker, parse_article, parse_executive, parse_executives};
use crate::merge::{self, BioPartial, PrioritiesPartial};
use crate::templates::{self, TemplateRegistry};
use crate::validate::{Validator, dedup_urls};

// ---------------------------------------------------------------------------
// Operation inputs
// ---------------------------------------------------------------------------

/// Where the articles for [`Orchestrator::summarize_articles`] come from.
#[derive(Debug, Clone)]
pub enum ArticleSource {
    /// Explicit article URLs.
    Urls(Vec<String>),
    /// Discover articles via a topic search.
    Search { company: String, topic: String },
}

/// Which financial filing to summarize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilingKind {
    TenK,
    Quarterly,
}

impl FilingKind {
    /// The per-chunk and roll-up summarization template for this kind.
    pub fn template(&self) -> &'static str {
        match self {
            Self::TenK => templates::FILING_10K_SUMMARY,
            Self::Quarterly => templates::FILING_QUARTERLY_SUMMARY,
        }
    }

    fn query(&self, company: &str) -> String {
        match self {
            Self::TenK => format!("site:www.sec.gov {company} 10K"),
            Self::Quarterly => format!(
                "Latest quarterly earnings report for {company} in {}",
                Utc::now().year()
            ),
        }
    }
}

impl std::fmt::Display for FilingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TenK => write!(f, "10-K"),
            Self::Quarterly => write!(f, "quarterly"),
        }
    }
}

// ---------------------------------------------------------------------------
// Operation outcomes
// ---------------------------------------------------------------------------

/// Result of executive discovery.
#[derive(Debug, Default, serde::Serialize)]
pub struct DiscoveryOutcome {
    /// Deduplicated executives, first-seen order.
    pub executives: Vec<Executive>,
    /// The page the executives were extracted from (empty on degrade).
    pub source_url: String,
    /// Chunks submitted for extraction.
    pub chunks_total: usize,
    /// Chunks that contributed nothing (failed invocation or parse).
    pub chunks_skipped: usize,
}

/// Result of executive enrichment.
#[derive(Debug, Default, serde::Serialize)]
pub struct EnrichOutcome {
    /// The enriched executives, same order as submitted.
    pub executives: Vec<Executive>,
    /// Distinct reference URLs probed.
    pub references_checked: usize,
    /// Probed URLs that failed validation.
    pub references_dropped: usize,
}

/// Result of article summarization.
#[derive(Debug, Default, serde::Serialize)]
pub struct ArticleOutcome {
    /// Successfully summarized articles.
    pub articles: Vec<Article>,
    /// Articles dropped for failed or blank summarization.
    pub dropped: usize,
}

/// Result of financial-statement summarization.
#[derive(Debug, Default, serde::Serialize)]
pub struct FinancialOutcome {
    /// The roll-up summary (empty on degrade).
    pub summary: String,
    /// Chunk summaries that fed the roll-up.
    pub chunks_summarized: usize,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Top-level pipeline driver.
#[derive(Clone)]
pub struct Orchestrator {
    invoker: Invoker,
    search: SearchClient,
    fetcher: Fetcher,
    validator: Validator,
    limits: PipelineConfig,
    cancel: CancellationToken,
}

impl Orchestrator {
    /// Build an orchestrator over a compiled template registry, a completion
    /// backend, and a search client.
    pub fn new(
        registry: Arc<TemplateRegistry>,
        backend: Arc<dyn CompletionBackend>,
        search: SearchClient,
        limits: PipelineConfig,
    ) -> Result<Self> {
        Ok(Self {
            invoker: Invoker::new(registry, backend),
            search,
            fetcher: Fetcher::new()?,
            validator: Validator::new()?,
            limits,
            cancel: CancellationToken::new(),
        })
    }

    /// Thread a cancellation token through the pipeline. A cancelled token
    /// settles in-flight operations to their partial or empty outcomes.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn fetch_opts(&self) -> FetchOptions {
        FetchOptions {
            max_tokens: self.limits.max_chunk_tokens,
            timeout: self.limits.fetch_timeout,
        }
    }

    // -----------------------------------------------------------------------
    // Operation 1: executive discovery
    // -----------------------------------------------------------------------

    /// Discover the current executives of a company given its name or a
    /// direct page URL. Never fails: any uncaught error degrades to an empty
    /// outcome, logged.
    #[instrument(skip(self), fields(run = %RunId::new()))]
    pub async fn discover_executives(&self, company_or_url: &str) -> DiscoveryOutcome {
        match self.try_discover(company_or_url).await {
            Ok(outcome) => {
                info!(
                    executives = outcome.executives.len(),
                    chunks_total = outcome.chunks_total,
                    chunks_skipped = outcome.chunks_skipped,
                    "discovery complete"
                );
                outcome
            }
            Err(e) => {
                warn!(error = %e, "discovery degraded to empty result");
                DiscoveryOutcome::default()
            }
        }
    }

    async fn try_discover(&self, company_or_url: &str) -> Result<DiscoveryOutcome> {
        let (chunks, source_url) = match parse_direct_url(company_or_url) {
            Some(url) => {
                let chunks = self
                    .fetcher
                    .fetch_text(std::slice::from_ref(&url), &self.fetch_opts(), &self.cancel)
                    .await;
                (chunks, url.to_string())
            }
            None => {
                let query = format!("Current executives for {company_or_url}");
                debug!(query, "discovery search");
                let hits = self
                    .search
                    .search(&query, self.limits.search_count, Some(FreshnessWindow::last_year()))
                    .await?;
                let urls: Vec<Url> = hits.iter().map(|hit| hit.url.clone()).collect();
                let source_url = hits
                    .first()
                    .map(|hit| hit.url.to_string())
                    .unwrap_or_default();
                let chunks = self
                    .fetcher
                    .fetch_text(&urls, &self.fetch_opts(), &self.cancel)
                    .await;
                (chunks, source_url)
            }
        };

        let chunks_total = chunks.len();
        let mut handles = Vec::with_capacity(chunks_total);
        for chunk in chunks {
            let invoker = self.invoker.clone();
            handles.push(tokio::spawn(async move {
                let args = HashMap::from([("chunk".to_string(), chunk)]);
                invoker.invoke(templates::EXECUTIVE_LIST, &args).await
            }));
        }

        let mut partials = Vec::new();
        let mut chunks_skipped = 0usize;
        for handle in handles {
            match handle.await {
                Ok(Ok(raw)) => match parse_executives(&raw) {
                    Some(list) => partials.push(list),
                    None => {
                        debug!("chunk yielded no parseable executives, skipping");
                        chunks_skipped += 1;
                    }
                },
                Ok(Err(e)) => {
                    debug!(error = %e, "chunk extraction failed, skipping");
                    chunks_skipped += 1;
                }
                Err(e) => {
                    warn!(error = %e, "extraction task aborted, skipping");
                    chunks_skipped += 1;
                }
            }
        }

        Ok(DiscoveryOutcome {
            executives: merge::merge_executives(partials),
            source_url,
            chunks_total,
            chunks_skipped,
        })
    }

    // -----------------------------------------------------------------------
    // Operation 2: executive enrichment
    // -----------------------------------------------------------------------

    /// Enrich the selected executives with biographies, priorities, and
    /// validated references. Parallel across executives; within one
    /// executive the two sub-extractions run in parallel with each other.
    #[instrument(skip(self, selected), fields(run = %RunId::new(), executives = selected.len()))]
    pub async fn enrich_executives(
        &self,
        selected: Vec<Executive>,
        company: &str,
    ) -> EnrichOutcome {
        let mut handles = Vec::with_capacity(selected.len());
        for exec in selected {
            let this = self.clone();
            let company = company.to_string();
            handles.push(tokio::spawn(
                async move { this.enrich_one(exec, &company).await },
            ));
        }

        let mut enriched = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(exec) => enriched.push(exec),
                Err(e) => warn!(error = %e, "enrichment task aborted"),
            }
        }

        // Validation pass: parallel across executives, parallel across links.
        let mut references_checked = 0usize;
        let mut handles = Vec::with_capacity(enriched.len());
        for mut exec in enriched {
            references_checked += dedup_urls(&exec.references).len();
            let validator = self.validator.clone();
            handles.push(tokio::spawn(async move {
                exec.references = validator.validate(&exec.references).await;
                exec
            }));
        }

        let mut executives = Vec::new();
        let mut references_kept = 0usize;
        for handle in handles {
            match handle.await {
                Ok(exec) => {
                    references_kept += exec.references.len();
                    executives.push(exec);
                }
                Err(e) => warn!(error = %e, "validation task aborted"),
            }
        }

        let outcome = EnrichOutcome {
            executives,
            references_checked,
            references_dropped: references_checked.saturating_sub(references_kept),
        };
        info!(
            executives = outcome.executives.len(),
            references_checked = outcome.references_checked,
            references_dropped = outcome.references_dropped,
            "enrichment complete"
        );
        outcome
    }

    async fn enrich_one(&self, exec: Executive, company: &str) -> Executive {
        let (bio, priorities) = tokio::join!(
            self.extract_bio(&exec, company),
            self.extract_priorities(&exec, company),
        );
        merge::merge_bio_and_priorities(exec, bio, priorities)
    }

    /// Biography sub-pipeline: search → fetch → chunk → invoke → parse.
    /// First chunk (in page order) yielding a non-empty biography wins.
    async fn extract_bio(&self, exec: &Executive, company: &str) -> BioPartial {
        let query = format!("Biography for {company} executive {}", exec.name);
        let (chunks, source_url) = match self
            .search_and_fetch(&query, Some(FreshnessWindow::last_year()))
            .await
        {
            Ok(found) => found,
            Err(e) => {
                warn!(executive = %exec.name, error = %e, "biography search failed");
                return BioPartial::default();
            }
        };

        let candidates = self
            .invoke_per_chunk(
                templates::EXECUTIVE_BIO,
                exec,
                company,
                chunks,
                self.limits.bio_chunk_limit,
            )
            .await;

        let mut partial = BioPartial::default();
        for candidate in candidates.into_iter().flatten() {
            if candidate.biography.trim().is_empty() {
                continue;
            }
            partial.biography = candidate.biography;
            merge::append_bounded(&mut partial.references, candidate.references);
            if !source_url.is_empty() {
                partial.references.push(source_url.clone());
            }
            break;
        }
        partial
    }

    /// Priorities sub-pipeline: every consulted chunk contributes a bounded
    /// number of priorities and references.
    async fn extract_priorities(&self, exec: &Executive, company: &str) -> PrioritiesPartial {
        let query = format!("Business priorities for {company} executive {}", exec.name);
        let (chunks, source_url) = match self
            .search_and_fetch(&query, Some(FreshnessWindow::last_year()))
            .await
        {
            Ok(found) => found,
            Err(e) => {
                warn!(executive = %exec.name, error = %e, "priorities search failed");
                return PrioritiesPartial::default();
            }
        };

        let candidates = self
            .invoke_per_chunk(
                templates::EXECUTIVE_PRIORITIES,
                exec,
                company,
                chunks,
                self.limits.priorities_chunk_limit,
            )
            .await;

        let mut partial = PrioritiesPartial::default();
        for candidate in candidates.into_iter().flatten() {
            merge::append_bounded(&mut partial.priorities, candidate.priorities);
            merge::append_bounded(&mut partial.references, candidate.references);
            if !source_url.is_empty() {
                partial.references.push(source_url.clone());
            }
        }
        partial
    }

    /// Invoke one template per chunk in parallel (bounded to `limit` chunks)
    /// and return the per-chunk parse results in chunk order. A failed
    /// invocation or unparseable result is `None` for that chunk only.
    async fn invoke_per_chunk(
        &self,
        template: &'static str,
        exec: &Executive,
        company: &str,
        chunks: Vec<String>,
        limit: usize,
    ) -> Vec<Option<Executive>> {
        let mut handles = Vec::new();
        for chunk in chunks.into_iter().take(limit) {
            let invoker = self.invoker.clone();
            let args = HashMap::from([
                ("exec_name".to_string(), exec.name.clone()),
                ("company_name".to_string(), company.to_string()),
                ("person_info".to_string(), chunk),
            ]);
            handles.push(tokio::spawn(
                async move { invoker.invoke(template, &args).await },
            ));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(match handle.await {
                Ok(Ok(raw)) => parse_executive(&raw),
                Ok(Err(e)) => {
                    debug!(template, error = %e, "chunk extraction failed, skipping");
                    None
                }
                Err(e) => {
                    warn!(template, error = %e, "extraction task aborted, skipping");
                    None
                }
            });
        }
        results
    }

    // -----------------------------------------------------------------------
    // Operation 3: article summarization
    // -----------------------------------------------------------------------

    /// Summarize articles given explicit URLs or a topic search. Articles
    /// whose summarization fails or comes back blank are dropped, not
    /// replaced with error markers.
    #[instrument(skip(self, source), fields(run = %RunId::new()))]
    pub async fn summarize_articles(&self, source: ArticleSource) -> ArticleOutcome {
        match self.try_summarize_articles(source).await {
            Ok(outcome) => {
                info!(
                    articles = outcome.articles.len(),
                    dropped = outcome.dropped,
                    "article summarization complete"
                );
                outcome
            }
            Err(e) => {
                warn!(error = %e, "article summarization degraded to empty result");
                ArticleOutcome::default()
            }
        }
    }

    async fn try_summarize_articles(&self, source: ArticleSource) -> Result<ArticleOutcome> {
        let urls = match source {
            ArticleSource::Urls(urls) => urls,
            ArticleSource::Search { company, topic } => {
                let query =
                    format!("Find articles regarding {company} on the following topic: {topic}.");
                self.search
                    .search(&query, self.limits.article_count, None)
                    .await?
                    .into_iter()
                    .map(|hit| hit.url.to_string())
                    .collect()
            }
        };

        let mut handles = Vec::with_capacity(urls.len());
        for url in urls {
            let invoker = self.invoker.clone();
            handles.push(tokio::spawn(async move {
                let args = HashMap::from([("url".to_string(), url.clone())]);
                let result = invoker.invoke(templates::ARTICLE_SUMMARY, &args).await;
                (url, result)
            }));
        }

        let mut articles = Vec::new();
        let mut dropped = 0usize;
        for handle in handles {
            match handle.await {
                Ok((url, Ok(raw))) => match parse_article(&raw, &url) {
                    Some(article) => articles.push(article),
                    None => {
                        debug!(%url, "blank article summary, dropping");
                        dropped += 1;
                    }
                },
                Ok((url, Err(e))) => {
                    debug!(%url, error = %e, "article summarization failed, dropping");
                    dropped += 1;
                }
                Err(e) => {
                    warn!(error = %e, "summarization task aborted, dropping");
                    dropped += 1;
                }
            }
        }

        Ok(ArticleOutcome { articles, dropped })
    }

    // -----------------------------------------------------------------------
    // Operation 4: financial-statement summarization
    // -----------------------------------------------------------------------

    /// Summarize the company's 10-K or latest quarterly earnings.
    ///
    /// Chunk summaries run sequentially — the roll-up consumes them in
    /// document order as a cumulative narrative — and every chunk is
    /// summarized before the roll-up invocation.
    #[instrument(skip(self), fields(run = %RunId::new(), kind = %kind))]
    pub async fn summarize_financials(&self, company: &str, kind: FilingKind) -> FinancialOutcome {
        match self.try_summarize_financials(company, kind).await {
            Ok(outcome) => {
                info!(
                    chunks_summarized = outcome.chunks_summarized,
                    "financial summarization complete"
                );
                outcome
            }
            Err(e) => {
                warn!(error = %e, "financial summarization degraded to empty result");
                FinancialOutcome::default()
            }
        }
    }

    async fn try_summarize_financials(
        &self,
        company: &str,
        kind: FilingKind,
    ) -> Result<FinancialOutcome> {
        let (chunks, _source_url) = self
            .search_and_fetch(&kind.query(company), Some(FreshnessWindow::last_year()))
            .await?;

        let mut summaries = Vec::new();
        for chunk in &chunks {
            if self.cancel.is_cancelled() {
                break;
            }
            let args = HashMap::from([("input".to_string(), chunk.clone())]);
            match self.invoker.invoke(kind.template(), &args).await {
                Ok(summary) if !summary.trim().is_empty() => summaries.push(summary),
                Ok(_) => debug!("blank chunk summary, skipping"),
                Err(e) => debug!(error = %e, "chunk summarization failed, skipping"),
            }
        }

        if summaries.is_empty() {
            return Ok(FinancialOutcome::default());
        }

        let chunks_summarized = summaries.len();
        let args = HashMap::from([("input".to_string(), summaries.join("\n"))]);
        let summary = self.invoker.invoke(kind.template(), &args).await?;

        Ok(FinancialOutcome {
            summary,
            chunks_summarized,
        })
    }

    // -----------------------------------------------------------------------
    // Shared plumbing
    // -----------------------------------------------------------------------

    /// One search sub-query: take the top hit and fetch its chunked text.
    /// No usable hit short-circuits to an empty chunk list.
    async fn search_and_fetch(
        &self,
        query: &str,
        freshness: Option<FreshnessWindow>,
    ) -> Result<(Vec<String>, String)> {
        debug!(query, "search sub-query");
        let hits = self.search.search(query, 1, freshness).await?;
        let Some(hit) = hits.into_iter().next() else {
            debug!(query, "search returned no usable results");
            return Ok((Vec::new(), String::new()));
        };

        let chunks = self
            .fetcher
            .fetch_text(std::slice::from_ref(&hit.url), &self.fetch_opts(), &self.cancel)
            .await;
        Ok((chunks, hit.url.to_string()))
    }
}

/// Treat the input as a direct page URL when it parses as http(s).
fn parse_direct_url(input: &str) -> Option<Url> {
    let url = Url::parse(input.trim()).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}
