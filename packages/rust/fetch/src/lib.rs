//! Concurrent web content fetcher.
//!
//! Fetches a batch of URLs in parallel under one shared deadline, extracts
//! plain text from each page, and chunks it for language-model input. Every
//! per-URL failure is isolated: a dead link, a binary payload, or a slow
//! server costs that page's contribution and nothing else.

use std::time::Duration;

use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use execintel_shared::{ExecIntelError, Result};
use execintel_text::{chunk_text, extract_text};

/// User-Agent string for fetch requests.
const USER_AGENT: &str = concat!("ExecIntel/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// FetchOptions
// ---------------------------------------------------------------------------

/// Limits for one fetch batch.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Approximate token budget per chunk of extracted text.
    pub max_tokens: usize,
    /// Shared deadline for the whole batch. Fetches that have not completed
    /// by the deadline are abandoned and contribute nothing.
    pub timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_tokens: 1000,
            timeout: Duration::from_secs(10),
        }
    }
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Concurrent page fetcher with per-batch deadline semantics.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Create a new fetcher with a shared HTTP client.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| ExecIntelError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Fetch every URL concurrently, extract plain text, and chunk it.
    ///
    /// Returns the concatenation of each page's chunks in URL-submission
    /// order (chunks from one page stay contiguous and ordered). Failed,
    /// abandoned, and cancelled fetches are logged and excluded; this method
    /// itself never fails.
    #[instrument(skip_all, fields(pages = urls.len()))]
    pub async fn fetch_text(
        &self,
        urls: &[Url],
        opts: &FetchOptions,
        cancel: &CancellationToken,
    ) -> Vec<String> {
        if urls.is_empty() {
            return Vec::new();
        }

        let deadline = tokio::time::Instant::now() + opts.timeout;

        let mut handles = Vec::with_capacity(urls.len());
        for url in urls {
            let client = self.client.clone();
            let url = url.clone();
            handles.push(tokio::spawn(
                async move { fetch_page_text(&client, &url).await },
            ));
        }

        let mut chunks = Vec::new();
        let mut pages_fetched = 0usize;
        let mut pages_failed = 0usize;
        let mut pages_abandoned = 0usize;

        // Join in submission order so cross-page chunk order is stable.
        for (url, handle) in urls.iter().zip(handles) {
            if cancel.is_cancelled() {
                handle.abort();
                pages_abandoned += 1;
                continue;
            }

            let aborter = handle.abort_handle();
            let joined = tokio::select! {
                _ = cancel.cancelled() => {
                    aborter.abort();
                    pages_abandoned += 1;
                    continue;
                }
                joined = tokio::time::timeout_at(deadline, handle) => joined,
            };

            match joined {
                Ok(Ok(Ok(text))) => {
                    pages_fetched += 1;
                    chunks.extend(chunk_text(&text, opts.max_tokens));
                }
                Ok(Ok(Err(e))) => {
                    warn!(%url, error = %e, "fetch failed, excluding page");
                    pages_failed += 1;
                }
                Ok(Err(e)) => {
                    warn!(%url, error = %e, "fetch task aborted");
                    pages_failed += 1;
                }
                Err(_) => {
                    aborter.abort();
                    debug!(%url, "fetch missed batch deadline, abandoning");
                    pages_abandoned += 1;
                }
            }
        }

        info!(
            pages_fetched,
            pages_failed,
            pages_abandoned,
            chunks = chunks.len(),
            "fetch batch complete"
        );

        chunks
    }
}

/// Fetch one page and extract its plain text.
async fn fetch_page_text(client: &Client, url: &Url) -> Result<String> {
    debug!(%url, "fetching page");

    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| ExecIntelError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ExecIntelError::Network(format!("{url}: HTTP {status}")));
    }

    if let Some(content_type) = response.headers().get(reqwest::header::CONTENT_TYPE) {
        let content_type = content_type.to_str().unwrap_or("");
        if !is_text_content(content_type) {
            return Err(ExecIntelError::parse(format!(
                "{url}: unsupported content type {content_type}"
            )));
        }
    }

    let body = response
        .text()
        .await
        .map_err(|e| ExecIntelError::Network(format!("{url}: body read failed: {e}")))?;

    Ok(extract_text(&body))
}

/// Accept text pages only; anything binary is a per-URL failure.
fn is_text_content(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.starts_with("text/")
        || content_type.contains("html")
        || content_type.contains("xml")
}
