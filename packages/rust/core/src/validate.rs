//! Reference link validation.
//!
//! Extracted citation URLs are only as good as the model that emitted them.
//! Before a reference reaches the profile it must answer one lightweight
//! GET probe. A failed probe is final for the invocation — no retries, no
//! backoff, no substitution.

use std::collections::HashSet;
use std::time::Duration;

use reqwest::Client;
use tracing::{info, instrument, warn};

use execintel_shared::{ExecIntelError, Result};

/// User-Agent string for probe requests.
const USER_AGENT: &str = concat!("ExecIntel/", env!("CARGO_PKG_VERSION"));

/// Timeout for a single probe.
const PROBE_TIMEOUT_SECS: u64 = 10;

/// Deduplicate URLs preserving first-seen order, dropping blanks.
pub fn dedup_urls(urls: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.iter()
        .map(|u| u.trim())
        .filter(|u| !u.is_empty())
        .filter(|u| seen.insert(u.to_string()))
        .map(str::to_string)
        .collect()
}

/// Concurrent reachability validator for citation URLs.
#[derive(Debug, Clone)]
pub struct Validator {
    client: Client,
}

impl Validator {
    /// Create a validator with a shared HTTP client.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .build()
            .map_err(|e| ExecIntelError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Probe every distinct URL concurrently and return the reachable subset,
    /// in first-seen order. Output is always a subset of the deduplicated
    /// input; a non-success status or any network error removes the URL.
    #[instrument(skip_all, fields(candidates = urls.len()))]
    pub async fn validate(&self, urls: &[String]) -> Vec<String> {
        let candidates = dedup_urls(urls);
        if candidates.is_empty() {
            return Vec::new();
        }

        let mut handles = Vec::with_capacity(candidates.len());
        for url in candidates {
            let client = self.client.clone();
            handles.push(tokio::spawn(async move {
                let reachable = probe(&client, &url).await;
                (url, reachable)
            }));
        }

        let mut valid = Vec::new();
        let mut dropped = 0usize;
        for handle in handles {
            match handle.await {
                Ok((url, true)) => valid.push(url),
                Ok((url, false)) => {
                    warn!(%url, "invalid reference link, dropping");
                    dropped += 1;
                }
                Err(e) => {
                    warn!(error = %e, "probe task aborted");
                    dropped += 1;
                }
            }
        }

        info!(kept = valid.len(), dropped, "reference validation complete");
        valid
    }
}

/// One GET probe; the body is discarded.
async fn probe(client: &Client, url: &str) -> bool {
    match client.get(url).send().await {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}
