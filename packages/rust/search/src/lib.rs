//! Search backend client.
//!
//! Thin typed wrapper over an opaque web-search API (Bing-compatible wire
//! shape: `webPages.value[].{name,url}`). Results come back in backend rank
//! order and are never re-ranked here. Field formatting from search backends
//! is inconsistent enough that every URL field goes through a permissive
//! regex fallback before an item is dropped.

use std::sync::LazyLock;
use std::time::Duration;

use chrono::{Days, Utc};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

use execintel_shared::config::SearchConfig;
use execintel_shared::{ExecIntelError, Result, SearchHit};

/// User-Agent string for search requests.
const USER_AGENT: &str = concat!("ExecIntel/", env!("CARGO_PKG_VERSION"));

/// Timeout for a single search request.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Permissive URL pattern: scheme, host, then any run of path/query chars.
/// Deliberately loose — it recovers URLs embedded in prose or decorated
/// fields, and `Url::parse` gates what it finds.
static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z]+://[A-Za-z0-9\-_]+\.[A-Za-z0-9\-_:%&;?#/.=]+").expect("valid regex")
});

// ---------------------------------------------------------------------------
// Freshness window
// ---------------------------------------------------------------------------

/// Date range constraining search results, formatted `YYYY-MM-DD..YYYY-MM-DD`
/// on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessWindow {
    pub from: chrono::NaiveDate,
    pub to: chrono::NaiveDate,
}

impl FreshnessWindow {
    /// The default window: the last 365 days relative to call time.
    pub fn last_year() -> Self {
        let to = Utc::now().date_naive();
        let from = to.checked_sub_days(Days::new(365)).unwrap_or(to);
        Self { from, to }
    }
}

impl std::fmt::Display for FreshnessWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.from, self.to)
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "webPages")]
    web_pages: Option<WebPages>,
}

#[derive(Debug, Deserialize)]
struct WebPages {
    #[serde(default)]
    value: Vec<WebPage>,
}

#[derive(Debug, Deserialize)]
struct WebPage {
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
}

// ---------------------------------------------------------------------------
// SearchClient
// ---------------------------------------------------------------------------

/// Client for the opaque search backend.
#[derive(Debug, Clone)]
pub struct SearchClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl SearchClient {
    /// Create a new search client from config. The API key is read from the
    /// env var named in the config; a missing key is tolerated here (useful
    /// for keyless test backends) and rejected by the CLI preflight instead.
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(3))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ExecIntelError::Search(format!("failed to build HTTP client: {e}")))?;

        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.is_empty());

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
        })
    }

    /// Run one search query and return up to `count` hits in backend order.
    ///
    /// Items whose URL field yields no parseable URL (directly or via the
    /// regex fallback) are dropped silently. A failed HTTP call is an error
    /// for the caller to handle — the orchestrator short-circuits the
    /// affected sub-query to an empty result.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        query: &str,
        count: usize,
        freshness: Option<FreshnessWindow>,
    ) -> Result<Vec<SearchHit>> {
        let count_str = count.to_string();
        let mut request = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("count", count_str.as_str()),
                ("responseFilter", "Webpages"),
            ]);

        if let Some(window) = freshness {
            request = request.query(&[("freshness", window.to_string().as_str())]);
        }

        if let Some(key) = &self.api_key {
            request = request.header("Ocp-Apim-Subscription-Key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ExecIntelError::Search(format!("search request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExecIntelError::Search(format!(
                "search backend returned HTTP {status}"
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ExecIntelError::Search(format!("malformed search response: {e}")))?;

        let pages = body.web_pages.map(|w| w.value).unwrap_or_default();

        let mut hits = Vec::new();
        for page in pages.into_iter().take(count) {
            match parse_hit_url(&page.url) {
                Some(url) => hits.push(SearchHit {
                    title: page.name,
                    url,
                }),
                None => {
                    warn!(field = %page.url, "dropping result with unparseable URL");
                }
            }
        }

        debug!(hits = hits.len(), "search complete");
        Ok(hits)
    }
}

/// Parse a URL-bearing field: direct parse first, then the regex fallback
/// for URLs embedded in surrounding text.
fn parse_hit_url(field: &str) -> Option<Url> {
    let trimmed = field.trim();
    if let Ok(url) = Url::parse(trimmed) {
        return Some(url);
    }
    extract_url(trimmed)
}

/// Extract the first embedded URL from arbitrary text, if any.
pub fn extract_url(text: &str) -> Option<Url> {
    URL_RE
        .find(text)
        .and_then(|m| Url::parse(m.as_str()).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> SearchClient {
        let config = SearchConfig {
            endpoint: format!("{}/search", server.uri()),
            api_key_env: "EI_SEARCH_TEST_KEY_UNSET".into(),
        };
        SearchClient::new(&config).expect("build client")
    }

    fn bing_body(values: serde_json::Value) -> serde_json::Value {
        serde_json::json!({ "webPages": { "value": values } })
    }

    #[tokio::test]
    async fn search_returns_hits_in_backend_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "current executives for Acme Corp"))
            .respond_with(ResponseTemplate::new(200).set_body_json(bing_body(serde_json::json!([
                { "name": "Acme leadership", "url": "https://acme.example/leadership" },
                { "name": "Acme board", "url": "https://acme.example/board" },
            ]))))
            .mount(&server)
            .await;

        let hits = client_for(&server)
            .search("current executives for Acme Corp", 3, None)
            .await
            .expect("search");

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "Acme leadership");
        assert_eq!(hits[0].url.as_str(), "https://acme.example/leadership");
        assert_eq!(hits[1].url.as_str(), "https://acme.example/board");
    }

    #[tokio::test]
    async fn unparseable_url_field_is_dropped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(bing_body(serde_json::json!([
                { "name": "good", "url": "https://ok.example/page" },
                { "name": "bad", "url": "not a url at all" },
            ]))))
            .mount(&server)
            .await;

        let hits = client_for(&server).search("q", 5, None).await.expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "good");
    }

    #[tokio::test]
    async fn url_recovered_from_decorated_field() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(bing_body(serde_json::json!([
                { "name": "wrapped", "url": "See https://ok.example/deep/page?id=7 for details" },
            ]))))
            .mount(&server)
            .await;

        let hits = client_for(&server).search("q", 1, None).await.expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url.as_str(), "https://ok.example/deep/page?id=7");
    }

    #[tokio::test]
    async fn count_truncates_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(bing_body(serde_json::json!([
                { "name": "a", "url": "https://a.example/" },
                { "name": "b", "url": "https://b.example/" },
                { "name": "c", "url": "https://c.example/" },
            ]))))
            .mount(&server)
            .await;

        let hits = client_for(&server).search("q", 2, None).await.expect("search");
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn freshness_window_is_sent() {
        let server = MockServer::start().await;
        let window = FreshnessWindow::last_year();
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("freshness", window.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(bing_body(serde_json::json!([]))))
            .mount(&server)
            .await;

        let hits = client_for(&server)
            .search("q", 1, Some(window))
            .await
            .expect("search");
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn backend_error_is_reported_to_caller() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = client_for(&server).search("q", 1, None).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("500"));
    }

    #[tokio::test]
    async fn empty_web_pages_yields_empty_hits() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let hits = client_for(&server).search("q", 3, None).await.expect("search");
        assert!(hits.is_empty());
    }

    #[test]
    fn extract_url_finds_first_embedded_url() {
        let url = extract_url("prose before https://example.com/a?x=1 and after").unwrap();
        assert_eq!(url.as_str(), "https://example.com/a?x=1");
        assert!(extract_url("no links here").is_none());
    }

    #[test]
    fn freshness_window_formats_as_date_range() {
        let window = FreshnessWindow {
            from: chrono::NaiveDate::from_ymd_opt(2025, 8, 6).unwrap(),
            to: chrono::NaiveDate::from_ymd_opt(2026, 8, 6).unwrap(),
        };
        assert_eq!(window.to_string(), "2025-08-06..2026-08-06");
    }
}
