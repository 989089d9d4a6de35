//! Trending repository discovery.
//!
//! Several public services publish "what is hot on GitHub" and none of them is
//! reliable on its own. Each one is wrapped as a [`TrendingSource`] that
//! normalizes its response into [`CandidateRecord`]s, and the
//! [`TrendingResolver`] walks them in priority order until one answers.

mod parser;
mod resolver;
mod sources;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use trendbrief_shared::{CandidateRecord, DiscoveryFilters, Result, TrendBriefError};

pub use parser::parse_trending_page;
pub use resolver::{Resolved, TrendingResolver};
pub use sources::{GithubSearchSource, GithubTrendingPageSource, OssInsightSource};

/// User-Agent string for discovery requests.
pub(crate) const USER_AGENT: &str = concat!("trendbrief/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 3;

// ---------------------------------------------------------------------------
// Strategy trait
// ---------------------------------------------------------------------------

/// One interchangeable implementation of the discovery capability.
///
/// A strategy makes a single attempt per call. An empty result is reported as
/// an error so the resolver treats it like any other failure.
#[async_trait]
pub trait TrendingSource: Send + Sync {
    /// Short name for logs and reports (e.g. `"ossinsight"`).
    fn name(&self) -> &str;

    /// Fetch up to `limit` trending repositories, in the source's own order.
    async fn fetch(&self, limit: usize, filters: &DiscoveryFilters)
    -> Result<Vec<CandidateRecord>>;
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Settings shared by the built-in strategies.
#[derive(Clone, Default)]
pub struct SourceOptions {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Optional GitHub token for the GitHub-backed strategies.
    pub github_token: Option<String>,
}

impl SourceOptions {
    pub fn new(timeout: Duration, github_token: Option<String>) -> Self {
        Self {
            timeout,
            github_token,
        }
    }
}

/// Build a reqwest client with the discovery defaults.
pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(timeout)
        .build()
        .map_err(|e| TrendBriefError::Network(format!("failed to build HTTP client: {e}")))
}

/// Send a prepared request and return the body of a 2xx response.
pub(crate) async fn send_for_text(request: reqwest::RequestBuilder, what: &str) -> Result<String> {
    let response = request
        .send()
        .await
        .map_err(|e| TrendBriefError::Network(format!("{what}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(200).collect();
        return Err(TrendBriefError::Network(format!(
            "{what}: HTTP {status}: {snippet}"
        )));
    }

    response
        .text()
        .await
        .map_err(|e| TrendBriefError::Network(format!("{what}: failed to read body: {e}")))
}

/// Read a count that some APIs send as a number and others as a string.
pub(crate) fn lenient_u64(value: Option<&serde_json::Value>) -> u64 {
    match value {
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().map(|f| f.max(0.0) as u64))
            .unwrap_or(0),
        Some(serde_json::Value::String(s)) => parse_count(s).unwrap_or(0),
        _ => 0,
    }
}

/// Parse counts like `"12,345"` or `"1.2k"`.
pub(crate) fn parse_count(text: &str) -> Option<u64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | ' '))
        .collect();
    if let Some(k) = cleaned.strip_suffix(['k', 'K']) {
        return k.parse::<f64>().ok().map(|v| (v * 1000.0).round() as u64);
    }
    cleaned
        .parse::<u64>()
        .ok()
        .or_else(|| cleaned.parse::<f64>().ok().map(|v| v.max(0.0) as u64))
}
