//! GitHub contents API fetcher.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;
use tracing::{debug, instrument};
use trendbrief_shared::{Result, TrendBriefError};
use url::Url;

use crate::DocumentFetcher;

/// User-Agent string for README requests.
const USER_AGENT: &str = concat!("trendbrief/", env!("CARGO_PKG_VERSION"));

const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Asks the API for the raw file instead of the JSON envelope.
const RAW_MEDIA_TYPE: &str = "application/vnd.github.v3.raw";

/// JSON envelope returned when the raw media type is not honored.
#[derive(Debug, Deserialize)]
struct ContentsPayload {
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

/// Reads files through `GET /repos/{owner}/{repo}/contents/{path}`.
pub struct GithubContentsFetcher {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl GithubContentsFetcher {
    pub fn new(timeout: Duration, token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| TrendBriefError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            token,
        })
    }

    /// Point at a different host (used by tests).
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn contents_url(
        &self,
        owner: &str,
        repo: &str,
        branch: Option<&str>,
        filename: &str,
    ) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| TrendBriefError::config(format!("invalid GitHub API URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| TrendBriefError::config("GitHub API URL cannot have a path"))?
            .pop_if_empty()
            .extend(["repos", owner, repo, "contents", filename]);
        if let Some(branch) = branch {
            url.query_pairs_mut().append_pair("ref", branch);
        }
        Ok(url)
    }
}

#[async_trait]
impl DocumentFetcher for GithubContentsFetcher {
    #[instrument(skip_all, fields(owner = owner, repo = repo, filename = filename))]
    async fn fetch_document(
        &self,
        owner: &str,
        repo: &str,
        branch: Option<&str>,
        filename: &str,
    ) -> Result<Option<String>> {
        let url = self.contents_url(owner, repo, branch, filename)?;

        let mut request = self
            .client
            .get(url.as_str())
            .header(header::ACCEPT, RAW_MEDIA_TYPE);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TrendBriefError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("not present");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(TrendBriefError::Network(format!("{url}: HTTP {status}")));
        }

        let is_json = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("json"));

        let body = response
            .text()
            .await
            .map_err(|e| TrendBriefError::Network(format!("{url}: failed to read body: {e}")))?;

        let text = if is_json { decode_payload(&body)? } else { body };

        if text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(text))
    }
}

/// Unpack the JSON envelope, decoding base64 content.
fn decode_payload(body: &str) -> Result<String> {
    let payload: ContentsPayload = serde_json::from_str(body)
        .map_err(|e| TrendBriefError::parse(format!("contents payload: {e}")))?;

    if payload.encoding != "base64" {
        return Ok(payload.content);
    }

    // GitHub wraps base64 at 60 columns.
    let compact: String = payload
        .content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| TrendBriefError::parse(format!("contents payload is not base64: {e}")))?;

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
