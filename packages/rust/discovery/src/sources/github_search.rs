//! GitHub repository search API: recently pushed, highly starred repositories.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};
use trendbrief_shared::{CandidateRecord, DiscoveryFilters, Result, TrendBriefError};

use crate::{SourceOptions, TrendingSource, build_client, send_for_text};

const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Only repositories above this star count are considered.
const MIN_STARS: u64 = 500;

/// Search API page size ceiling.
const MAX_PER_PAGE: usize = 100;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    full_name: String,
    description: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    language: Option<String>,
    html_url: Option<String>,
    owner: Option<Owner>,
    #[serde(default)]
    forks_count: u64,
    open_issues_count: Option<u64>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    default_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Owner {
    login: String,
}

/// Approximates "trending" as most-starred among recently pushed repositories.
pub struct GithubSearchSource {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl GithubSearchSource {
    pub fn new(opts: &SourceOptions) -> Result<Self> {
        Ok(Self {
            client: build_client(opts.timeout)?,
            base_url: DEFAULT_BASE_URL.to_string(),
            token: opts.github_token.clone(),
        })
    }

    /// Point at a different host (used by tests).
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }
}

/// Build the search qualifier string for a given cut-off date.
fn search_query(since: NaiveDate, filters: &DiscoveryFilters) -> String {
    let mut q = format!("pushed:>={} stars:>{MIN_STARS}", since.format("%Y-%m-%d"));
    if let Some(lang) = &filters.language {
        if lang.contains(' ') {
            q.push_str(&format!(" language:\"{lang}\""));
        } else {
            q.push_str(&format!(" language:{lang}"));
        }
    }
    q
}

#[async_trait]
impl TrendingSource for GithubSearchSource {
    fn name(&self) -> &str {
        "github-search"
    }

    #[instrument(skip_all, fields(source = "github-search", limit = limit))]
    async fn fetch(
        &self,
        limit: usize,
        filters: &DiscoveryFilters,
    ) -> Result<Vec<CandidateRecord>> {
        let since = Utc::now().date_naive() - chrono::Duration::days(filters.period.days());
        let q = search_query(since, filters);
        let per_page = limit.clamp(1, MAX_PER_PAGE).to_string();
        let url = format!("{}/search/repositories", self.base_url);
        debug!(%url, %q, "searching repositories");

        let mut request = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/vnd.github.v3+json")
            .query(&[
                ("q", q.as_str()),
                ("sort", "stars"),
                ("order", "desc"),
                ("per_page", per_page.as_str()),
            ]);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let body = send_for_text(request, "github-search").await?;
        let response: SearchResponse = serde_json::from_str(&body)
            .map_err(|e| TrendBriefError::parse(format!("github-search: {e}")))?;

        let records: Vec<CandidateRecord> = response
            .items
            .into_iter()
            .filter(|item| !item.full_name.trim().is_empty())
            .take(limit)
            .map(normalize)
            .collect();

        if records.is_empty() {
            return Err(TrendBriefError::Network(
                "github search returned no repositories".into(),
            ));
        }

        Ok(records)
    }
}

fn normalize(item: Item) -> CandidateRecord {
    let mut record = CandidateRecord::new(item.full_name);

    if let Some(desc) = item.description.filter(|d| !d.trim().is_empty()) {
        record.description = desc;
    }
    if let Some(lang) = item.language.filter(|l| !l.trim().is_empty()) {
        record.language = lang;
    }
    if let Some(url) = item.html_url {
        record.url = url;
    }
    if let Some(owner) = item.owner {
        record.author = owner.login;
    }
    record.default_branch = item.default_branch.filter(|b| !b.is_empty());
    record.stars = item.stargazers_count;
    record.forks = item.forks_count;
    record.open_issues = item.open_issues_count;
    record.created_at = item.created_at;
    record.updated_at = item.updated_at;

    record
}
