//! The public github.com/trending page, scraped.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};
use trendbrief_shared::{CandidateRecord, DiscoveryFilters, Result, TrendBriefError, TrendPeriod};
use url::Url;

use crate::{SourceOptions, TrendingSource, build_client, parse_trending_page, send_for_text};

const DEFAULT_BASE_URL: &str = "https://github.com";

/// Reads the HTML trending page; no API quota involved.
pub struct GithubTrendingPageSource {
    client: Client,
    base_url: String,
}

impl GithubTrendingPageSource {
    pub fn new(opts: &SourceOptions) -> Result<Self> {
        Ok(Self {
            client: build_client(opts.timeout)?,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point at a different host (used by tests).
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn page_url(&self, filters: &DiscoveryFilters) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/trending", self.base_url))
            .map_err(|e| TrendBriefError::config(format!("invalid trending URL: {e}")))?;

        if let Some(lang) = &filters.language {
            url.path_segments_mut()
                .map_err(|_| TrendBriefError::config("trending URL cannot have a path"))?
                .push(&language_slug(lang));
        }
        url.query_pairs_mut()
            .append_pair("since", since_param(filters.period));
        Ok(url)
    }
}

#[async_trait]
impl TrendingSource for GithubTrendingPageSource {
    fn name(&self) -> &str {
        "github-trending"
    }

    #[instrument(skip_all, fields(source = "github-trending", limit = limit))]
    async fn fetch(
        &self,
        limit: usize,
        filters: &DiscoveryFilters,
    ) -> Result<Vec<CandidateRecord>> {
        let url = self.page_url(filters)?;
        debug!(%url, "requesting trending page");

        let request = self
            .client
            .get(url.as_str())
            .header(reqwest::header::ACCEPT, "text/html");
        let html = send_for_text(request, "github-trending").await?;

        let mut records = parse_trending_page(&html)?;
        records.truncate(limit);

        if records.is_empty() {
            return Err(TrendBriefError::Network(
                "github trending page listed no repositories".into(),
            ));
        }

        Ok(records)
    }
}

fn since_param(period: TrendPeriod) -> &'static str {
    match period {
        TrendPeriod::Day => "daily",
        TrendPeriod::Week => "weekly",
        TrendPeriod::Month => "monthly",
    }
}

/// GitHub's trending URLs use lowercase, dash-separated language names.
fn language_slug(language: &str) -> String {
    language.trim().to_lowercase().replace(' ', "-")
}
