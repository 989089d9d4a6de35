//! OSS Insight trending API (PingCAP).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};
use trendbrief_shared::{CandidateRecord, DiscoveryFilters, Result, TrendBriefError};

use crate::{SourceOptions, TrendingSource, build_client, lenient_u64, send_for_text};

const DEFAULT_BASE_URL: &str = "https://api.ossinsight.io";
const TRENDING_PATH: &str = "/q/trending-repos";

/// Response envelope. `data` is either the row list itself or an object
/// carrying `rows`, depending on the API revision.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Payload>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Payload {
    Rows(Vec<Row>),
    Table { rows: Vec<Row> },
}

#[derive(Debug, Deserialize)]
struct Row {
    repo_name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, alias = "primary_language")]
    language: Option<String>,
    #[serde(default)]
    stars: Option<serde_json::Value>,
    #[serde(default)]
    forks: Option<serde_json::Value>,
    #[serde(default)]
    total_score: Option<serde_json::Value>,
}

/// Trending repositories ranked by OSS Insight's activity score.
pub struct OssInsightSource {
    client: Client,
    base_url: String,
}

impl OssInsightSource {
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
}

#[async_trait]
impl TrendingSource for OssInsightSource {
    fn name(&self) -> &str {
        "ossinsight"
    }

    #[instrument(skip_all, fields(source = "ossinsight", limit = limit))]
    async fn fetch(
        &self,
        limit: usize,
        filters: &DiscoveryFilters,
    ) -> Result<Vec<CandidateRecord>> {
        let url = format!("{}{TRENDING_PATH}", self.base_url);
        let language = filters.language.as_deref().unwrap_or("All");
        debug!(%url, language, period = %filters.period, "requesting trending repos");

        let request = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[("language", language), ("period", filters.period.as_str())]);
        let body = send_for_text(request, "ossinsight").await?;

        let envelope: Envelope = serde_json::from_str(&body)
            .map_err(|e| TrendBriefError::parse(format!("ossinsight: {e}")))?;

        let rows = match envelope.data {
            Some(Payload::Rows(rows)) | Some(Payload::Table { rows }) => rows,
            None => Vec::new(),
        };

        let records: Vec<CandidateRecord> = rows
            .into_iter()
            .filter_map(normalize)
            .take(limit)
            .collect();

        if records.is_empty() {
            return Err(TrendBriefError::Network(
                "ossinsight returned no repositories".into(),
            ));
        }

        Ok(records)
    }
}

fn normalize(row: Row) -> Option<CandidateRecord> {
    let name = row.repo_name.filter(|n| !n.trim().is_empty())?;
    let mut record = CandidateRecord::new(name.trim());

    if let Some(desc) = row.description.filter(|d| !d.trim().is_empty()) {
        record.description = desc;
    }
    if let Some(lang) = row.language.filter(|l| !l.trim().is_empty()) {
        record.language = lang;
    }
    record.stars = lenient_u64(row.stars.as_ref());
    record.stars_today = Some(record.stars);
    record.forks = lenient_u64(row.forks.as_ref());
    record.total_score = row.total_score.as_ref().and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    });

    Some(record)
}
