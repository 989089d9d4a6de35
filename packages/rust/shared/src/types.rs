//! Core domain types for trendbrief records as they move through a run.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder used when a source reports no description.
pub const DEFAULT_DESCRIPTION: &str = "暂无描述";

/// Placeholder used when a source reports no primary language.
pub const UNKNOWN_LANGUAGE: &str = "未知";

// ---------------------------------------------------------------------------
// Discovery filters
// ---------------------------------------------------------------------------

/// Trending time range understood by every discovery strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendPeriod {
    #[default]
    #[serde(rename = "past_24_hours")]
    Day,
    #[serde(rename = "past_week")]
    Week,
    #[serde(rename = "past_month")]
    Month,
}

impl TrendPeriod {
    /// Wire name used in config files and by OSS Insight.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "past_24_hours",
            Self::Week => "past_week",
            Self::Month => "past_month",
        }
    }

    /// Lookback in days, for sources that filter by push date.
    pub fn days(&self) -> i64 {
        match self {
            Self::Day => 1,
            Self::Week => 7,
            Self::Month => 30,
        }
    }
}

impl std::fmt::Display for TrendPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TrendPeriod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "past_24_hours" | "day" | "daily" => Ok(Self::Day),
            "past_week" | "week" | "weekly" => Ok(Self::Week),
            "past_month" | "month" | "monthly" => Ok(Self::Month),
            other => Err(format!(
                "unknown period '{other}': expected past_24_hours, past_week or past_month"
            )),
        }
    }
}

/// Optional narrowing applied by discovery strategies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryFilters {
    /// Primary language; `None` means all languages.
    pub language: Option<String>,
    /// Trending window.
    pub period: TrendPeriod,
}

impl DiscoveryFilters {
    /// Build filters from a config value where `"All"` (any case) means no filter.
    pub fn new(language: &str, period: TrendPeriod) -> Self {
        let language = match language.trim() {
            "" => None,
            l if l.eq_ignore_ascii_case("all") => None,
            l => Some(l.to_string()),
        };
        Self { language, period }
    }
}

// ---------------------------------------------------------------------------
// CandidateRecord
// ---------------------------------------------------------------------------

/// One discovered repository, normalized from whichever source found it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// `owner/name`; the deduplication key.
    pub name: String,
    pub description: String,
    pub language: String,
    pub stars: u64,
    /// Stars gained within the trending window, when the source reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stars_today: Option<u64>,
    pub forks: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_issues: Option<u64>,
    pub url: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Only set when the source reports it; lookups without one get the
    /// repository's actual default branch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
    /// Source-specific ranking score (OSS Insight only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_score: Option<f64>,
}

impl CandidateRecord {
    /// Create a record with defaults derived from the identifier alone.
    ///
    /// Sources fill in the remaining fields they know about.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let author = name.split('/').next().unwrap_or_default().to_string();
        Self {
            url: format!("https://github.com/{name}"),
            name,
            description: DEFAULT_DESCRIPTION.into(),
            language: UNKNOWN_LANGUAGE.into(),
            stars: 0,
            stars_today: None,
            forks: 0,
            open_issues: None,
            author,
            created_at: None,
            updated_at: None,
            default_branch: None,
            total_score: None,
        }
    }

    /// Owner and repository name, if the identifier has the `owner/name` shape.
    pub fn owner_and_repo(&self) -> Option<(&str, &str)> {
        let (owner, repo) = self.name.split_once('/')?;
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return None;
        }
        Some((owner, repo))
    }

    /// Whether the source actually knew the language.
    pub fn has_language(&self) -> bool {
        !self.language.is_empty() && self.language != UNKNOWN_LANGUAGE
    }
}

// ---------------------------------------------------------------------------
// EnrichedRecord
// ---------------------------------------------------------------------------

/// A candidate with its README attached (possibly empty).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub candidate: CandidateRecord,
    /// README text, truncated to the configured maximum.
    pub readme: String,
    /// Whether any README was found.
    pub has_readme: bool,
}

impl EnrichedRecord {
    /// Attach an empty document (the EnrichmentMiss case).
    pub fn without_readme(candidate: CandidateRecord) -> Self {
        Self {
            candidate,
            readme: String::new(),
            has_readme: false,
        }
    }
}

// ---------------------------------------------------------------------------
// MarketingContent
// ---------------------------------------------------------------------------

/// Derived descriptive copy for one repository.
///
/// Serde names match the JSON keys the generative prompt asks for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketingContent {
    pub one_liner: String,
    pub value: String,
    pub audience: String,
    /// Comma-separated labels.
    pub tags: String,
    /// Lively short-form promotional text.
    pub xiaohongshu: String,
    /// Formal long-form promotional text.
    pub wechat: String,
}

impl MarketingContent {
    /// Split the comma-separated labels, dropping blanks.
    pub fn tag_list(&self) -> Vec<String> {
        self.tags
            .split([',', '，'])
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect()
    }
}

/// How a record's marketing content was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentOrigin {
    /// Every field came from the model.
    Model,
    /// The model answered but some fields were filled from templates.
    Partial,
    /// Entirely template-derived.
    Fallback,
}

/// An enriched record plus its marketing content; the input to persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    #[serde(flatten)]
    pub enriched: EnrichedRecord,
    #[serde(flatten)]
    pub marketing: MarketingContent,
    pub origin: ContentOrigin,
}

impl ProcessedRecord {
    pub fn name(&self) -> &str {
        &self.enriched.candidate.name
    }

    pub fn candidate(&self) -> &CandidateRecord {
        &self.enriched.candidate
    }
}

// ---------------------------------------------------------------------------
// PersistedRecord
// ---------------------------------------------------------------------------

/// The subset of a processed record written to the external store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRecord {
    pub name: String,
    /// Date of the run that wrote this entry.
    pub date: NaiveDate,
    pub one_liner: String,
    pub value: String,
    pub audience: String,
    pub url: String,
    pub tags: Vec<String>,
    pub xiaohongshu: String,
    pub wechat: String,
}

impl PersistedRecord {
    pub fn from_processed(record: &ProcessedRecord, date: NaiveDate) -> Self {
        let m = &record.marketing;
        Self {
            name: record.name().to_string(),
            date,
            one_liner: m.one_liner.clone(),
            value: m.value.clone(),
            audience: m.audience.clone(),
            url: record.candidate().url.clone(),
            tags: m.tag_list(),
            xiaohongshu: m.xiaohongshu.clone(),
            wechat: m.wechat.clone(),
        }
    }
}
