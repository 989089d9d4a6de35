//! Notion database backend.
//!
//! Entries are pages in one database. The title property holds the repository
//! identifier and the date property holds the run date, which is what the
//! dedup query filters on.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info, instrument};
use trendbrief_shared::{PersistedRecord, Result, TrendBriefError, truncate_chars};

use crate::{IdentifierPage, RecordStore, RequiredField};

/// API version sent with every request.
pub const NOTION_VERSION: &str = "2022-06-28";

/// Title given to databases created by [`NotionStore::create_database`].
pub const DATABASE_TITLE: &str = "GitHub 热门仓库";

/// Date property written with each entry and used by the dedup query.
pub const DATE_PROPERTY: &str = "日期";

const DEFAULT_BASE_URL: &str = "https://api.notion.com/v1";
const USER_AGENT: &str = concat!("trendbrief/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Notion's page size ceiling for database queries.
const QUERY_PAGE_SIZE: u32 = 100;

const RICH_TEXT_MAX_CHARS: usize = 2000;

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<PageObject>,
    #[serde(default)]
    has_more: bool,
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PageObject {
    #[serde(default)]
    properties: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct CreatedObject {
    id: String,
}

// ---------------------------------------------------------------------------
// NotionStore
// ---------------------------------------------------------------------------

/// A Notion database used as the record store.
pub struct NotionStore {
    client: Client,
    base_url: String,
    api_key: String,
    database_id: String,
}

impl NotionStore {
    /// Create a store bound to `database_id`.
    pub fn new(api_key: impl Into<String>, database_id: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TrendBriefError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            database_id: database_id.into(),
        })
    }

    /// Point at a different host (used by tests).
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Create a database under `parent_page_id` with every property an entry
    /// needs, returning the new database id.
    #[instrument(skip_all, fields(parent = parent_page_id))]
    pub async fn create_database(&self, parent_page_id: &str) -> Result<String> {
        let body = json!({
            "parent": { "type": "page_id", "page_id": parent_page_id },
            "title": [{ "type": "text", "text": { "content": DATABASE_TITLE } }],
            "properties": database_schema(),
        });

        let request = self.post("databases").json(&body);
        let text = self.send(request, "create database").await?;
        let created: CreatedObject = serde_json::from_str(&text)
            .map_err(|e| TrendBriefError::parse(format!("create database response: {e}")))?;

        info!(id = %created.id, "database created");
        Ok(created.id)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(format!("{}/{path}", self.base_url))
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<String> {
        let response = request
            .send()
            .await
            .map_err(|e| TrendBriefError::Network(format!("notion {what}: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TrendBriefError::Network(format!("notion {what}: failed to read body: {e}")))?;

        if !status.is_success() {
            let snippet = truncate_chars(&body, 300);
            return Err(TrendBriefError::Store(format!(
                "notion {what}: HTTP {status}: {snippet}"
            )));
        }
        Ok(body)
    }
}

#[async_trait]
impl RecordStore for NotionStore {
    #[instrument(skip_all, fields(since = %since, paged = cursor.is_some()))]
    async fn query_identifiers(
        &self,
        since: NaiveDate,
        cursor: Option<String>,
    ) -> Result<IdentifierPage> {
        let mut body = json!({
            "filter": {
                "property": DATE_PROPERTY,
                "date": { "on_or_after": since.format("%Y-%m-%d").to_string() }
            },
            "page_size": QUERY_PAGE_SIZE,
        });
        if let Some(cursor) = cursor {
            body["start_cursor"] = Value::String(cursor);
        }

        let path = format!("databases/{}/query", self.database_id);
        let text = self.send(self.post(&path).json(&body), "query").await?;
        let response: QueryResponse = serde_json::from_str(&text)
            .map_err(|e| TrendBriefError::parse(format!("notion query response: {e}")))?;

        let identifiers: Vec<String> = response
            .results
            .iter()
            .filter_map(|page| title_text(&page.properties))
            .collect();
        debug!(count = identifiers.len(), has_more = response.has_more, "query page read");

        Ok(IdentifierPage {
            identifiers,
            next_cursor: response.next_cursor.filter(|_| response.has_more),
        })
    }

    #[instrument(skip_all, fields(repo = %record.name))]
    async fn create_entry(&self, record: &PersistedRecord) -> Result<()> {
        let body = json!({
            "parent": { "database_id": self.database_id },
            "properties": entry_properties(record),
        });
        self.send(self.post("pages").json(&body), "create page").await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Property encoding
// ---------------------------------------------------------------------------

fn rich_text(content: &str) -> Value {
    json!({ "rich_text": [{ "text": { "content": truncate_chars(content, RICH_TEXT_MAX_CHARS) } }] })
}

/// Page properties for one entry. Blank optional text is omitted rather than
/// sent as an empty rich-text run.
fn entry_properties(record: &PersistedRecord) -> Value {
    let mut props = Map::new();

    props.insert(
        RequiredField::Name.display_name().into(),
        json!({ "title": [{ "text": { "content": record.name } }] }),
    );
    props.insert(
        DATE_PROPERTY.into(),
        json!({ "date": { "start": record.date.format("%Y-%m-%d").to_string() } }),
    );

    let texts = [
        (RequiredField::OneLiner, &record.one_liner),
        (RequiredField::Value, &record.value),
        (RequiredField::Audience, &record.audience),
        (RequiredField::Xiaohongshu, &record.xiaohongshu),
        (RequiredField::Wechat, &record.wechat),
    ];
    for (field, text) in texts {
        if !text.trim().is_empty() {
            props.insert(field.display_name().into(), rich_text(text));
        }
    }

    if !record.url.is_empty() {
        props.insert(
            RequiredField::Url.display_name().into(),
            json!({ "url": record.url }),
        );
    }

    if !record.tags.is_empty() {
        let options: Vec<Value> = record.tags.iter().map(|t| json!({ "name": t })).collect();
        props.insert(
            RequiredField::Tags.display_name().into(),
            json!({ "multi_select": options }),
        );
    }

    Value::Object(props)
}

/// Property schema for a new database, matching [`entry_properties`].
fn database_schema() -> Value {
    let mut schema = Map::new();
    for field in RequiredField::ALL {
        let kind = match field {
            RequiredField::Name => json!({ "title": {} }),
            RequiredField::Url => json!({ "url": {} }),
            RequiredField::Tags => json!({ "multi_select": { "options": [] } }),
            _ => json!({ "rich_text": {} }),
        };
        schema.insert(field.display_name().into(), kind);
    }
    schema.insert(DATE_PROPERTY.into(), json!({ "date": {} }));
    Value::Object(schema)
}

/// Concatenated plain text of the title property.
fn title_text(properties: &Map<String, Value>) -> Option<String> {
    let runs = properties
        .get(RequiredField::Name.display_name())?
        .get("title")?
        .as_array()?;

    let text: String = runs
        .iter()
        .filter_map(|run| {
            run.get("plain_text")
                .or_else(|| run.get("text").and_then(|t| t.get("content")))
                .and_then(Value::as_str)
        })
        .collect();

    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
