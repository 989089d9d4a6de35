//! Structured-store integration for trendbrief.
//!
//! The store is the only state that survives between runs. It is read once per
//! run to find repositories recorded recently ([`DedupFilter`]) and written at
//! the end with validated records ([`Writer`]).
//!
//! **Access rules:**
//! - [`NotionStore`] talks to a Notion database over its REST API
//! - [`MemoryStore`] keeps entries in process (tests, dry runs of the writer)

mod dedup;
mod memory;
mod notion;
mod validate;
mod writer;

use async_trait::async_trait;
use chrono::NaiveDate;
use trendbrief_shared::{PersistedRecord, Result};

pub use dedup::{DedupFilter, DedupOutcome};
pub use memory::MemoryStore;
pub use notion::{DATABASE_TITLE, DATE_PROPERTY, NOTION_VERSION, NotionStore};
pub use validate::{RequiredField, SkippedRecord, ValidationReport, missing_fields, validate_all};
pub use writer::{WriteReport, Writer};

/// One page of identifiers returned by [`RecordStore::query_identifiers`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierPage {
    pub identifiers: Vec<String>,
    /// Cursor for the next page; `None` when exhausted.
    pub next_cursor: Option<String>,
}

/// The external structured store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Identifiers of entries dated on or after `since`, one page at a time.
    async fn query_identifiers(
        &self,
        since: NaiveDate,
        cursor: Option<String>,
    ) -> Result<IdentifierPage>;

    /// Write one entry.
    async fn create_entry(&self, record: &PersistedRecord) -> Result<()>;
}
