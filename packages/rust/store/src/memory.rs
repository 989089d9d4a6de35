//! In-process record store.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use trendbrief_shared::{PersistedRecord, Result, TrendBriefError};

use crate::{IdentifierPage, RecordStore};

/// Keeps entries in a `Vec`. Queries page through them with an index cursor so
/// pagination behaves like a real backend; failures can be injected.
pub struct MemoryStore {
    entries: Mutex<Vec<PersistedRecord>>,
    page_size: usize,
    fail_queries: bool,
    rejected: HashSet<String>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            page_size: 100,
            fail_queries: false,
            rejected: HashSet::new(),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with entries.
    pub fn with_entries(self, entries: Vec<PersistedRecord>) -> Self {
        if let Ok(mut guard) = self.entries.lock() {
            guard.extend(entries);
        }
        self
    }

    /// Identifiers returned per query page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Make every query fail.
    pub fn failing_queries(mut self) -> Self {
        self.fail_queries = true;
        self
    }

    /// Make writes for `name` fail.
    pub fn rejecting(mut self, name: impl Into<String>) -> Self {
        self.rejected.insert(name.into());
        self
    }

    /// Snapshot of everything written so far.
    pub fn entries(&self) -> Vec<PersistedRecord> {
        self.entries
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<PersistedRecord>>> {
        self.entries
            .lock()
            .map_err(|_| TrendBriefError::Store("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn query_identifiers(
        &self,
        since: NaiveDate,
        cursor: Option<String>,
    ) -> Result<IdentifierPage> {
        if self.fail_queries {
            return Err(TrendBriefError::Store("query failed (injected)".into()));
        }

        let start = match cursor {
            Some(c) => c
                .parse::<usize>()
                .map_err(|_| TrendBriefError::Store(format!("bad cursor '{c}'")))?,
            None => 0,
        };

        let matching: Vec<String> = self
            .lock()?
            .iter()
            .filter(|e| e.date >= since)
            .map(|e| e.name.clone())
            .collect();

        let end = (start + self.page_size).min(matching.len());
        let identifiers = matching.get(start..end).map(<[String]>::to_vec).unwrap_or_default();
        let next_cursor = (end < matching.len()).then(|| end.to_string());

        Ok(IdentifierPage {
            identifiers,
            next_cursor,
        })
    }

    async fn create_entry(&self, record: &PersistedRecord) -> Result<()> {
        if self.rejected.contains(&record.name) {
            return Err(TrendBriefError::Store(format!(
                "write rejected for {} (injected)",
                record.name
            )));
        }
        self.lock()?.push(record.clone());
        Ok(())
    }
}
