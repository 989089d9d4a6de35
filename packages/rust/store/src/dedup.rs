//! Drop candidates the store already recorded within the trailing window.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Days, NaiveDate};
use tracing::{info, instrument, warn};
use trendbrief_shared::{CandidateRecord, Result};

use crate::RecordStore;

/// Upper bound on query pages read in one pass.
const MAX_QUERY_PAGES: usize = 1000;

/// What the dedup stage did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DedupOutcome {
    /// The store answered; `removed` candidates matched one of `known` identifiers.
    Filtered { known: usize, removed: usize },
    /// The store query failed; every candidate was passed through.
    Degraded { reason: String },
    /// No store to ask (unconfigured or dry run); every candidate was passed through.
    Skipped { reason: String },
}

impl DedupOutcome {
    pub fn removed(&self) -> usize {
        match self {
            Self::Filtered { removed, .. } => *removed,
            Self::Degraded { .. } | Self::Skipped { .. } => 0,
        }
    }
}

impl std::fmt::Display for DedupOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Filtered { known, removed } => {
                write!(f, "{removed} removed ({known} recorded in window)")
            }
            Self::Degraded { reason } => write!(f, "degraded, nothing removed ({reason})"),
            Self::Skipped { reason } => write!(f, "skipped ({reason})"),
        }
    }
}

/// Best-effort filter against recently stored identifiers.
pub struct DedupFilter {
    store: Arc<dyn RecordStore>,
    window_days: u32,
}

impl DedupFilter {
    pub fn new(store: Arc<dyn RecordStore>, window_days: u32) -> Self {
        Self { store, window_days }
    }

    /// First day of the window ending on `today`, inclusive.
    pub fn window_start(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_sub_days(Days::new(u64::from(self.window_days)))
            .unwrap_or(NaiveDate::MIN)
    }

    /// Every identifier stored on or after the window start, across all pages.
    pub async fn known_identifiers(&self, today: NaiveDate) -> Result<HashSet<String>> {
        let since = self.window_start(today);
        let mut known = HashSet::new();
        let mut cursor = None;

        for _ in 0..MAX_QUERY_PAGES {
            let page = self.store.query_identifiers(since, cursor).await?;
            known.extend(page.identifiers);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => return Ok(known),
            }
        }

        warn!(pages = MAX_QUERY_PAGES, "stopped paging store query early");
        Ok(known)
    }

    /// Remove candidates whose identifier is already stored.
    ///
    /// Order of the survivors is preserved. A failed store query passes every
    /// candidate through and reports [`DedupOutcome::Degraded`].
    #[instrument(skip_all, fields(candidates = candidates.len(), window_days = self.window_days))]
    pub async fn filter(
        &self,
        candidates: Vec<CandidateRecord>,
        today: NaiveDate,
    ) -> (Vec<CandidateRecord>, DedupOutcome) {
        let known = match self.known_identifiers(today).await {
            Ok(known) => known,
            Err(e) => {
                warn!(error = %e, "store query failed, treating every candidate as new");
                return (
                    candidates,
                    DedupOutcome::Degraded {
                        reason: e.to_string(),
                    },
                );
            }
        };

        let before = candidates.len();
        let fresh: Vec<CandidateRecord> = candidates
            .into_iter()
            .filter(|c| !known.contains(&c.name))
            .collect();
        let removed = before - fresh.len();

        info!(known = known.len(), removed, kept = fresh.len(), "deduplicated candidates");
        (
            fresh,
            DedupOutcome::Filtered {
                known: known.len(),
                removed,
            },
        )
    }
}
