//! Validate processed records and write the complete ones.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{info, instrument, warn};
use trendbrief_shared::{
    PersistedRecord, ProcessedRecord, Result, StageProgress, TrendBriefError,
};

use crate::{RecordStore, SkippedRecord, validate_all};

/// Counts from one [`Writer::write`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub succeeded: usize,
    pub failed: usize,
    /// Records excluded by validation.
    pub skipped: usize,
    pub skipped_details: Vec<SkippedRecord>,
    /// `(identifier, error)` for each failed write.
    pub failures: Vec<(String, String)>,
}

/// Sequential writer with fixed pacing between writes.
pub struct Writer {
    store: Arc<dyn RecordStore>,
    delay: Duration,
}

impl Writer {
    /// A writer needs a store; without one this is `ConfigMissing`.
    pub fn new(store: Option<Arc<dyn RecordStore>>, delay: Duration) -> Result<Self> {
        let store = store.ok_or_else(|| TrendBriefError::config_missing("record store"))?;
        Ok(Self { store, delay })
    }

    /// Validate `records`, then write each complete one dated `date`.
    ///
    /// A failed write is counted and the batch continues.
    #[instrument(skip_all, fields(records = records.len(), date = %date))]
    pub async fn write(
        &self,
        records: &[ProcessedRecord],
        date: NaiveDate,
        progress: &dyn StageProgress,
    ) -> WriteReport {
        let validation = validate_all(records);
        for detail in &validation.details {
            warn!(
                index = detail.index,
                repo = %detail.name,
                missing = ?detail.missing_names(),
                "incomplete record skipped"
            );
        }

        let mut report = WriteReport {
            skipped: validation.invalid,
            skipped_details: validation.details,
            ..Default::default()
        };

        let skipped_indexes: Vec<usize> = report.skipped_details.iter().map(|d| d.index).collect();
        let valid: Vec<&ProcessedRecord> = records
            .iter()
            .enumerate()
            .filter(|(i, _)| !skipped_indexes.contains(&(i + 1)))
            .map(|(_, r)| r)
            .collect();

        let total = valid.len();
        progress.phase("Writing records");
        for (i, record) in valid.into_iter().enumerate() {
            progress.task_progress(i + 1, total, record.name());

            let entry = PersistedRecord::from_processed(record, date);
            match self.store.create_entry(&entry).await {
                Ok(()) => report.succeeded += 1,
                Err(e) => {
                    warn!(repo = %record.name(), error = %e, "write failed");
                    report.failed += 1;
                    report.failures.push((record.name().to_string(), e.to_string()));
                }
            }

            if i + 1 < total && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            "write complete"
        );
        report
    }
}
