//! End-of-run summary.

use std::fmt;
use std::time::Duration;

use trendbrief_readme::EnrichStats;
use trendbrief_shared::ProcessedRecord;
use trendbrief_store::{DedupOutcome, WriteReport};

use crate::generation::GenerationStats;

/// What happened at the persistence step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceOutcome {
    Written(WriteReport),
    /// Nothing was written, and why.
    Skipped { reason: String },
}

/// Everything a run did, in the order it did it.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Candidates returned by the winning source.
    pub fetched: usize,
    /// Name of the source that answered.
    pub source: String,
    pub dedup: DedupOutcome,
    /// Candidates kept after dedup and the processing cap.
    pub selected: usize,
    pub readme: EnrichStats,
    pub generation: GenerationStats,
    pub persistence: PersistenceOutcome,
    pub elapsed: Duration,
    pub processed: Vec<ProcessedRecord>,
}

impl RunReport {
    /// Records that reached the store.
    pub fn persisted(&self) -> usize {
        match &self.persistence {
            PersistenceOutcome::Written(w) => w.succeeded,
            PersistenceOutcome::Skipped { .. } => 0,
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Fetched:     {} (from {})", self.fetched, self.source)?;
        writeln!(f, "Dedup:       {}", self.dedup)?;
        writeln!(f, "Selected:    {}", self.selected)?;
        writeln!(
            f,
            "README:      {} found, {} missing",
            self.readme.with_readme, self.readme.without_readme
        )?;
        writeln!(
            f,
            "Copy:        {} generated, {} partial, {} fallback",
            self.generation.generated, self.generation.partial, self.generation.fallback
        )?;

        match &self.persistence {
            PersistenceOutcome::Written(w) => {
                writeln!(
                    f,
                    "Persisted:   {} succeeded, {} failed, {} skipped",
                    w.succeeded, w.failed, w.skipped
                )?;
                for skipped in &w.skipped_details {
                    writeln!(
                        f,
                        "  skipped #{} {}: missing {}",
                        skipped.index,
                        skipped.name,
                        skipped.missing_names().join(", ")
                    )?;
                }
                for (name, error) in &w.failures {
                    writeln!(f, "  failed {name}: {error}")?;
                }
            }
            PersistenceOutcome::Skipped { reason } => {
                writeln!(f, "Persisted:   skipped ({reason})")?;
            }
        }

        write!(f, "Elapsed:     {:.1}s", self.elapsed.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trendbrief_store::{RequiredField, SkippedRecord};

    fn report(persistence: PersistenceOutcome) -> RunReport {
        RunReport {
            fetched: 25,
            source: "ossinsight".into(),
            dedup: DedupOutcome::Filtered {
                known: 10,
                removed: 5,
            },
            selected: 10,
            readme: EnrichStats {
                with_readme: 9,
                without_readme: 1,
            },
            generation: GenerationStats {
                generated: 8,
                partial: 1,
                fallback: 1,
            },
            persistence,
            elapsed: Duration::from_millis(12_300),
            processed: Vec::new(),
        }
    }

    #[test]
    fn summary_lists_missing_fields() {
        let written = WriteReport {
            succeeded: 9,
            failed: 0,
            skipped: 1,
            skipped_details: vec![SkippedRecord {
                index: 4,
                name: "a/b".into(),
                missing: vec![RequiredField::Audience],
            }],
            failures: Vec::new(),
        };
        let r = report(PersistenceOutcome::Written(written));
        let text = r.to_string();

        assert_eq!(r.persisted(), 9);
        assert!(text.contains("Fetched:     25 (from ossinsight)"));
        assert!(text.contains("5 removed (10 recorded in window)"));
        assert!(text.contains("8 generated, 1 partial, 1 fallback"));
        assert!(text.contains("9 succeeded, 0 failed, 1 skipped"));
        assert!(text.contains("skipped #4 a/b: missing 用户群体"));
        assert!(text.ends_with("Elapsed:     12.3s"));
    }

    #[test]
    fn summary_explains_skipped_persistence() {
        let r = report(PersistenceOutcome::Skipped {
            reason: "NOTION_API_KEY not set".into(),
        });
        assert_eq!(r.persisted(), 0);
        assert!(r.to_string().contains("Persisted:   skipped (NOTION_API_KEY not set)"));
    }
}
