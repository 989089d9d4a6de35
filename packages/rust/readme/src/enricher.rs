//! Attach README text to candidates.

use std::time::Duration;

use tracing::{debug, info, instrument};
use trendbrief_shared::{CandidateRecord, EnrichedRecord, StageProgress, truncate_chars};

use crate::{DocumentFetcher, README_NAMES};

/// Counts from one [`DetailEnricher::enrich_all`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichStats {
    pub with_readme: usize,
    pub without_readme: usize,
}

/// Looks up each candidate's README, one candidate at a time.
///
/// Never fails: a candidate whose README cannot be found is passed on with
/// an empty document.
pub struct DetailEnricher {
    fetcher: Box<dyn DocumentFetcher>,
    max_chars: usize,
    delay: Duration,
}

impl DetailEnricher {
    pub fn new(fetcher: Box<dyn DocumentFetcher>, max_chars: usize, delay: Duration) -> Self {
        Self {
            fetcher,
            max_chars,
            delay,
        }
    }

    /// Try each conventional README name until one returns text.
    #[instrument(skip_all, fields(repo = %candidate.name))]
    pub async fn enrich(&self, candidate: CandidateRecord) -> EnrichedRecord {
        let Some((owner, repo)) = candidate.owner_and_repo() else {
            debug!("identifier is not owner/name, skipping README lookup");
            return EnrichedRecord::without_readme(candidate);
        };

        for filename in README_NAMES {
            match self
                .fetcher
                .fetch_document(owner, repo, candidate.default_branch.as_deref(), filename)
                .await
            {
                Ok(Some(text)) if !text.trim().is_empty() => {
                    let readme = truncate_chars(&text, self.max_chars).to_string();
                    debug!(filename, chars = readme.chars().count(), "README found");
                    return EnrichedRecord {
                        has_readme: !readme.is_empty(),
                        readme,
                        candidate,
                    };
                }
                Ok(_) => {}
                Err(e) => debug!(filename, error = %e, "README lookup failed"),
            }
        }

        EnrichedRecord::without_readme(candidate)
    }

    /// Enrich every candidate in order, pausing between them.
    pub async fn enrich_all(
        &self,
        candidates: Vec<CandidateRecord>,
        progress: &dyn StageProgress,
    ) -> (Vec<EnrichedRecord>, EnrichStats) {
        let total = candidates.len();
        let mut stats = EnrichStats::default();
        let mut out = Vec::with_capacity(total);

        progress.phase("Fetching READMEs");
        for (i, candidate) in candidates.into_iter().enumerate() {
            progress.task_progress(i + 1, total, &candidate.name);

            let enriched = self.enrich(candidate).await;
            if enriched.has_readme {
                stats.with_readme += 1;
            } else {
                stats.without_readme += 1;
            }
            out.push(enriched);

            if i + 1 < total && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        info!(
            with_readme = stats.with_readme,
            without_readme = stats.without_readme,
            "README enrichment complete"
        );
        (out, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use trendbrief_shared::{Result, SilentStageProgress, TrendBriefError};

    /// Serves documents from a map keyed by `owner/repo/filename`; keys
    /// mapped to `Err` simulate a failing request.
    #[derive(Default)]
    struct MapFetcher {
        docs: HashMap<String, std::result::Result<String, String>>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl MapFetcher {
        fn with(mut self, key: &str, doc: std::result::Result<&str, &str>) -> Self {
            self.docs.insert(
                key.to_string(),
                doc.map(String::from).map_err(String::from),
            );
            self
        }
    }

    #[async_trait]
    impl DocumentFetcher for MapFetcher {
        async fn fetch_document(
            &self,
            owner: &str,
            repo: &str,
            _branch: Option<&str>,
            filename: &str,
        ) -> Result<Option<String>> {
            let key = format!("{owner}/{repo}/{filename}");
            self.calls.lock().unwrap().push(key.clone());
            match self.docs.get(&key) {
                Some(Ok(text)) => Ok(Some(text.clone())),
                Some(Err(e)) => Err(TrendBriefError::Network(e.clone())),
                None => Ok(None),
            }
        }
    }

    fn enricher(fetcher: MapFetcher, max_chars: usize) -> DetailEnricher {
        DetailEnricher::new(Box::new(fetcher), max_chars, Duration::ZERO)
    }

    #[tokio::test]
    async fn first_name_that_answers_wins() {
        let fetcher = MapFetcher::default()
            .with("a/b/Readme.md", Ok("second name"))
            .with("a/b/README", Ok("fourth name"));
        let e = enricher(fetcher, 8000);

        let record = e.enrich(CandidateRecord::new("a/b")).await;
        assert!(record.has_readme);
        assert_eq!(record.readme, "second name");
    }

    #[tokio::test]
    async fn failures_move_on_to_next_name() {
        let fetcher = MapFetcher::default()
            .with("a/b/README.md", Err("HTTP 502"))
            .with("a/b/readme.md", Ok("lowercase"));
        let e = enricher(fetcher, 8000);

        let record = e.enrich(CandidateRecord::new("a/b")).await;
        assert_eq!(record.readme, "lowercase");
    }

    #[tokio::test]
    async fn all_misses_yield_empty_document() {
        let e = enricher(MapFetcher::default(), 8000);
        let record = e.enrich(CandidateRecord::new("a/b")).await;
        assert!(!record.has_readme);
        assert!(record.readme.is_empty());
        assert_eq!(record.candidate.name, "a/b");
    }

    #[tokio::test]
    async fn tries_every_name_in_order() {
        let fetcher = MapFetcher::default();
        let calls = fetcher.calls.clone();
        let e = enricher(fetcher, 8000);
        e.enrich(CandidateRecord::new("x/y")).await;

        let calls = calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                "x/y/README.md",
                "x/y/Readme.md",
                "x/y/readme.md",
                "x/y/README",
                "x/y/README.txt"
            ]
        );
    }

    #[tokio::test]
    async fn long_readme_is_cut_on_characters() {
        let long = "文".repeat(9000);
        let fetcher = MapFetcher::default().with("a/b/README.md", Ok(long.as_str()));
        let e = enricher(fetcher, 8000);

        let record = e.enrich(CandidateRecord::new("a/b")).await;
        assert_eq!(record.readme.chars().count(), 8000);
    }

    #[tokio::test]
    async fn malformed_identifier_is_not_looked_up() {
        let e = enricher(MapFetcher::default().with("x/README.md", Ok("nope")), 8000);
        let record = e.enrich(CandidateRecord::new("justaname")).await;
        assert!(!record.has_readme);
    }

    #[tokio::test]
    async fn enrich_all_counts_hits_and_misses() {
        let fetcher = MapFetcher::default()
            .with("a/one/README.md", Ok("doc"))
            .with("c/three/README.txt", Ok("txt doc"));
        let e = enricher(fetcher, 8000);

        let candidates = vec![
            CandidateRecord::new("a/one"),
            CandidateRecord::new("b/two"),
            CandidateRecord::new("c/three"),
        ];
        let (records, stats) = e.enrich_all(candidates, &SilentStageProgress).await;

        assert_eq!(records.len(), 3);
        assert_eq!(records[1].candidate.name, "b/two");
        assert_eq!(
            stats,
            EnrichStats {
                with_readme: 2,
                without_readme: 1
            }
        );
    }
}
