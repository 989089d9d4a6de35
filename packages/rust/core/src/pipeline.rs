//! End-to-end run: resolve → dedup → cap → README → copy → write.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tracing::{info, instrument, warn};

use trendbrief_discovery::{Resolved, SourceOptions, TrendingResolver};
use trendbrief_readme::{DetailEnricher, EnrichStats, GithubContentsFetcher};
use trendbrief_shared::{DiscoveryFilters, PipelineConfig, Result, StageProgress};
use trendbrief_store::{DedupFilter, DedupOutcome, NotionStore, RecordStore, Writer};

use crate::generation::{ContentGenerator, GenerationStats, OpenAiChatGenerator, TextGenerator};
use crate::report::{PersistenceOutcome, RunReport};

/// Reason used when no store was attached.
const NO_STORE: &str = "record store not configured";

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called for each record within a per-record phase.
    fn item(&self, current: usize, total: usize, detail: &str);
    /// Called when the pipeline completes.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn item(&self, _current: usize, _total: usize, _detail: &str) {}
    fn done(&self, _report: &RunReport) {}
}

/// Limits and pacing that belong to the run rather than to one stage.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub fetch_count: usize,
    pub process_count: usize,
    pub filters: DiscoveryFilters,
    pub dedup_window_days: u32,
    pub write_delay: Duration,
}

impl RunSettings {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            fetch_count: config.fetch_count,
            process_count: config.process_count,
            filters: config.filters.clone(),
            dedup_window_days: config.dedup_window_days,
            write_delay: config.write_delay,
        }
    }
}

/// The assembled stages of one run.
pub struct Pipeline {
    resolver: TrendingResolver,
    enricher: DetailEnricher,
    generator: ContentGenerator,
    store: Option<Arc<dyn RecordStore>>,
    /// Why `store` is `None`.
    store_missing: String,
    settings: RunSettings,
}

impl Pipeline {
    /// Assemble from explicit stages. No store is attached.
    pub fn new(
        resolver: TrendingResolver,
        enricher: DetailEnricher,
        generator: ContentGenerator,
        settings: RunSettings,
    ) -> Self {
        Self {
            resolver,
            enricher,
            generator,
            store: None,
            store_missing: NO_STORE.to_string(),
            settings,
        }
    }

    /// Attach the store used for dedup and persistence.
    pub fn with_store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the production stages from configuration.
    ///
    /// Missing generation credentials mean template-only copy. Missing store
    /// credentials mean no dedup and no persistence; the run still proceeds.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;

        let token = config.credentials.github_token.clone();
        let resolver = TrendingResolver::with_defaults(&SourceOptions::new(
            config.discovery_timeout,
            token.clone(),
        ))?;

        let fetcher = GithubContentsFetcher::new(config.readme_timeout, token)?;
        let enricher = DetailEnricher::new(
            Box::new(fetcher),
            config.readme_max_chars,
            config.readme_delay,
        );

        let text_generator: Option<Box<dyn TextGenerator>> =
            match &config.credentials.generation_api_key {
                Some(key) => Some(Box::new(OpenAiChatGenerator::new(
                    key.clone(),
                    &config.generation_api_base,
                    config.generation_model.clone(),
                    config.generation_temperature,
                    config.generation_max_tokens,
                )?)),
                None => {
                    warn!("no generation API key, marketing copy will use templates");
                    None
                }
            };
        let generator = ContentGenerator::new(
            text_generator,
            config.generation_timeout,
            config.generation_delay,
            config.prompt_readme_chars,
        );

        let mut pipeline = Self::new(resolver, enricher, generator, RunSettings::from_config(config));
        match config.store_credentials() {
            Ok((api_key, database_id)) => {
                let store: Arc<dyn RecordStore> = Arc::new(NotionStore::new(api_key, database_id)?);
                pipeline = pipeline.with_store(store);
            }
            Err(e) => {
                warn!(reason = %e, "store unavailable, dedup and persistence will be skipped");
                pipeline.store_missing = e.to_string();
            }
        }

        Ok(pipeline)
    }

    /// Run dated today (local time).
    pub async fn run(&self, progress: &dyn ProgressReporter) -> Result<RunReport> {
        self.run_on(chrono::Local::now().date_naive(), progress).await
    }

    /// Run with `today` as the dedup reference and the persisted date.
    ///
    /// Only a total discovery failure is returned as an error.
    #[instrument(skip_all, fields(today = %today, fetch_count = self.settings.fetch_count))]
    pub async fn run_on(
        &self,
        today: NaiveDate,
        progress: &dyn ProgressReporter,
    ) -> Result<RunReport> {
        let start = Instant::now();
        let stage = StageAdapter { inner: progress };

        // --- Phase 1: Discovery ---
        progress.phase("Resolving trending repositories");
        let Resolved { source, records } = self
            .resolver
            .resolve(self.settings.fetch_count, &self.settings.filters)
            .await?;
        let fetched = records.len();

        // --- Phase 2: Dedup ---
        let (fresh, dedup) = match &self.store {
            Some(store) => {
                progress.phase("Filtering recorded repositories");
                DedupFilter::new(Arc::clone(store), self.settings.dedup_window_days)
                    .filter(records, today)
                    .await
            }
            None => (
                records,
                DedupOutcome::Skipped {
                    reason: self.store_missing.clone(),
                },
            ),
        };

        // --- Phase 3: Cap ---
        let mut selected = fresh;
        if selected.len() > self.settings.process_count {
            selected.truncate(self.settings.process_count);
        } else {
            info!(
                available = selected.len(),
                cap = self.settings.process_count,
                "fewer new repositories than the cap, processing all"
            );
        }
        let selected_count = selected.len();

        let (processed, readme, generation, persistence) = if selected.is_empty() {
            info!("every trending repository is already recorded");
            (
                Vec::new(),
                EnrichStats::default(),
                GenerationStats::default(),
                PersistenceOutcome::Skipped {
                    reason: "no new repositories".into(),
                },
            )
        } else {
            // --- Phase 4: README ---
            let (enriched, readme) = self.enricher.enrich_all(selected, &stage).await;

            // --- Phase 5: Copy ---
            let (processed, generation) = self.generator.generate_all(enriched, &stage).await;

            // --- Phase 6: Persist ---
            let persistence = match Writer::new(self.store.clone(), self.settings.write_delay) {
                Ok(writer) => {
                    PersistenceOutcome::Written(writer.write(&processed, today, &stage).await)
                }
                Err(e) => {
                    warn!(error = %e, "skipping persistence");
                    PersistenceOutcome::Skipped {
                        reason: self.store_missing.clone(),
                    }
                }
            };

            (processed, readme, generation, persistence)
        };

        let report = RunReport {
            fetched,
            source,
            dedup,
            selected: selected_count,
            readme,
            generation,
            persistence,
            elapsed: start.elapsed(),
            processed,
        };

        progress.done(&report);

        info!(
            fetched = report.fetched,
            selected = report.selected,
            persisted = report.persisted(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "run complete"
        );

        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Stage progress adapter
// ---------------------------------------------------------------------------

/// Adapts a `ProgressReporter` to the `StageProgress` interface.
struct StageAdapter<'a> {
    inner: &'a dyn ProgressReporter,
}

impl StageProgress for StageAdapter<'_> {
    fn phase(&self, name: &str) {
        self.inner.phase(name);
    }

    fn task_progress(&self, current: usize, total: usize, detail: &str) {
        self.inner.item(current, total, detail);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Days;
    use std::sync::Mutex;
    use trendbrief_discovery::TrendingSource;
    use trendbrief_readme::DocumentFetcher;
    use trendbrief_shared::{CandidateRecord, ContentOrigin, PersistedRecord, TrendBriefError};
    use trendbrief_store::MemoryStore;

    struct Fixed {
        name: &'static str,
        records: Option<Vec<CandidateRecord>>,
    }

    #[async_trait]
    impl TrendingSource for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch(
            &self,
            limit: usize,
            _filters: &DiscoveryFilters,
        ) -> Result<Vec<CandidateRecord>> {
            match &self.records {
                Some(r) => Ok(r.iter().take(limit).cloned().collect()),
                None => Err(TrendBriefError::Network("HTTP 503".into())),
            }
        }
    }

    /// Every repository has a README.md.
    struct AlwaysReadme;

    #[async_trait]
    impl DocumentFetcher for AlwaysReadme {
        async fn fetch_document(
            &self,
            owner: &str,
            repo: &str,
            _branch: Option<&str>,
            filename: &str,
        ) -> Result<Option<String>> {
            Ok((filename == "README.md").then(|| format!("# {owner}/{repo}")))
        }
    }

    /// Records phases and the final report.
    #[derive(Default)]
    struct Recording {
        phases: Mutex<Vec<String>>,
        done: Mutex<Option<usize>>,
    }

    impl ProgressReporter for Recording {
        fn phase(&self, name: &str) {
            self.phases.lock().unwrap().push(name.to_string());
        }
        fn item(&self, _current: usize, _total: usize, _detail: &str) {}
        fn done(&self, report: &RunReport) {
            *self.done.lock().unwrap() = Some(report.selected);
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).expect("date")
    }

    fn candidate(i: usize) -> CandidateRecord {
        let mut c = CandidateRecord::new(format!("owner/repo-{i}"));
        c.description = format!("Repository number {i}");
        c.language = "Rust".into();
        c.stars = 1000 - i as u64;
        c
    }

    fn stored(name: &str) -> PersistedRecord {
        PersistedRecord {
            name: name.into(),
            date: today() - Days::new(2),
            one_liner: "x".into(),
            value: "x".into(),
            audience: "x".into(),
            url: format!("https://github.com/{name}"),
            tags: vec!["x".into()],
            xiaohongshu: "x".into(),
            wechat: "x".into(),
        }
    }

    fn pipeline(sources: Vec<Fixed>, process_count: usize) -> Pipeline {
        let sources: Vec<Box<dyn TrendingSource>> = sources
            .into_iter()
            .map(|s| Box::new(s) as Box<dyn TrendingSource>)
            .collect();
        Pipeline::new(
            TrendingResolver::new(sources),
            DetailEnricher::new(Box::new(AlwaysReadme), 8000, Duration::ZERO),
            ContentGenerator::new(None, Duration::from_secs(1), Duration::ZERO, 4000),
            RunSettings {
                fetch_count: 100,
                process_count,
                filters: DiscoveryFilters::default(),
                dedup_window_days: 30,
                write_delay: Duration::ZERO,
            },
        )
    }

    #[tokio::test]
    async fn dedups_caps_and_writes_in_order() {
        // 10 stored entries, 5 of them among the 25 trending candidates.
        let mut entries: Vec<PersistedRecord> =
            (0..5).map(|i| stored(&format!("owner/repo-{}", i * 2))).collect();
        entries.extend((0..5).map(|i| stored(&format!("elsewhere/old-{i}"))));
        let store = Arc::new(MemoryStore::new().with_page_size(4).with_entries(entries));
        let store_dyn: Arc<dyn RecordStore> = store.clone();

        let p = pipeline(
            vec![
                Fixed {
                    name: "broken",
                    records: None,
                },
                Fixed {
                    name: "working",
                    records: Some((0..25).map(candidate).collect()),
                },
            ],
            10,
        )
        .with_store(store_dyn);

        let progress = Recording::default();
        let report = p.run_on(today(), &progress).await.expect("run");

        assert_eq!(report.fetched, 25);
        assert_eq!(report.source, "working");
        assert_eq!(
            report.dedup,
            DedupOutcome::Filtered {
                known: 10,
                removed: 5
            }
        );
        assert_eq!(report.selected, 10);
        assert_eq!(report.readme.with_readme, 10);
        assert_eq!(report.generation.fallback, 10);

        let expected: Vec<String> = [1, 3, 5, 7, 9, 10, 11, 12, 13, 14]
            .iter()
            .map(|i| format!("owner/repo-{i}"))
            .collect();
        let processed: Vec<String> = report.processed.iter().map(|r| r.name().to_string()).collect();
        assert_eq!(processed, expected);
        assert!(report.processed.iter().all(|r| r.origin == ContentOrigin::Fallback));

        match &report.persistence {
            PersistenceOutcome::Written(w) => {
                assert_eq!((w.succeeded, w.failed, w.skipped), (10, 0, 0));
            }
            other => panic!("expected writes, got {other:?}"),
        }
        let written: Vec<PersistedRecord> = store.entries().into_iter().skip(10).collect();
        assert_eq!(written.len(), 10);
        assert!(written.iter().all(|e| e.date == today()));
        assert_eq!(written[0].name, "owner/repo-1");

        assert_eq!(*progress.done.lock().unwrap(), Some(10));
        let phases = progress.phases.lock().unwrap().clone();
        assert_eq!(phases.first().map(String::as_str), Some("Resolving trending repositories"));
        assert!(phases.iter().any(|p| p == "Writing records"));
    }

    #[tokio::test]
    async fn without_store_the_run_still_completes() {
        let p = pipeline(
            vec![Fixed {
                name: "only",
                records: Some((0..4).map(candidate).collect()),
            }],
            20,
        );

        let report = p.run_on(today(), &SilentProgress).await.expect("run");

        assert_eq!(report.selected, 4);
        assert!(matches!(report.dedup, DedupOutcome::Skipped { .. }));
        assert_eq!(
            report.persistence,
            PersistenceOutcome::Skipped {
                reason: NO_STORE.to_string()
            }
        );
        assert_eq!(report.processed.len(), 4);
    }

    #[tokio::test]
    async fn failing_store_query_does_not_block_the_run() {
        let store: Arc<dyn RecordStore> = Arc::new(
            MemoryStore::new()
                .with_entries(vec![stored("owner/repo-0")])
                .failing_queries(),
        );
        let p = pipeline(
            vec![Fixed {
                name: "only",
                records: Some((0..3).map(candidate).collect()),
            }],
            20,
        )
        .with_store(store);

        let report = p.run_on(today(), &SilentProgress).await.expect("run");
        assert!(matches!(report.dedup, DedupOutcome::Degraded { .. }));
        assert_eq!(report.selected, 3);
        assert_eq!(report.persisted(), 3);
    }

    #[tokio::test]
    async fn nothing_new_skips_later_stages() {
        let store: Arc<dyn RecordStore> = Arc::new(
            MemoryStore::new().with_entries(vec![stored("owner/repo-0"), stored("owner/repo-1")]),
        );
        let p = pipeline(
            vec![Fixed {
                name: "only",
                records: Some((0..2).map(candidate).collect()),
            }],
            20,
        )
        .with_store(store);

        let report = p.run_on(today(), &SilentProgress).await.expect("run");
        assert_eq!(report.selected, 0);
        assert_eq!(report.readme, EnrichStats::default());
        assert!(matches!(report.persistence, PersistenceOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn exhausted_sources_abort_the_run() {
        let p = pipeline(
            vec![
                Fixed {
                    name: "a",
                    records: None,
                },
                Fixed {
                    name: "b",
                    records: Some(Vec::new()),
                },
            ],
            20,
        );

        let err = p.run_on(today(), &SilentProgress).await.expect_err("should fail");
        assert!(matches!(err, TrendBriefError::SourceExhausted { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn from_config_without_credentials_builds() {
        let p = Pipeline::from_config(&PipelineConfig::default()).expect("pipeline");
        assert!(p.store.is_none());
        assert!(!p.generator.is_configured());
        assert!(p.store_missing.contains("NOTION_API_KEY"));
    }
}
