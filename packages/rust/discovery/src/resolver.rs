//! Ordered fallback across discovery strategies.

use std::collections::HashSet;

use tracing::{info, instrument, warn};
use trendbrief_shared::{CandidateRecord, DiscoveryFilters, Result, TrendBriefError};

use crate::{
    GithubSearchSource, GithubTrendingPageSource, OssInsightSource, SourceOptions, TrendingSource,
};

/// Outcome of a successful resolution.
#[derive(Debug, Clone)]
pub struct Resolved {
    /// Name of the strategy that answered.
    pub source: String,
    /// At most `limit` records with unique identifiers, in the source's order.
    pub records: Vec<CandidateRecord>,
}

/// Holds strategies in priority order; the first non-empty answer wins.
pub struct TrendingResolver {
    sources: Vec<Box<dyn TrendingSource>>,
}

impl TrendingResolver {
    /// Create a resolver over explicit strategies (highest priority first).
    pub fn new(sources: Vec<Box<dyn TrendingSource>>) -> Self {
        Self { sources }
    }

    /// Create a resolver with all built-in strategies:
    /// OSS Insight, then the GitHub trending page, then GitHub search.
    pub fn with_defaults(opts: &SourceOptions) -> Result<Self> {
        Ok(Self::new(vec![
            Box::new(OssInsightSource::new(opts)?),
            Box::new(GithubTrendingPageSource::new(opts)?),
            Box::new(GithubSearchSource::new(opts)?),
        ]))
    }

    /// Strategies in the order they are tried.
    pub fn sources(&self) -> impl Iterator<Item = &dyn TrendingSource> {
        self.sources.iter().map(|s| s.as_ref())
    }

    /// Try each strategy once, in order, until one yields records.
    ///
    /// Fails with [`TrendBriefError::SourceExhausted`] when none does.
    #[instrument(skip_all, fields(limit = limit, sources = self.sources.len()))]
    pub async fn resolve(&self, limit: usize, filters: &DiscoveryFilters) -> Result<Resolved> {
        let mut attempts = Vec::new();

        for source in &self.sources {
            let name = source.name().to_string();
            match source.fetch(limit, filters).await {
                Ok(records) => {
                    let records = unique_by_name(records, limit);
                    if records.is_empty() {
                        warn!(source = %name, "source returned no usable records, trying next");
                        attempts.push((name, "empty result".to_string()));
                        continue;
                    }
                    info!(source = %name, count = records.len(), "trending repositories resolved");
                    return Ok(Resolved {
                        source: name,
                        records,
                    });
                }
                Err(e) => {
                    warn!(source = %name, error = %e, "discovery source failed, trying next");
                    attempts.push((name, e.to_string()));
                }
            }
        }

        Err(TrendBriefError::SourceExhausted { attempts })
    }

    /// Ask every strategy once, independently and without fallback.
    pub async fn probe(
        &self,
        limit: usize,
        filters: &DiscoveryFilters,
    ) -> Vec<(String, Result<Vec<CandidateRecord>>)> {
        let mut results = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let outcome = source
                .fetch(limit, filters)
                .await
                .map(|records| unique_by_name(records, limit));
            results.push((source.name().to_string(), outcome));
        }
        results
    }
}

/// Drop repeated or blank identifiers (first occurrence wins), then cap at `limit`.
fn unique_by_name(records: Vec<CandidateRecord>, limit: usize) -> Vec<CandidateRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| !r.name.trim().is_empty())
        .filter(|r| seen.insert(r.name.clone()))
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted strategy that records how often it was called.
    struct Scripted {
        name: &'static str,
        outcome: std::result::Result<Vec<CandidateRecord>, String>,
        calls: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn ok(name: &'static str, names: &[&str]) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let records = names.iter().map(|n| CandidateRecord::new(*n)).collect();
            (
                Self {
                    name,
                    outcome: Ok(records),
                    calls: calls.clone(),
                },
                calls,
            )
        }

        fn failing(name: &'static str) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    name,
                    outcome: Err("connection refused".into()),
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl TrendingSource for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch(
            &self,
            _limit: usize,
            _filters: &DiscoveryFilters,
        ) -> Result<Vec<CandidateRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome
                .clone()
                .map_err(TrendBriefError::Network)
        }
    }

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("owner/repo-{i}")).collect()
    }

    #[tokio::test]
    async fn first_failure_falls_through_to_second_and_third_is_never_called() {
        let eight = names(8);
        let eight_refs: Vec<&str> = eight.iter().map(String::as_str).collect();

        let (first, first_calls) = Scripted::failing("one");
        let (second, second_calls) = Scripted::ok("two", &eight_refs);
        let (third, third_calls) = Scripted::ok("three", &["x/y"]);

        let resolver =
            TrendingResolver::new(vec![Box::new(first), Box::new(second), Box::new(third)]);
        let resolved = resolver
            .resolve(10, &DiscoveryFilters::default())
            .await
            .expect("resolve");

        assert_eq!(resolved.source, "two");
        assert_eq!(resolved.records.len(), 8);
        assert_eq!(resolved.records[0].name, "owner/repo-0");
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
        assert_eq!(third_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_result_counts_as_failure() {
        let (empty, _) = Scripted::ok("empty", &[]);
        let (good, _) = Scripted::ok("good", &["a/b"]);
        let resolver = TrendingResolver::new(vec![Box::new(empty), Box::new(good)]);

        let resolved = resolver
            .resolve(5, &DiscoveryFilters::default())
            .await
            .expect("resolve");
        assert_eq!(resolved.source, "good");
    }

    #[tokio::test]
    async fn all_failing_is_source_exhausted() {
        let (a, _) = Scripted::failing("a");
        let (b, _) = Scripted::ok("b", &[]);
        let resolver = TrendingResolver::new(vec![Box::new(a), Box::new(b)]);

        let err = resolver
            .resolve(5, &DiscoveryFilters::default())
            .await
            .unwrap_err();
        match err {
            TrendBriefError::SourceExhausted { attempts } => {
                assert_eq!(attempts.len(), 2);
                assert_eq!(attempts[0].0, "a");
                assert!(attempts[0].1.contains("connection refused"));
                assert_eq!(attempts[1].1, "empty result");
            }
            other => panic!("expected SourceExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn result_is_capped_and_unique() {
        let (src, _) = Scripted::ok("dupes", &["a/a", "b/b", "a/a", "c/c", "d/d", "e/e"]);
        let resolver = TrendingResolver::new(vec![Box::new(src)]);

        let resolved = resolver
            .resolve(4, &DiscoveryFilters::default())
            .await
            .expect("resolve");
        let got: Vec<&str> = resolved.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(got, vec!["a/a", "b/b", "c/c", "d/d"]);

        let unique: HashSet<&str> = got.iter().copied().collect();
        assert_eq!(unique.len(), got.len());
    }

    #[tokio::test]
    async fn probe_asks_every_source() {
        let (a, a_calls) = Scripted::failing("a");
        let (b, b_calls) = Scripted::ok("b", &["x/y", "x/y", "z/w"]);
        let (c, c_calls) = Scripted::ok("c", &["q/r"]);
        let resolver = TrendingResolver::new(vec![Box::new(a), Box::new(b), Box::new(c)]);

        let results = resolver.probe(10, &DiscoveryFilters::default()).await;

        assert_eq!(results.len(), 3);
        assert!(results[0].1.is_err());
        assert_eq!(results[1].1.as_ref().map(Vec::len).ok(), Some(2));
        assert_eq!(results[2].0, "c");
        for calls in [a_calls, b_calls, c_calls] {
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn default_resolver_order() {
        let resolver = TrendingResolver::with_defaults(&SourceOptions::default())
            .expect("resolver");
        let order: Vec<&str> = resolver.sources().map(|s| s.name()).collect();
        assert_eq!(order, vec!["ossinsight", "github-trending", "github-search"]);
    }
}
