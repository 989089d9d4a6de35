//! README retrieval for discovered repositories.
//!
//! This crate provides:
//! - [`DocumentFetcher`]: one attempt to read a named file from a repository
//! - [`GithubContentsFetcher`]: the GitHub contents API implementation
//! - [`DetailEnricher`]: tries the conventional README names in order and
//!   attaches the first hit (or nothing) to each candidate

mod enricher;
mod github;

use async_trait::async_trait;
use trendbrief_shared::Result;

pub use enricher::{DetailEnricher, EnrichStats};
pub use github::GithubContentsFetcher;

/// File names tried, in order, when looking for a repository's README.
pub const README_NAMES: [&str; 5] = ["README.md", "Readme.md", "readme.md", "README", "README.txt"];

/// Reads a single file from a repository.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Fetch `filename` at `branch`, or at the repository's default branch
    /// when `branch` is `None`.
    ///
    /// `Ok(None)` means the file does not exist there. Errors are transport or
    /// server failures; callers treat both the same way and move on.
    async fn fetch_document(
        &self,
        owner: &str,
        repo: &str,
        branch: Option<&str>,
        filename: &str,
    ) -> Result<Option<String>>;
}
