//! Built-in discovery strategies.

mod github_search;
mod github_trending;
mod ossinsight;

pub use github_search::GithubSearchSource;
pub use github_trending::GithubTrendingPageSource;
pub use ossinsight::OssInsightSource;
