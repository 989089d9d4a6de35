//! Error types for trendbrief.
//!
//! Library crates use [`TrendBriefError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Only [`TrendBriefError::SourceExhausted`] and [`TrendBriefError::ConfigMissing`]
//! are meant to abort a run. Every other failure is absorbed by the stage that
//! hit it and shows up as a count in the run report instead.

use std::path::PathBuf;

/// Top-level error type for all trendbrief operations.
#[derive(Debug, thiserror::Error)]
pub enum TrendBriefError {
    /// Every discovery strategy failed or came back empty.
    #[error("all discovery sources failed: {}", format_attempts(.attempts))]
    SourceExhausted {
        /// `(source name, failure)` for each strategy tried, in order.
        attempts: Vec<(String, String)>,
    },

    /// A credential or identifier required by an integration is absent.
    #[error("missing configuration: {what}")]
    ConfigMissing { what: String },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error talking to an external service.
    #[error("network error: {0}")]
    Network(String),

    /// Response body could not be interpreted.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Structured store rejected a query or write.
    #[error("store error: {0}")]
    Store(String),

    /// Generative-text call failed.
    #[error("generation error: {0}")]
    Generation(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TrendBriefError>;

impl TrendBriefError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a missing-configuration error naming what is absent.
    pub fn config_missing(what: impl Into<String>) -> Self {
        Self::ConfigMissing { what: what.into() }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error should abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::SourceExhausted { .. } | Self::ConfigMissing { .. }
        )
    }
}

fn format_attempts(attempts: &[(String, String)]) -> String {
    if attempts.is_empty() {
        return "no sources configured".into();
    }
    attempts
        .iter()
        .map(|(source, err)| format!("{source}: {err}"))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = TrendBriefError::config("bad period");
        assert_eq!(err.to_string(), "config error: bad period");

        let err = TrendBriefError::config_missing("NOTION_DATABASE_ID");
        assert_eq!(
            err.to_string(),
            "missing configuration: NOTION_DATABASE_ID"
        );
    }

    #[test]
    fn source_exhausted_lists_every_attempt() {
        let err = TrendBriefError::SourceExhausted {
            attempts: vec![
                ("ossinsight".into(), "HTTP 503".into()),
                ("github-search".into(), "empty result".into()),
            ],
        };
        let text = err.to_string();
        assert!(text.contains("ossinsight: HTTP 503"));
        assert!(text.contains("github-search: empty result"));
    }

    #[test]
    fn only_exhaustion_and_missing_config_are_fatal() {
        assert!(TrendBriefError::SourceExhausted { attempts: vec![] }.is_fatal());
        assert!(TrendBriefError::config_missing("x").is_fatal());
        assert!(!TrendBriefError::Network("timeout".into()).is_fatal());
        assert!(!TrendBriefError::Store("409".into()).is_fatal());
    }
}
