//! Shared types, error model, and configuration for trendbrief.
//!
//! This crate is the foundation depended on by all other trendbrief crates.
//! It provides:
//! - [`TrendBriefError`]: the unified error type
//! - Domain types ([`CandidateRecord`], [`EnrichedRecord`], [`MarketingContent`],
//!   [`ProcessedRecord`], [`PersistedRecord`])
//! - Configuration ([`AppConfig`], [`PipelineConfig`], [`Credentials`], config loading)

pub mod config;
pub mod error;
pub mod progress;
pub mod text;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, Credentials, DedupConfig, DiscoveryConfig, GenerationConfig, PipelineConfig,
    ReadmeConfig, RunLimitsConfig, StoreConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from,
};
pub use error::{Result, TrendBriefError};
pub use progress::{SilentStageProgress, StageProgress};
pub use text::{is_blank, truncate_chars};
pub use types::{
    CandidateRecord, ContentOrigin, DEFAULT_DESCRIPTION, DiscoveryFilters,
    EnrichedRecord, MarketingContent, PersistedRecord, ProcessedRecord, TrendPeriod,
    UNKNOWN_LANGUAGE,
};
