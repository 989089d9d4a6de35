//! Content generation and pipeline orchestration for trendbrief.
//!
//! This crate ties discovery, README enrichment, marketing copy generation,
//! and persistence into one run ([`Pipeline::run`]) and summarizes it in a
//! [`RunReport`].

pub mod fallback;
pub mod generation;
pub mod pipeline;
pub mod prompt;
pub mod report;

pub use generation::{ContentGenerator, GenerationStats, OpenAiChatGenerator, TextGenerator};
pub use pipeline::{Pipeline, ProgressReporter, RunSettings, SilentProgress};
pub use report::{PersistenceOutcome, RunReport};
