//! Application configuration for trendbrief.
//!
//! User config lives at `~/.trendbrief/trendbrief.toml`.
//! CLI flags override config file values, which override defaults.
//!
//! The file only ever names environment variables for secrets. Those are read
//! once by [`Credentials::from_env`] and handed to the pipeline inside a
//! [`PipelineConfig`]; nothing below the CLI touches the process environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrendBriefError};
use crate::types::{DiscoveryFilters, TrendPeriod};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "trendbrief.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".trendbrief";

// ---------------------------------------------------------------------------
// Config structs (matching trendbrief.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    #[serde(default)]
    pub pipeline: RunLimitsConfig,

    #[serde(default)]
    pub dedup: DedupConfig,

    #[serde(default)]
    pub readme: ReadmeConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

/// `[discovery]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// How many trending repositories to request.
    #[serde(default = "default_fetch_count")]
    pub fetch_count: usize,

    /// Language filter; `"All"` disables it.
    #[serde(default = "default_language")]
    pub language: String,

    /// Trending window.
    #[serde(default)]
    pub period: TrendPeriod,

    /// Per-request timeout for discovery calls.
    #[serde(default = "default_discovery_timeout")]
    pub timeout_secs: u64,

    /// Env var holding an optional GitHub token (raises API rate limits).
    #[serde(default = "default_github_token_env")]
    pub github_token_env: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            fetch_count: default_fetch_count(),
            language: default_language(),
            period: TrendPeriod::default(),
            timeout_secs: default_discovery_timeout(),
            github_token_env: default_github_token_env(),
        }
    }
}

fn default_fetch_count() -> usize {
    100
}
fn default_language() -> String {
    "All".into()
}
fn default_discovery_timeout() -> u64 {
    10
}
fn default_github_token_env() -> String {
    "GITHUB_TOKEN".into()
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLimitsConfig {
    /// Maximum number of new repositories enriched per run.
    #[serde(default = "default_process_count")]
    pub process_count: usize,
}

impl Default for RunLimitsConfig {
    fn default() -> Self {
        Self {
            process_count: default_process_count(),
        }
    }
}

fn default_process_count() -> usize {
    20
}

/// `[dedup]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Trailing window, in days, of stored entries treated as already seen.
    #[serde(default = "default_window_days")]
    pub window_days: u32,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
        }
    }
}

fn default_window_days() -> u32 {
    30
}

/// `[readme]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadmeConfig {
    #[serde(default = "default_readme_timeout")]
    pub timeout_secs: u64,

    /// README text is cut to this many characters.
    #[serde(default = "default_readme_max_chars")]
    pub max_chars: usize,

    /// Pause between consecutive repositories.
    #[serde(default = "default_readme_delay")]
    pub delay_ms: u64,
}

impl Default for ReadmeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_readme_timeout(),
            max_chars: default_readme_max_chars(),
            delay_ms: default_readme_delay(),
        }
    }
}

fn default_readme_timeout() -> u64 {
    10
}
fn default_readme_max_chars() -> usize {
    8000
}
fn default_readme_delay() -> u64 {
    500
}

/// `[generation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_generation_key_env")]
    pub api_key_env: String,

    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Per-record budget; a slower call falls back to template content.
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,

    /// Pause between consecutive real generative calls.
    #[serde(default = "default_generation_delay")]
    pub delay_ms: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// How much README text goes into the prompt.
    #[serde(default = "default_prompt_readme_chars")]
    pub prompt_readme_chars: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_generation_key_env(),
            api_base: default_api_base(),
            model: default_model(),
            timeout_secs: default_generation_timeout(),
            delay_ms: default_generation_delay(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            prompt_readme_chars: default_prompt_readme_chars(),
        }
    }
}

fn default_generation_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_api_base() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_generation_timeout() -> u64 {
    300
}
fn default_generation_delay() -> u64 {
    1000
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    2000
}
fn default_prompt_readme_chars() -> usize {
    4000
}

/// `[store]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Env var holding the Notion integration token.
    #[serde(default = "default_store_key_env")]
    pub api_key_env: String,

    /// Env var holding the target database id.
    #[serde(default = "default_database_id_env")]
    pub database_id_env: String,

    /// Pause between consecutive writes.
    #[serde(default = "default_write_delay")]
    pub write_delay_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_store_key_env(),
            database_id_env: default_database_id_env(),
            write_delay_ms: default_write_delay(),
        }
    }
}

fn default_store_key_env() -> String {
    "NOTION_API_KEY".into()
}
fn default_database_id_env() -> String {
    "NOTION_DATABASE_ID".into()
}
fn default_write_delay() -> u64 {
    300
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Secrets resolved from the environment at the CLI edge.
#[derive(Clone, Default)]
pub struct Credentials {
    pub github_token: Option<String>,
    pub generation_api_key: Option<String>,
    pub store_api_key: Option<String>,
    pub store_database_id: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("github_token", &self.github_token.is_some())
            .field("generation_api_key", &self.generation_api_key.is_some())
            .field("store_api_key", &self.store_api_key.is_some())
            .field("store_database_id", &self.store_database_id)
            .finish()
    }
}

impl Credentials {
    /// Read every env var named in `config`. Empty values count as absent.
    pub fn from_env(config: &AppConfig) -> Self {
        Self::from_lookup(config, |name| std::env::var(name).ok())
    }

    /// Resolve credentials through an arbitrary lookup (used by tests).
    pub fn from_lookup(config: &AppConfig, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            github_token: get(&config.discovery.github_token_env),
            generation_api_key: get(&config.generation.api_key_env),
            store_api_key: get(&config.store.api_key_env),
            store_database_id: get(&config.store.database_id_env),
        }
    }

    /// Store credentials, or `ConfigMissing` naming what is absent.
    pub fn store(&self, config: &StoreConfig) -> Result<(String, String)> {
        match (&self.store_api_key, &self.store_database_id) {
            (Some(key), Some(db)) => Ok((key.clone(), db.clone())),
            (None, Some(_)) => Err(TrendBriefError::config_missing(&config.api_key_env)),
            (Some(_), None) => Err(TrendBriefError::config_missing(&config.database_id_env)),
            (None, None) => Err(TrendBriefError::config_missing(format!(
                "{} and {}",
                config.api_key_env, config.database_id_env
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline config (runtime, merged from config + CLI flags + credentials)
// ---------------------------------------------------------------------------

/// Runtime configuration handed to the pipeline entry point.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub fetch_count: usize,
    pub process_count: usize,
    pub filters: DiscoveryFilters,
    pub discovery_timeout: Duration,
    pub dedup_window_days: u32,
    pub readme_timeout: Duration,
    pub readme_max_chars: usize,
    pub readme_delay: Duration,
    pub generation_api_base: String,
    pub generation_model: String,
    pub generation_timeout: Duration,
    pub generation_delay: Duration,
    pub generation_temperature: f32,
    pub generation_max_tokens: u32,
    pub prompt_readme_chars: usize,
    pub write_delay: Duration,
    /// Skip dedup and persistence even when the store is configured.
    pub dry_run: bool,
    pub credentials: Credentials,
    /// Names used in `ConfigMissing` messages.
    pub store_env_names: StoreConfig,
}

impl PipelineConfig {
    /// Merge a loaded config file with resolved credentials.
    pub fn new(config: &AppConfig, credentials: Credentials) -> Self {
        Self {
            fetch_count: config.discovery.fetch_count,
            process_count: config.pipeline.process_count,
            filters: DiscoveryFilters::new(&config.discovery.language, config.discovery.period),
            discovery_timeout: Duration::from_secs(config.discovery.timeout_secs),
            dedup_window_days: config.dedup.window_days,
            readme_timeout: Duration::from_secs(config.readme.timeout_secs),
            readme_max_chars: config.readme.max_chars,
            readme_delay: Duration::from_millis(config.readme.delay_ms),
            generation_api_base: config.generation.api_base.clone(),
            generation_model: config.generation.model.clone(),
            generation_timeout: Duration::from_secs(config.generation.timeout_secs),
            generation_delay: Duration::from_millis(config.generation.delay_ms),
            generation_temperature: config.generation.temperature,
            generation_max_tokens: config.generation.max_tokens,
            prompt_readme_chars: config.generation.prompt_readme_chars,
            write_delay: Duration::from_millis(config.store.write_delay_ms),
            dry_run: false,
            credentials,
            store_env_names: config.store.clone(),
        }
    }

    /// Check ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.fetch_count == 0 {
            return Err(TrendBriefError::config("fetch_count must be at least 1"));
        }
        if self.process_count == 0 {
            return Err(TrendBriefError::config("process_count must be at least 1"));
        }
        let timeouts = [
            ("discovery", self.discovery_timeout),
            ("readme", self.readme_timeout),
            ("generation", self.generation_timeout),
        ];
        for (section, timeout) in timeouts {
            if timeout.is_zero() {
                return Err(TrendBriefError::config(format!(
                    "{section} timeout must be non-zero"
                )));
            }
        }
        Ok(())
    }

    /// Store credentials, unless this is a dry run.
    pub fn store_credentials(&self) -> Result<(String, String)> {
        if self.dry_run {
            return Err(TrendBriefError::config_missing("store disabled by --dry-run"));
        }
        self.credentials.store(&self.store_env_names)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new(&AppConfig::default(), Credentials::default())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.trendbrief/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| TrendBriefError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.trendbrief/trendbrief.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| TrendBriefError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        TrendBriefError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| TrendBriefError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| TrendBriefError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| TrendBriefError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("fetch_count"));
        assert!(toml_str.contains("NOTION_API_KEY"));
        assert!(toml_str.contains("past_24_hours"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.dedup.window_days, 30);
        assert_eq!(parsed.generation.timeout_secs, 300);
        assert_eq!(parsed.generation.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[discovery]
language = "Rust"
period = "past_week"

[pipeline]
process_count = 5
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.discovery.language, "Rust");
        assert_eq!(config.discovery.period, TrendPeriod::Week);
        assert_eq!(config.discovery.fetch_count, 100);
        assert_eq!(config.pipeline.process_count, 5);
        assert_eq!(config.readme.max_chars, 8000);
    }

    #[test]
    fn pipeline_config_from_app_config() {
        let pc = PipelineConfig::default();
        assert_eq!(pc.fetch_count, 100);
        assert_eq!(pc.process_count, 20);
        assert_eq!(pc.filters.language, None);
        assert_eq!(pc.generation_timeout, Duration::from_secs(300));
        assert_eq!(pc.readme_delay, Duration::from_millis(500));
        assert_eq!(pc.write_delay, Duration::from_millis(300));
        assert!(pc.validate().is_ok());
    }

    #[test]
    fn zero_counts_are_rejected() {
        let mut pc = PipelineConfig::default();
        pc.process_count = 0;
        assert!(pc.validate().is_err());
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        let mut config = AppConfig::default();
        config.discovery.timeout_secs = 0;
        let err = PipelineConfig::new(&config, Credentials::default())
            .validate()
            .unwrap_err();
        assert_eq!(err.to_string(), "config error: discovery timeout must be non-zero");

        let mut config = AppConfig::default();
        config.readme.timeout_secs = 0;
        let err = PipelineConfig::new(&config, Credentials::default())
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("readme timeout"));
    }

    #[test]
    fn credentials_ignore_blank_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("OPENAI_API_KEY", "sk-test"),
            ("NOTION_API_KEY", "  "),
            ("NOTION_DATABASE_ID", "db-1"),
        ]);
        let creds = Credentials::from_lookup(&AppConfig::default(), |name| {
            env.get(name).map(|v| v.to_string())
        });
        assert_eq!(creds.generation_api_key.as_deref(), Some("sk-test"));
        assert!(creds.store_api_key.is_none());
        assert!(creds.github_token.is_none());

        let err = creds.store(&StoreConfig::default()).unwrap_err();
        assert!(matches!(err, TrendBriefError::ConfigMissing { .. }));
        assert!(err.to_string().contains("NOTION_API_KEY"));
    }

    #[test]
    fn dry_run_disables_store() {
        let mut pc = PipelineConfig::new(
            &AppConfig::default(),
            Credentials {
                store_api_key: Some("k".into()),
                store_database_id: Some("d".into()),
                ..Default::default()
            },
        );
        assert!(pc.store_credentials().is_ok());
        pc.dry_run = true;
        assert!(pc.store_credentials().is_err());
    }

    #[test]
    fn credentials_debug_hides_secrets() {
        let creds = Credentials {
            generation_api_key: Some("sk-secret".into()),
            ..Default::default()
        };
        assert!(!format!("{creds:?}").contains("sk-secret"));
    }
}
