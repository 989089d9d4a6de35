//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use trendbrief_core::{Pipeline, ProgressReporter, RunReport};
use trendbrief_discovery::{SourceOptions, TrendingResolver};
use trendbrief_shared::{
    AppConfig, Credentials, DiscoveryFilters, PipelineConfig, TrendPeriod, init_config,
    load_config, load_config_from,
};
use trendbrief_store::NotionStore;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// trendbrief: trending repositories, summarized and recorded.
#[derive(Parser)]
#[command(
    name = "trendbrief",
    version,
    about = "Discover trending GitHub repositories, write marketing copy, and record them in Notion.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.trendbrief/trendbrief.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the full pipeline once.
    Run {
        /// How many trending repositories to request.
        #[arg(long)]
        fetch_count: Option<usize>,

        /// How many new repositories to process.
        #[arg(long)]
        process_count: Option<usize>,

        /// Language filter ("All" for none).
        #[arg(long)]
        language: Option<String>,

        /// Trending window: past_24_hours, past_week, or past_month.
        #[arg(long)]
        period: Option<String>,

        /// Skip dedup and persistence.
        #[arg(long)]
        dry_run: bool,
    },

    /// Ask every discovery source independently and report what each returns.
    Probe {
        /// Repositories to request from each source.
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Record store management.
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Store subcommands.
#[derive(Subcommand)]
pub(crate) enum StoreAction {
    /// Create a Notion database with the expected properties.
    Init {
        /// Id of the Notion page the database is created under.
        #[arg(long)]
        parent_page: String,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "trendbrief=info",
        1 => "trendbrief=debug",
        _ => "trendbrief=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Run {
            fetch_count,
            process_count,
            language,
            period,
            dry_run,
        } => {
            let overrides = RunOverrides {
                fetch_count,
                process_count,
                language,
                period,
                dry_run,
            };
            cmd_run(config_path.as_deref(), overrides).await
        }
        Command::Probe { limit } => cmd_probe(config_path.as_deref(), limit).await,
        Command::Store { action } => match action {
            StoreAction::Init { parent_page } => {
                cmd_store_init(config_path.as_deref(), &parent_page).await
            }
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path.as_deref()).await,
        },
    }
}

fn load(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    })
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

/// Flags that override config file values for one run.
struct RunOverrides {
    fetch_count: Option<usize>,
    process_count: Option<usize>,
    language: Option<String>,
    period: Option<String>,
    dry_run: bool,
}

impl RunOverrides {
    fn apply(self, config: &mut AppConfig) -> Result<()> {
        if let Some(n) = self.fetch_count {
            config.discovery.fetch_count = n;
        }
        if let Some(n) = self.process_count {
            config.pipeline.process_count = n;
        }
        if let Some(language) = self.language {
            config.discovery.language = language;
        }
        if let Some(period) = self.period {
            config.discovery.period = period.parse::<TrendPeriod>().map_err(|e| eyre!(e))?;
        }
        Ok(())
    }
}

async fn cmd_run(config_path: Option<&Path>, overrides: RunOverrides) -> Result<()> {
    let mut config = load(config_path)?;
    let dry_run = overrides.dry_run;
    overrides.apply(&mut config)?;

    let credentials = Credentials::from_env(&config);
    let mut pipeline_config = PipelineConfig::new(&config, credentials);
    pipeline_config.dry_run = dry_run;

    info!(
        fetch_count = pipeline_config.fetch_count,
        process_count = pipeline_config.process_count,
        language = pipeline_config.filters.language.as_deref().unwrap_or("All"),
        period = %pipeline_config.filters.period,
        dry_run,
        "starting run"
    );

    let pipeline = Pipeline::from_config(&pipeline_config)?;
    let reporter = CliProgress::new();
    let report = pipeline.run(&reporter).await?;

    print_processed(&report);
    println!();
    println!("{}", "=".repeat(60));
    println!("{report}");
    println!();

    Ok(())
}

/// Print the processed repositories, one block each.
fn print_processed(report: &RunReport) {
    if report.processed.is_empty() {
        println!("No new repositories to process.");
        return;
    }

    println!("Trending repositories:");
    for (i, record) in report.processed.iter().enumerate() {
        let c = record.candidate();
        let m = &record.marketing;
        println!();
        println!("{}. {}", i + 1, c.name);
        println!("   一句话简介: {}", m.one_liner);
        println!("   ⭐ {} | 🍴 {} | 💬 {}", c.stars, c.forks, c.language);
        println!("   用户群体: {}", m.audience);
        println!("   标签: {}", m.tags);
        println!("   {}", c.url);
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn item(&self, current: usize, total: usize, detail: &str) {
        self.spinner
            .set_message(format!("[{current}/{total}] {detail}"));
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// probe
// ---------------------------------------------------------------------------

async fn cmd_probe(config_path: Option<&Path>, limit: usize) -> Result<()> {
    let config = load(config_path)?;
    let credentials = Credentials::from_env(&config);
    let opts = SourceOptions::new(
        Duration::from_secs(config.discovery.timeout_secs),
        credentials.github_token,
    );
    let filters = DiscoveryFilters::new(&config.discovery.language, config.discovery.period);
    let resolver = TrendingResolver::with_defaults(&opts)?;

    info!(limit, "probing discovery sources");

    for (name, outcome) in resolver.probe(limit, &filters).await {
        match outcome {
            Ok(records) if records.is_empty() => println!("{name:<16} empty"),
            Ok(records) => {
                println!("{name:<16} {} repositories", records.len());
                for r in records.iter().take(5) {
                    println!("    {} ({} stars)", r.name, r.stars);
                }
            }
            Err(e) => println!("{name:<16} failed: {e}"),
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// store / config
// ---------------------------------------------------------------------------

async fn cmd_store_init(config_path: Option<&Path>, parent_page: &str) -> Result<()> {
    let config = load(config_path)?;
    let credentials = Credentials::from_env(&config);
    let api_key = credentials
        .store_api_key
        .ok_or_else(|| eyre!("{} is not set", config.store.api_key_env))?;

    let store = NotionStore::new(api_key, String::new())?;
    let id = store.create_database(parent_page).await?;

    println!("Database created: {id}");
    println!("Set {}={id} to use it.", config.store.database_id_env);
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = load(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
