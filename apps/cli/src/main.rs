//! trendbrief CLI: daily trending-repository briefs.
//!
//! Discovers trending GitHub repositories, writes marketing copy for the ones
//! not yet recorded, and stores the results in a Notion database.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
