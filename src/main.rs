//! jockey-form
//!
//! Crawls racing results and fields, keeps per-jockey ride histories, and
//! writes form statistics and hot-form / due-for-win lists as JSON.

mod classify;
mod cli;
mod config;
mod pipeline;
mod retry;
mod scraper;
mod stats;
mod storage;
mod types;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = if cli.verbose {
        "jockey_form=debug"
    } else {
        "jockey_form=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load(cli.config.as_deref())?;
    tracing::debug!("Data directory: {}", config.storage.data_dir.display());

    match cli.command {
        Commands::Crawl {
            mode,
            seeds,
            max_pages,
            no_dedup,
        } => cli::run_crawl(&config, cli.force, mode, seeds, max_pages, no_dedup).await,
        Commands::Derive => cli::run_derive(&config, cli.force),
        Commands::Classify { date } => cli::run_classify(&config, cli.force, date),
        Commands::Run {
            max_pages,
            no_dedup,
        } => cli::run_all(&config, cli.force, max_pages, no_dedup).await,
        Commands::Jockey { name, format } => cli::run_jockey(&config, &name, format),
    }
}
