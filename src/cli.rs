//! CLI commands for jockey-form.
//!
//! Each stage can run on its own (`crawl`, `derive`, `classify`) or in
//! sequence with `run`. Stages that write to the data directory hold the
//! run lock for their whole duration.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::classify::classify_all;
use crate::config::AppConfig;
use crate::pipeline::{crawl, resolve_seeds, CrawlOutcome};
use crate::scraper::{CrawlLimits, CrawlMode};
use crate::stats::derive_all;
use crate::storage::{slugify, DataLayout, JockeyStore, RunLock, SummaryStore, VenueStore};
use crate::types::JockeyRecord;

#[derive(Parser)]
#[command(name = "jockey-form")]
#[command(version, about = "Racing results crawler and jockey form statistics", long_about = None)]
pub struct Cli {
    /// Config file (defaults to ./config.toml when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Remove a stale run lock before starting
    #[arg(long, global = true)]
    pub force: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Crawl results or upcoming fields into the data directory
    Crawl {
        /// Which meeting pages to collect
        #[arg(short, long, value_enum, default_value_t = CrawlMode::Results)]
        mode: CrawlMode,

        /// Start URL (repeatable); overrides crawler.seeds
        #[arg(long = "seed", value_name = "URL")]
        seeds: Vec<String>,

        /// Page budget override
        #[arg(long)]
        max_pages: Option<usize>,

        /// Append rides even when the same ride is already stored
        #[arg(long)]
        no_dedup: bool,
    },

    /// Recompute derived stats for every stored jockey
    Derive,

    /// Build hot-form and due-for-win lists
    Classify {
        /// Only this date (YYYY-MM-DD); every date with cards otherwise
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Crawl results and upcoming fields, then derive and classify
    Run {
        /// Page budget override for each crawl
        #[arg(long)]
        max_pages: Option<usize>,

        #[arg(long)]
        no_dedup: bool,
    },

    /// Show a stored jockey record
    Jockey {
        /// Jockey name or slug
        name: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
}

/// Stores for one run, built from the configured data directory
struct Stores {
    layout: DataLayout,
    jockeys: JockeyStore,
    venues: VenueStore,
    summaries: SummaryStore,
}

impl Stores {
    fn open(config: &AppConfig, no_dedup: bool) -> Self {
        let layout = DataLayout::new(&config.storage.data_dir);
        let dedup = config.storage.dedup && !no_dedup;
        Self {
            jockeys: JockeyStore::new(layout.jockeys_dir(), dedup),
            venues: VenueStore::new(layout.races_dir()),
            summaries: SummaryStore::new(layout.processed_dir()),
            layout,
        }
    }

    fn lock(&self, force: bool) -> Result<RunLock> {
        let lock = RunLock::acquire(self.layout.lock_path(), force)
            .context("Could not take the pipeline run lock (use --force to clear a stale one)")?;
        debug!("Holding {}", lock.path().display());
        Ok(lock)
    }
}

fn crawl_limits(config: &AppConfig, max_pages: Option<usize>) -> CrawlLimits {
    let mut limits = CrawlLimits::from_config(&config.crawler);
    if let Some(max_pages) = max_pages {
        limits.max_pages = max_pages;
    }
    limits
}

async fn crawl_stage(
    config: &AppConfig,
    stores: &Stores,
    mode: CrawlMode,
    seeds: &[String],
    max_pages: Option<usize>,
) -> Result<CrawlOutcome> {
    let seeds = resolve_seeds(mode, seeds, &config.crawler.seeds)?;
    let limits = crawl_limits(config, max_pages);
    crawl(config, mode, limits, &seeds, &stores.jockeys, &stores.venues).await
}

fn derive_stage(config: &AppConfig, stores: &Stores) -> Result<()> {
    let today = config.today()?;
    let report = derive_all(
        &stores.jockeys,
        &stores.summaries,
        today,
        &config.stats,
        &config.classification,
    )
    .context("Derive pass failed")?;
    info!(
        "Derive complete as of {}: {} processed, {} failed",
        today, report.processed, report.failed
    );
    Ok(())
}

fn classify_stage(config: &AppConfig, stores: &Stores, date: Option<NaiveDate>) -> Result<()> {
    let dates = date.map(|d| vec![d]);
    let report = classify_all(
        &stores.jockeys,
        &stores.venues,
        &stores.summaries,
        &config.classification,
        dates.as_deref(),
    )
    .context("Classification pass failed")?;
    info!(
        "Classified {} dates: {} hot form, {} due for a win ({} / {} globally)",
        report.dates,
        report.hot_form,
        report.due_for_win,
        report.global_hot_form,
        report.global_due_for_win
    );
    Ok(())
}

/// Run a single crawl.
pub async fn run_crawl(
    config: &AppConfig,
    force: bool,
    mode: CrawlMode,
    seeds: Vec<String>,
    max_pages: Option<usize>,
    no_dedup: bool,
) -> Result<()> {
    let stores = Stores::open(config, no_dedup);
    let _lock = stores.lock(force)?;

    let outcome = crawl_stage(config, &stores, mode, &seeds, max_pages).await?;
    match mode {
        CrawlMode::Results => info!(
            "{} meetings, {} rides ({} new jockeys, {} added, {} updated, {} failed)",
            outcome.results.meetings,
            outcome.results.entries,
            outcome.results.jockeys_created,
            outcome.results.appended,
            outcome.results.replaced,
            outcome.results.failed
        ),
        CrawlMode::Upcoming => info!("{} meeting cards saved", outcome.venues_saved),
    }
    Ok(())
}

pub fn run_derive(config: &AppConfig, force: bool) -> Result<()> {
    let stores = Stores::open(config, false);
    let _lock = stores.lock(force)?;
    derive_stage(config, &stores)
}

pub fn run_classify(config: &AppConfig, force: bool, date: Option<NaiveDate>) -> Result<()> {
    let stores = Stores::open(config, false);
    let _lock = stores.lock(force)?;
    classify_stage(config, &stores, date)
}

/// Every stage in order under one lock: results, upcoming, derive, classify.
pub async fn run_all(
    config: &AppConfig,
    force: bool,
    max_pages: Option<usize>,
    no_dedup: bool,
) -> Result<()> {
    let stores = Stores::open(config, no_dedup);
    let _lock = stores.lock(force)?;

    // Configured seeds apply to the results crawl only
    let results = crawl_stage(config, &stores, CrawlMode::Results, &[], max_pages).await?;
    info!("Results crawl: {} rides ingested", results.results.entries);

    let upcoming_seeds = CrawlMode::Upcoming.default_seeds();
    let upcoming =
        crawl_stage(config, &stores, CrawlMode::Upcoming, &upcoming_seeds, max_pages).await?;
    info!("Upcoming crawl: {} meeting cards saved", upcoming.venues_saved);

    derive_stage(config, &stores)?;
    classify_stage(config, &stores, None)
}

/// Print a stored jockey record.
pub fn run_jockey(config: &AppConfig, name: &str, format: OutputFormat) -> Result<()> {
    let stores = Stores::open(config, false);
    let slug = slugify(name);
    if slug.is_empty() {
        bail!("{:?} does not name a jockey", name);
    }

    let record = stores
        .jockeys
        .load(&slug)?
        .with_context(|| format!("No jockey file for {} ({})", name, slug))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
        OutputFormat::Table => print_table(&slug, &record),
    }
    Ok(())
}

/// Print a jockey record in table format.
fn print_table(slug: &str, record: &JockeyRecord) {
    println!("Jockey: {} ({})", record.name, slug);
    if !record.rank.is_empty() {
        println!("Rank: {}", record.rank);
    }
    println!();

    if let Some(d) = &record.derived {
        println!("=== Form ===");
        println!("  Rides:    {:>5}", d.total_rides);
        println!("  Wins:     {:>5}  ({:.0}%)", d.total_wins, d.win_rate * 100.0);
        println!("  Places:   {:>5}  ({:.0}%)", d.total_places, d.place_rate * 100.0);
        match d.days_since_last_win {
            Some(days) => println!("  Last win: {:>5} days ago", days),
            None => println!("  Last win:  none"),
        }
        println!("  Form:     {:>5}", d.recent_form);
        println!(
            "  Streak:   {:?} x{}",
            d.current_streak.kind, d.current_streak.count
        );
        println!();
    }

    let mut rides: Vec<_> = record.stats.iter().collect();
    rides.sort_by(|a, b| {
        b.race_date
            .cmp(&a.race_date)
            .then_with(|| b.race_number.cmp(&a.race_number))
    });

    println!("=== Recent Rides ===");
    for ride in rides.iter().take(10) {
        let position = ride
            .finishing_position
            .map(|p| format!("{}/{}", p, ride.field_size))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {}  {:<14} R{:<2} {:<24} {:>6}  {}",
            ride.race_date,
            ride.race_venue,
            ride.race_number.map(|n| n.to_string()).unwrap_or_default(),
            ride.horse,
            position,
            ride.sp_string.as_deref().unwrap_or("")
        );
    }
}
