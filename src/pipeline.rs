//! Crawl stage: page handlers that feed parsed meetings into the stores.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::AppConfig;
use crate::scraper::parsers::{AcceptancesParser, ResultsParser};
use crate::scraper::{
    CrawlLimits, CrawlMode, CrawlReport, Crawler, FetchedPage, HttpFetcher, PageHandler, PageSource,
};
use crate::storage::{slugify, JockeyStore, VenueStore};
use crate::types::{JockeyIdentity, RaceEntry};

/// Totals from results ingestion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestCounts {
    pub meetings: usize,
    pub entries: usize,
    pub jockeys_created: usize,
    pub appended: usize,
    pub replaced: usize,
    pub failed: usize,
}

/// Merges every starter on a results page into its jockey's file.
pub struct ResultsIngest<'a> {
    store: &'a JockeyStore,
    pub counts: IngestCounts,
}

impl<'a> ResultsIngest<'a> {
    pub fn new(store: &'a JockeyStore) -> Self {
        Self {
            store,
            counts: IngestCounts::default(),
        }
    }
}

impl PageHandler for ResultsIngest<'_> {
    fn handle_page(&mut self, page: &FetchedPage) -> Result<()> {
        let meeting = ResultsParser::parse(&page.html, &page.url)
            .with_context(|| format!("Failed to parse results page {}", page.url))?;
        let venue = meeting.header.venue.clone();
        let date = meeting.header.date;

        // One read-modify-write per jockey per page
        let mut by_jockey: BTreeMap<String, (JockeyIdentity, Vec<RaceEntry>)> = BTreeMap::new();
        for (identity, entry) in meeting.into_entries() {
            self.counts.entries += 1;
            let slot = by_jockey
                .entry(slugify(&identity.name))
                .or_insert_with(|| (identity.clone(), Vec::new()));
            slot.0.is_female |= identity.is_female;
            slot.0.is_apprentice |= identity.is_apprentice;
            slot.1.push(entry);
        }

        for (slug, (identity, entries)) in by_jockey {
            match self.store.upsert_race_entries(&identity, entries) {
                Ok(summary) => {
                    if summary.created {
                        debug!("New jockey {}", slug);
                        self.counts.jockeys_created += 1;
                    }
                    self.counts.appended += summary.appended;
                    self.counts.replaced += summary.replaced;
                }
                Err(e) => {
                    warn!("{} {}: could not update {}: {}", venue, date, identity.name, e);
                    self.counts.failed += 1;
                }
            }
        }

        self.counts.meetings += 1;
        info!("Ingested results for {} {}", venue, date);
        Ok(())
    }
}

/// Writes each acceptances page as the venue's card for that date.
pub struct UpcomingIngest<'a> {
    store: &'a VenueStore,
    pub saved: usize,
}

impl<'a> UpcomingIngest<'a> {
    pub fn new(store: &'a VenueStore) -> Self {
        Self { store, saved: 0 }
    }
}

impl PageHandler for UpcomingIngest<'_> {
    fn handle_page(&mut self, page: &FetchedPage) -> Result<()> {
        let meeting = AcceptancesParser::parse(&page.html, &page.url)
            .with_context(|| format!("Failed to parse acceptances page {}", page.url))?;
        let path = self.store.save(&meeting)?;

        self.saved += 1;
        info!(
            "Saved {} races for {} {} to {}",
            meeting.races.len(),
            meeting.venue_info.name,
            meeting.venue_info.date,
            path.display()
        );
        Ok(())
    }
}

/// Seeds from the command line, else config, else the mode's defaults.
pub fn resolve_seeds(mode: CrawlMode, cli_seeds: &[String], config_seeds: &[String]) -> Result<Vec<Url>> {
    let raw = if !cli_seeds.is_empty() {
        cli_seeds.to_vec()
    } else if !config_seeds.is_empty() {
        config_seeds.to_vec()
    } else {
        mode.default_seeds()
    };

    raw.iter()
        .map(|s| Url::parse(s).with_context(|| format!("Invalid seed URL: {}", s)))
        .collect()
}

/// Outcome of one crawl stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlOutcome {
    pub report: CrawlReport,
    pub results: IngestCounts,
    pub venues_saved: usize,
}

/// Crawl from `seeds` with `source`, routing pages to the mode's handler.
pub async fn crawl_with<S: PageSource>(
    source: S,
    mode: CrawlMode,
    limits: CrawlLimits,
    seeds: &[Url],
    jockeys: &JockeyStore,
    venues: &VenueStore,
) -> CrawlOutcome {
    let crawler = Crawler::new(source, mode, limits);
    let mut outcome = CrawlOutcome::default();

    match mode {
        CrawlMode::Results => {
            let mut handler = ResultsIngest::new(jockeys);
            outcome.report = crawler.run(seeds, &mut handler).await;
            outcome.results = handler.counts;
        }
        CrawlMode::Upcoming => {
            let mut handler = UpcomingIngest::new(venues);
            outcome.report = crawler.run(seeds, &mut handler).await;
            outcome.venues_saved = handler.saved;
        }
    }

    info!(
        "Crawl finished: {} fetched, {} failed, {} handled, {} handler errors",
        outcome.report.fetched,
        outcome.report.failed,
        outcome.report.handled,
        outcome.report.handler_errors
    );
    outcome
}

/// Crawl the live site with the configured HTTP client.
pub async fn crawl(
    config: &AppConfig,
    mode: CrawlMode,
    limits: CrawlLimits,
    seeds: &[Url],
    jockeys: &JockeyStore,
    venues: &VenueStore,
) -> Result<CrawlOutcome> {
    let fetcher = HttpFetcher::new(&config.crawler).context("Failed to build HTTP client")?;
    info!(
        "Crawling {:?} from {} seeds (dedup {})",
        mode,
        seeds.len(),
        if jockeys.dedup() { "on" } else { "off" }
    );
    Ok(crawl_with(fetcher, mode, limits, seeds, jockeys, venues).await)
}
