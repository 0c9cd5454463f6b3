//! Link-following crawl over meeting calendars.
//!
//! Fetches run concurrently up to `concurrency`, but every fetched page is
//! handed to the [`PageHandler`] from the crawl loop itself, one at a time,
//! so persistence never sees two pages at once.

use clap::ValueEnum;
use futures::stream::{FuturesUnordered, StreamExt};
use scraper::{Html, Selector};
use std::collections::{HashSet, VecDeque};
use std::sync::OnceLock;
use tracing::{debug, info, warn};
use url::Url;

use super::{
    calendar_results_url, home_url, is_trial, rewrite_to_acceptances, PageKind, PageSource, STATES,
};
use crate::config::CrawlerConfig;

/// Which meeting pages a crawl collects
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CrawlMode {
    /// Finished meetings, fed to the jockey store
    Results,
    /// Upcoming fields, fed to the venue store
    Upcoming,
}

impl CrawlMode {
    pub fn default_seeds(self) -> Vec<String> {
        match self {
            CrawlMode::Results => STATES.iter().map(|s| calendar_results_url(s)).collect(),
            CrawlMode::Upcoming => vec![home_url()],
        }
    }

    /// The page kind this mode hands to the handler
    pub fn target(self) -> PageKind {
        match self {
            CrawlMode::Results => PageKind::Results,
            CrawlMode::Upcoming => PageKind::Acceptances,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CrawlLimits {
    pub concurrency: usize,
    pub max_pages: usize,
    pub max_depth: usize,
    pub follow_pagination: bool,
}

impl CrawlLimits {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            concurrency: config.concurrency.max(1),
            max_pages: config.max_pages,
            max_depth: config.max_depth,
            follow_pagination: config.follow_pagination,
        }
    }
}

/// A page as delivered to the handler
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: Url,
    pub kind: PageKind,
    pub html: String,
    pub depth: usize,
}

pub trait PageHandler {
    fn handle_page(&mut self, page: &FetchedPage) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub fetched: usize,
    pub failed: usize,
    pub handled: usize,
    pub handler_errors: usize,
}

pub struct Crawler<S> {
    source: S,
    mode: CrawlMode,
    limits: CrawlLimits,
}

impl<S: PageSource> Crawler<S> {
    pub fn new(source: S, mode: CrawlMode, limits: CrawlLimits) -> Self {
        Self {
            source,
            mode,
            limits,
        }
    }

    /// Crawl from `seeds` until the frontier is empty or the page budget is
    /// spent. Fetch failures and handler errors are logged, never fatal.
    pub async fn run<H: PageHandler>(&self, seeds: &[Url], handler: &mut H) -> CrawlReport {
        let mut report = CrawlReport::default();
        let hosts: HashSet<String> = seeds
            .iter()
            .filter_map(|u| u.host_str().map(str::to_string))
            .collect();

        let mut seen: HashSet<Url> = HashSet::new();
        let mut frontier: VecDeque<(Url, usize)> = VecDeque::new();
        for seed in seeds {
            let mut seed = seed.clone();
            seed.set_fragment(None);
            if seen.insert(seed.clone()) {
                frontier.push_back((seed, 0));
            }
        }

        let source = &self.source;
        let mut in_flight = FuturesUnordered::new();
        let mut scheduled = 0;

        loop {
            while in_flight.len() < self.limits.concurrency && scheduled < self.limits.max_pages {
                let Some((url, depth)) = frontier.pop_front() else {
                    break;
                };
                scheduled += 1;
                in_flight.push(async move {
                    let result = source.fetch(&url).await;
                    (url, depth, result)
                });
            }

            let Some((url, depth, result)) = in_flight.next().await else {
                break;
            };

            let html = match result {
                Ok(html) => html,
                Err(e) => {
                    warn!("Giving up on {}: {}", url, e);
                    report.failed += 1;
                    continue;
                }
            };
            report.fetched += 1;

            if depth < self.limits.max_depth {
                for link in self.discover_links(&url, &html, &hosts) {
                    if seen.insert(link.clone()) {
                        frontier.push_back((link, depth + 1));
                    }
                }
            }

            let kind = PageKind::of(&url);
            if kind != self.mode.target() {
                debug!("Visited {} ({:?})", url, kind);
                continue;
            }

            let page = FetchedPage {
                url,
                kind,
                html,
                depth,
            };
            report.handled += 1;
            if let Err(e) = handler.handle_page(&page) {
                warn!("Failed to process {}: {:#}", page.url, e);
                report.handler_errors += 1;
            }
        }

        if !frontier.is_empty() {
            info!(
                "Page budget of {} reached; {} queued pages not visited",
                self.limits.max_pages,
                frontier.len()
            );
        }

        report
    }

    /// Same-site links this mode wants to visit, in document order.
    pub fn discover_links(&self, base: &Url, html: &str, hosts: &HashSet<String>) -> Vec<Url> {
        static LINK_SELECTOR: OnceLock<Selector> = OnceLock::new();
        let selector = LINK_SELECTOR
            .get_or_init(|| Selector::parse("a[href]").expect("static link selector is valid"));

        let document = Html::parse_document(html);
        let mut links = Vec::new();
        let mut local_seen = HashSet::new();

        for href in document.select(selector).filter_map(|a| a.value().attr("href")) {
            let Ok(mut link) = base.join(href.trim()) else {
                continue;
            };
            link.set_fragment(None);

            if !matches!(link.scheme(), "http" | "https") {
                continue;
            }
            if !link.host_str().is_some_and(|h| hosts.contains(h)) {
                continue;
            }

            let Some(link) = self.follow(link) else {
                continue;
            };
            if local_seen.insert(link.clone()) {
                links.push(link);
            }
        }

        links
    }

    fn follow(&self, link: Url) -> Option<Url> {
        let kind = PageKind::of(&link);
        if kind == PageKind::Calendar {
            return self.limits.follow_pagination.then_some(link);
        }
        if kind.is_meeting() && is_trial(&link) {
            return None;
        }

        match (self.mode, kind) {
            (CrawlMode::Results, PageKind::Results) => Some(link),
            (CrawlMode::Upcoming, PageKind::Form | PageKind::Results) => {
                Some(rewrite_to_acceptances(&link))
            }
            (CrawlMode::Upcoming, PageKind::Acceptances) => Some(link),
            _ => None,
        }
    }
}
