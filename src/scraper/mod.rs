//! Web scraper module for racingaustralia.horse
//!
//! Provides page fetching, link-following crawl, and HTML parsing.

pub mod client;
pub mod crawler;
pub mod parsers;
pub mod rate_limiter;

pub use client::{HttpFetcher, PageSource, ScraperError};
pub use crawler::{CrawlLimits, CrawlMode, CrawlReport, Crawler, FetchedPage, PageHandler};
pub use rate_limiter::RateLimiter;

use url::Url;

/// Base URL for racingaustralia.horse
pub const BASE_URL: &str = "https://racingaustralia.horse";

/// State and territory codes as they appear in meeting keys
pub const STATES: [&str; 8] = ["VIC", "NSW", "QLD", "SA", "WA", "TAS", "NT", "ACT"];

/// Build results calendar URL for a state
pub fn calendar_results_url(state: &str) -> String {
    format!("{}/FreeFields/Calendar_Results.aspx?State={}", BASE_URL, state)
}

/// Home page, which links to every upcoming meeting's form and results
pub fn home_url() -> String {
    format!("{}/", BASE_URL)
}

/// What a URL points at, judged from the last path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Results,
    Acceptances,
    Form,
    Calendar,
    Other,
}

impl PageKind {
    pub fn of(url: &Url) -> Self {
        let file = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or("")
            .to_ascii_lowercase();

        match file.as_str() {
            "results.aspx" => PageKind::Results,
            "acceptances.aspx" => PageKind::Acceptances,
            "form.aspx" => PageKind::Form,
            f if f.starts_with("calendar") && f.ends_with(".aspx") => PageKind::Calendar,
            _ => PageKind::Other,
        }
    }

    /// Pages that carry a meeting's race cards
    pub fn is_meeting(self) -> bool {
        matches!(self, PageKind::Results | PageKind::Acceptances | PageKind::Form)
    }
}

/// Point a form or results link at the same meeting's acceptances page.
/// Other URLs are returned unchanged.
pub fn rewrite_to_acceptances(url: &Url) -> Url {
    if !matches!(PageKind::of(url), PageKind::Form | PageKind::Results) {
        return url.clone();
    }

    let mut rewritten = url.clone();
    if let Ok(mut segments) = rewritten.path_segments_mut() {
        segments.pop().push("Acceptances.aspx");
    }
    rewritten
}

/// State code carried as a standalone token in the query string,
/// e.g. `Key=2025Oct16,WA,Ascot`.
pub fn state_from_url(url: &Url) -> Option<String> {
    url.query_pairs().find_map(|(_, value)| {
        value
            .split(|c: char| !c.is_ascii_alphanumeric())
            .find_map(|token| STATES.iter().find(|s| token.eq_ignore_ascii_case(s)))
            .map(|s| s.to_string())
    })
}

/// Barrier trial meetings are not races and never counted.
pub fn is_trial(url: &Url) -> bool {
    url.query_pairs()
        .any(|(_, value)| value.to_ascii_lowercase().contains("trial"))
}
