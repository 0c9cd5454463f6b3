//! Meeting header and race block extraction common to every meeting page.

use anyhow::{bail, Result};
use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use url::Url;

use super::text::{
    cell_text, clean_race_title, collapse_whitespace, extract_distance, extract_grade,
    extract_track, race_number_from_title,
};
use super::selector;
use crate::scraper::state_from_url;

/// Meeting-level metadata
#[derive(Debug, Clone, PartialEq)]
pub struct MeetingHeader {
    pub date: NaiveDate,
    pub venue: String,
    pub location: String,
    pub club_name: String,
    pub state: Option<String>,
    pub source_url: String,
}

impl MeetingHeader {
    /// Fails when the meeting date or venue cannot be read; nothing on the
    /// page is usable without them.
    pub fn parse(document: &Html, url: &Url) -> Result<Self> {
        static DATE: OnceLock<Selector> = OnceLock::new();
        static VENUE: OnceLock<Selector> = OnceLock::new();
        static HEADING: OnceLock<Selector> = OnceLock::new();

        let date_text = document
            .select(selector(&DATE, ".race-venue-date"))
            .next()
            .map(|e| cell_text(&e))
            .unwrap_or_default();
        let Some(date) = parse_meeting_date(&date_text) else {
            bail!("unparseable meeting date {:?}", date_text);
        };

        let venue_text = document
            .select(selector(&VENUE, ".race-venue h2"))
            .next()
            .map(|e| cell_text(&e))
            .unwrap_or_default();
        let (venue, location) = split_venue_header(&venue_text);
        if venue.is_empty() {
            bail!("missing venue heading");
        }

        let club_name = document
            .select(selector(&HEADING, "h1"))
            .map(|e| cell_text(&e))
            .find(|t| !t.is_empty())
            .unwrap_or_else(|| venue.clone());

        Ok(Self {
            date,
            venue,
            location,
            club_name,
            state: state_from_url(url),
            source_url: url.to_string(),
        })
    }
}

/// "Thursday, 16 October 2025" (weekday optional) as a calendar date
pub fn parse_meeting_date(text: &str) -> Option<NaiveDate> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(\d{1,2})\s+([A-Za-z]+)\s+(\d{4})").expect("static regex is valid")
    });

    let caps = re.captures(text)?;
    let normalized = format!("{} {} {}", &caps[1], &caps[2], &caps[3]);
    NaiveDate::parse_from_str(&normalized, "%d %B %Y").ok()
}

/// "Ascot, Perth: Thursday Races" → ("Ascot", "Perth")
pub fn split_venue_header(text: &str) -> (String, String) {
    let head = text.split(": ").next().unwrap_or("");
    let (venue, location) = match head.split_once(',') {
        Some((venue, location)) => (venue, location),
        None => (head, ""),
    };
    (
        collapse_whitespace(venue),
        collapse_whitespace(location).trim_end_matches(':').to_string(),
    )
}

/// Heading and summary facts of one race
#[derive(Debug, Clone, PartialEq)]
pub struct RaceDetails {
    pub race_number: u32,
    pub title: String,
    pub grade: Option<String>,
    pub track_type: String,
    pub track_condition: String,
    pub distance: Option<u32>,
}

impl RaceDetails {
    /// `index` is the block's position on the page; the race number falls
    /// back to it when the heading has none.
    pub fn parse(index: usize, raw_title: &str, summary_html: &str) -> Self {
        let (track_type, track_condition) = extract_track(summary_html);
        Self {
            race_number: race_number_from_title(raw_title).unwrap_or(index as u32 + 1),
            title: clean_race_title(raw_title),
            grade: extract_grade(summary_html),
            track_type,
            track_condition,
            distance: extract_distance(raw_title),
        }
    }
}

/// One race's heading table paired with its runner table
pub struct RaceBlock<'a> {
    pub details: RaceDetails,
    pub strip: ElementRef<'a>,
}

/// Pair every `table.race-title` with the `table.race-strip-fields` at the
/// same index. Unpaired headings are reported back by number.
pub fn race_blocks(document: &Html) -> (Vec<RaceBlock<'_>>, Vec<u32>) {
    static TITLE_TABLE: OnceLock<Selector> = OnceLock::new();
    static STRIP_TABLE: OnceLock<Selector> = OnceLock::new();
    static TITLE_SPAN: OnceLock<Selector> = OnceLock::new();
    static TITLE_TH: OnceLock<Selector> = OnceLock::new();

    let strips: Vec<ElementRef> = document
        .select(selector(&STRIP_TABLE, "table.race-strip-fields"))
        .collect();

    let mut blocks = Vec::new();
    let mut unmatched = Vec::new();

    for (index, table) in document
        .select(selector(&TITLE_TABLE, "table.race-title"))
        .enumerate()
    {
        let raw_title = table
            .select(selector(&TITLE_SPAN, "th span:first-child"))
            .next()
            .or_else(|| table.select(selector(&TITLE_TH, "th")).next())
            .map(|e| cell_text(&e))
            .unwrap_or_default();

        let details = RaceDetails::parse(index, &raw_title, &table.inner_html());
        match strips.get(index) {
            Some(strip) => blocks.push(RaceBlock {
                details,
                strip: *strip,
            }),
            None => unmatched.push(details.race_number),
        }
    }

    (blocks, unmatched)
}

/// Runner rows of a strip table, each flagged scratched or not
pub fn runner_rows<'a>(strip: &ElementRef<'a>) -> Vec<(ElementRef<'a>, bool)> {
    static ROW: OnceLock<Selector> = OnceLock::new();
    strip
        .select(selector(&ROW, "tr.EvenRow, tr.OddRow"))
        .map(|row| {
            let scratched = row.value().classes().any(|c| c == "Scratched");
            (row, scratched)
        })
        .collect()
}

/// First element under `row` matching one of `selectors`, as text
pub fn find_text(row: &ElementRef, selectors: &[&Selector]) -> Option<String> {
    selectors
        .iter()
        .find_map(|sel| row.select(sel).next())
        .map(|e| cell_text(&e))
}
