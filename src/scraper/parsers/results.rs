//! Results page parser.

use anyhow::Result;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use tracing::warn;
use url::Url;

use super::meeting::{find_text, race_blocks, runner_rows, MeetingHeader, RaceDetails};
use super::selector;
use super::text::{
    cell_text, infer_female, parse_barrier, parse_starting_price, parse_weight, split_jockey_cell,
};
use crate::types::{JockeyIdentity, RaceEntry};

/// A finished meeting
#[derive(Debug, Clone, PartialEq)]
pub struct ResultsMeeting {
    pub header: MeetingHeader,
    pub races: Vec<RaceResult>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RaceResult {
    pub details: RaceDetails,
    /// Runners that started, in finishing order
    pub runners: Vec<ResultRow>,
    pub field_size: u32,
    pub original_field_size: u32,
    pub scratched: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub position: u32,
    pub horse: String,
    pub jockey: JockeyIdentity,
    pub trainer: Option<String>,
    pub barrier: u32,
    /// Carried weight: listed weight less the claim
    pub weight: Option<f64>,
    pub claimed_weight: Option<f64>,
    pub sp_value: Option<f64>,
    pub sp_string: Option<String>,
    pub margin: Option<String>,
}

/// Parser for results pages
pub struct ResultsParser;

impl ResultsParser {
    /// Parse a results page. Fails only when the meeting header is unusable;
    /// bad rows and unpaired race blocks are skipped with a warning.
    pub fn parse(html: &str, url: &Url) -> Result<ResultsMeeting> {
        let document = Html::parse_document(html);
        let header = MeetingHeader::parse(&document, url)?;

        let (blocks, unmatched) = race_blocks(&document);
        for race_number in unmatched {
            warn!(
                "{} {}: race {} has no runner table, skipped",
                header.venue, header.date, race_number
            );
        }

        let races = blocks
            .into_iter()
            .map(|block| Self::parse_race(&header, block.details, &block.strip))
            .collect();

        Ok(ResultsMeeting { header, races })
    }

    fn parse_race(header: &MeetingHeader, details: RaceDetails, strip: &ElementRef) -> RaceResult {
        let rows = runner_rows(strip);
        let scratched = rows.iter().filter(|(_, scratched)| *scratched).count() as u32;
        let original_field_size = rows.len() as u32;
        let field_size = original_field_size - scratched;

        let mut runners = Vec::new();
        let starters = rows.iter().filter(|(_, scratched)| !*scratched).map(|(row, _)| row);
        for (index, row) in starters.enumerate() {
            let position = index as u32 + 1;
            match Self::parse_row(row, position) {
                Some(runner) => runners.push(runner),
                None => warn!(
                    "{} {} race {}: row {} missing jockey or barrier, skipped",
                    header.venue, header.date, details.race_number, position
                ),
            }
        }

        RaceResult {
            details,
            runners,
            field_size,
            original_field_size,
            scratched,
        }
    }

    fn parse_row(row: &ElementRef, position: u32) -> Option<ResultRow> {
        static TD: OnceLock<Selector> = OnceLock::new();
        static HORSE: OnceLock<Selector> = OnceLock::new();
        static TRAINER: OnceLock<Selector> = OnceLock::new();
        static JOCKEY: OnceLock<Selector> = OnceLock::new();
        static CLAIM_MARKER: OnceLock<Selector> = OnceLock::new();

        let cells: Vec<ElementRef> = row.select(selector(&TD, "td")).collect();
        let nth = |n: usize| cells.get(n - 1).map(cell_text).filter(|t| !t.is_empty());

        let jockey_cell = row.select(selector(&JOCKEY, "td.jockey")).next()?;
        let jockey = split_jockey_cell(&cell_text(&jockey_cell));
        if jockey.name.is_empty() {
            return None;
        }
        let barrier = nth(8).as_deref().and_then(parse_barrier)?;

        let has_marker = jockey_cell
            .select(selector(&CLAIM_MARKER, ".apprentice-claim"))
            .next()
            .is_some();
        let listed_weight = nth(9).as_deref().and_then(parse_weight);
        let weight = listed_weight.map(|w| w - jockey.claim.unwrap_or(0.0));
        let (sp_value, sp_string) = cells
            .last()
            .map(|c| parse_starting_price(&cell_text(c)))
            .unwrap_or((None, None));

        Some(ResultRow {
            position,
            horse: find_text(row, &[selector(&HORSE, "td.horse")]).unwrap_or_default(),
            jockey: JockeyIdentity {
                is_female: infer_female(&jockey.name),
                is_apprentice: has_marker || jockey.claim.is_some(),
                name: jockey.name,
            },
            trainer: find_text(row, &[selector(&TRAINER, "td.trainer")]).filter(|t| !t.is_empty()),
            barrier,
            weight,
            claimed_weight: jockey.claim,
            sp_value,
            sp_string,
            margin: nth(7),
        })
    }
}

impl ResultsMeeting {
    /// One (jockey, ride) pair per starter, ready for the jockey store
    pub fn into_entries(self) -> Vec<(JockeyIdentity, RaceEntry)> {
        let header = self.header;
        let mut entries = Vec::new();

        for race in self.races {
            for runner in race.runners {
                let entry = RaceEntry {
                    race_date: header.date,
                    race_title: race.details.title.clone(),
                    race_venue: header.venue.clone(),
                    race_state: header.state.clone(),
                    race_number: Some(race.details.race_number),
                    race_grade: race.details.grade.clone(),
                    distance: race.details.distance,
                    horse: runner.horse,
                    trainer_name: runner.trainer,
                    sp_value: runner.sp_value,
                    sp_string: runner.sp_string,
                    weight: runner.weight,
                    claimed_weight: runner.claimed_weight,
                    finishing_position: Some(runner.position),
                    barrier: Some(runner.barrier),
                    field_size: race.field_size,
                    track_type: race.details.track_type.clone(),
                    track_condition: race.details.track_condition.clone(),
                    original_field_size: race.original_field_size,
                    scratched_horses: race.scratched,
                };
                entries.push((runner.jockey, entry));
            }
        }

        entries
    }
}
