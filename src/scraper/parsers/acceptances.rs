//! Acceptances (upcoming fields) page parser.

use anyhow::Result;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use tracing::warn;
use url::Url;

use super::meeting::{find_text, race_blocks, runner_rows, MeetingHeader};
use super::selector;
use super::text::{parse_barrier, parse_weight, split_jockey_cell};
use crate::types::{RaceCard, Runner, VenueInfo, VenueMeeting};

/// Parser for acceptances pages
pub struct AcceptancesParser;

impl AcceptancesParser {
    /// Parse an acceptances page into the meeting card stored per venue.
    pub fn parse(html: &str, url: &Url) -> Result<VenueMeeting> {
        let document = Html::parse_document(html);
        let header = MeetingHeader::parse(&document, url)?;

        let (blocks, unmatched) = race_blocks(&document);
        for race_number in unmatched {
            warn!(
                "{} {}: race {} has no runner table, skipped",
                header.venue, header.date, race_number
            );
        }

        let mut races = Vec::with_capacity(blocks.len());
        for block in blocks {
            let rows = runner_rows(&block.strip);
            let scratched = rows.iter().filter(|(_, scratched)| *scratched).count() as u32;

            let mut runners = Vec::new();
            for (row, _) in rows.iter().filter(|(_, scratched)| !*scratched) {
                match Self::parse_row(row) {
                    Some(runner) => runners.push(runner),
                    None => warn!(
                        "{} {} race {}: runner without jockey skipped",
                        header.venue, header.date, block.details.race_number
                    ),
                }
            }

            races.push(RaceCard {
                title: block.details.title,
                race_number: Some(block.details.race_number),
                grade: block.details.grade,
                track_type: block.details.track_type,
                track_condition: block.details.track_condition,
                distance: block.details.distance,
                original_field_size: rows.len() as u32,
                scratched,
                runners,
            });
        }

        Ok(VenueMeeting {
            venue_info: VenueInfo {
                name: header.venue,
                location: header.location,
                club_name: header.club_name,
                state: header.state,
                date: header.date,
                source_url: header.source_url,
            },
            races,
        })
    }

    fn parse_row(row: &ElementRef) -> Option<Runner> {
        static HORSE_LINK: OnceLock<Selector> = OnceLock::new();
        static HORSE: OnceLock<Selector> = OnceLock::new();
        static JOCKEY: OnceLock<Selector> = OnceLock::new();
        static TRAINER: OnceLock<Selector> = OnceLock::new();
        static BARRIER: OnceLock<Selector> = OnceLock::new();
        static WEIGHT: OnceLock<Selector> = OnceLock::new();

        let jockey = split_jockey_cell(&find_text(row, &[selector(&JOCKEY, "td.jockey")])?);
        if jockey.name.is_empty() {
            return None;
        }

        let horse = find_text(
            row,
            &[
                selector(&HORSE_LINK, "td.horse a"),
                selector(&HORSE, "td.horse"),
            ],
        )
        .unwrap_or_default();

        Some(Runner {
            horse,
            jockey: jockey.name,
            trainer: find_text(row, &[selector(&TRAINER, "td.trainer")]).filter(|t| !t.is_empty()),
            barrier: find_text(row, &[selector(&BARRIER, "td.barrier")])
                .as_deref()
                .and_then(parse_barrier),
            weight: find_text(row, &[selector(&WEIGHT, "td.weight")])
                .as_deref()
                .and_then(parse_weight),
            claimed_weight: jockey.claim,
            sp_value: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::parsers::fixtures;
    use chrono::NaiveDate;

    #[test]
    fn test_parse_acceptances() {
        let url = Url::parse(fixtures::ACCEPTANCES_URL).unwrap();
        let meeting = AcceptancesParser::parse(&fixtures::acceptances_page(), &url).unwrap();

        let info = &meeting.venue_info;
        assert_eq!(info.name, "Ascot");
        assert_eq!(info.location, "Perth");
        assert_eq!(info.club_name, "Perth Racing");
        assert_eq!(info.state.as_deref(), Some("WA"));
        assert_eq!(info.date, NaiveDate::from_ymd_opt(2025, 10, 16).unwrap());
        assert_eq!(info.source_url, url.to_string());

        // Race 2 has no runner table
        assert_eq!(meeting.races.len(), 1);
        let race = &meeting.races[0];
        assert_eq!(race.title, "KARRAKATTA PLATE");
        assert_eq!(race.race_number, Some(1));
        assert_eq!(race.original_field_size, 4);
        assert_eq!(race.scratched, 1);

        // Scratched and jockey-less rows are dropped
        assert_eq!(race.runners.len(), 2);
        let zoom = &race.runners[0];
        assert_eq!(zoom.horse, "Zoom");
        assert_eq!(zoom.jockey, "Ms Jane Doe");
        assert_eq!(zoom.barrier, Some(3));
        assert_eq!(zoom.weight, Some(57.0));
        assert_eq!(zoom.sp_value, None);

        let kettle = &race.runners[1];
        assert_eq!(kettle.jockey, "Craig Williams");
        assert_eq!(kettle.claimed_weight, Some(2.0));
        assert_eq!(kettle.weight, Some(56.0));
    }
}
