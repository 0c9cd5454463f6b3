//! Per-(date, venue) meeting card store.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::decode::decode_meeting;
use super::{list_json_stems, list_subdirs, read_optional, slugify, write_json, StoreError};
use crate::types::VenueMeeting;

/// Store of `races/<date>/<venue-slug>.json` files
pub struct VenueStore {
    dir: PathBuf,
}

impl VenueStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn date_dir(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(date.format("%Y-%m-%d").to_string())
    }

    pub fn path_for(&self, date: NaiveDate, slug: &str) -> PathBuf {
        self.date_dir(date).join(format!("{}.json", slug))
    }

    /// Replace the card for the meeting's (date, venue) wholesale.
    pub fn save(&self, meeting: &VenueMeeting) -> Result<PathBuf, StoreError> {
        let slug = slugify(&meeting.venue_info.name);
        if slug.is_empty() {
            return Err(StoreError::EmptySlug(meeting.venue_info.name.clone()));
        }

        let path = self.path_for(meeting.venue_info.date, &slug);
        write_json(&path, meeting)?;
        Ok(path)
    }

    pub fn load(&self, date: NaiveDate, slug: &str) -> Result<Option<VenueMeeting>, StoreError> {
        let path = self.path_for(date, slug);
        let Some(content) = read_optional(&path)? else {
            return Ok(None);
        };

        decode_meeting(&content)
            .map(Some)
            .map_err(|source| StoreError::Decode { path, source })
    }

    /// Dates that have a directory, ascending. Non-date directories are ignored.
    pub fn list_dates(&self) -> Result<Vec<NaiveDate>, StoreError> {
        let mut dates: Vec<NaiveDate> = list_subdirs(&self.dir)?
            .iter()
            .filter_map(|name| NaiveDate::parse_from_str(name, "%Y-%m-%d").ok())
            .collect();
        dates.sort();
        Ok(dates)
    }

    pub fn list_venues(&self, date: NaiveDate) -> Result<Vec<String>, StoreError> {
        list_json_stems(&self.date_dir(date))
    }

    /// All decodable meetings for a date, paired with their slug.
    /// A missing date directory is empty; broken files are logged and skipped.
    pub fn load_date(&self, date: NaiveDate) -> Result<Vec<(String, VenueMeeting)>, StoreError> {
        let mut meetings = Vec::new();
        for slug in self.list_venues(date)? {
            match self.load(date, &slug) {
                Ok(Some(meeting)) => meetings.push((slug, meeting)),
                Ok(None) => {}
                Err(e) => warn!("Skipping meeting file: {}", e),
            }
        }
        Ok(meetings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RaceCard, Runner, VenueInfo};

    fn meeting(name: &str, day: u32, runners: usize) -> VenueMeeting {
        VenueMeeting {
            venue_info: VenueInfo {
                name: name.to_string(),
                location: "Perth".to_string(),
                club_name: "Perth Racing".to_string(),
                state: Some("WA".to_string()),
                date: NaiveDate::from_ymd_opt(2026, 1, day).unwrap(),
                source_url: "https://racingaustralia.horse/FreeFields/Acceptances.aspx".to_string(),
            },
            races: vec![RaceCard {
                title: "Maiden Plate".to_string(),
                race_number: Some(1),
                grade: Some("Maiden".to_string()),
                track_type: "Turf".to_string(),
                track_condition: "Good 4".to_string(),
                distance: Some(1200),
                original_field_size: runners as u32,
                scratched: 0,
                runners: (0..runners)
                    .map(|i| Runner {
                        horse: format!("Horse {}", i),
                        jockey: format!("Jockey {}", i),
                        trainer: None,
                        barrier: Some(i as u32 + 1),
                        weight: Some(57.0),
                        claimed_weight: None,
                        sp_value: None,
                    })
                    .collect(),
            }],
        }
    }

    #[test]
    fn test_save_overwrites_wholesale() {
        let dir = tempfile::tempdir().unwrap();
        let store = VenueStore::new(dir.path());

        store.save(&meeting("Ascot", 5, 8)).unwrap();
        store.save(&meeting("Ascot", 5, 3)).unwrap();

        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let loaded = store.load(date, "ascot").unwrap().unwrap();
        assert_eq!(loaded.races[0].runners.len(), 3);
        assert_eq!(store.list_venues(date).unwrap(), vec!["ascot"]);
    }

    #[test]
    fn test_list_dates_ignores_junk() {
        let dir = tempfile::tempdir().unwrap();
        let store = VenueStore::new(dir.path());
        store.save(&meeting("Ascot", 7, 1)).unwrap();
        store.save(&meeting("Belmont Park", 5, 1)).unwrap();
        std::fs::create_dir_all(dir.path().join("scratch")).unwrap();

        let dates = store.list_dates().unwrap();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
                NaiveDate::from_ymd_opt(2026, 1, 7).unwrap(),
            ]
        );
    }

    #[test]
    fn test_load_date_missing_and_broken() {
        let dir = tempfile::tempdir().unwrap();
        let store = VenueStore::new(dir.path());
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();

        assert!(store.load_date(date).unwrap().is_empty());

        store.save(&meeting("Belmont Park", 5, 2)).unwrap();
        std::fs::write(store.path_for(date, "broken"), "[]").unwrap();

        let meetings = store.load_date(date).unwrap();
        assert_eq!(meetings.len(), 1);
        assert_eq!(meetings[0].0, "belmont-park");
    }
}
