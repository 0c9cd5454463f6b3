//! Per-jockey record store with idempotent upsert.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::decode::decode_jockey;
use super::{list_json_stems, read_optional, slugify, write_json, StoreError};
use crate::types::{JockeyIdentity, JockeyRecord, RaceEntry};

/// Counts of what an upsert did to a jockey's history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    pub created: bool,
    pub appended: usize,
    pub replaced: usize,
}

/// Store of `jockeys/<slug>.json` files
pub struct JockeyStore {
    dir: PathBuf,
    dedup: bool,
}

impl JockeyStore {
    /// `dedup` keys entries by (race date, horse, race number) so re-crawling
    /// a meeting updates rides instead of duplicating them.
    pub fn new(dir: impl Into<PathBuf>, dedup: bool) -> Self {
        Self {
            dir: dir.into(),
            dedup,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn dedup(&self) -> bool {
        self.dedup
    }

    pub fn path_for(&self, slug: &str) -> PathBuf {
        self.dir.join(format!("{}.json", slug))
    }

    /// Load a record by slug. A missing file is `Ok(None)`.
    pub fn load(&self, slug: &str) -> Result<Option<JockeyRecord>, StoreError> {
        let path = self.path_for(slug);
        let Some(content) = read_optional(&path)? else {
            return Ok(None);
        };

        decode_jockey(&content)
            .map(Some)
            .map_err(|source| StoreError::Decode { path, source })
    }

    /// Write a record to the file keyed by its name's slug.
    pub fn save(&self, record: &JockeyRecord) -> Result<PathBuf, StoreError> {
        let slug = slugify(&record.name);
        if slug.is_empty() {
            return Err(StoreError::EmptySlug(record.name.clone()));
        }

        self.save_at(&slug, record)
    }

    /// Write a record back to the file it was loaded from.
    pub fn save_at(&self, slug: &str, record: &JockeyRecord) -> Result<PathBuf, StoreError> {
        let path = self.path_for(slug);
        write_json(&path, record)?;
        Ok(path)
    }

    pub fn list_slugs(&self) -> Result<Vec<String>, StoreError> {
        list_json_stems(&self.dir)
    }

    /// Load every decodable record; broken files are logged and skipped.
    pub fn load_all(&self) -> Result<Vec<JockeyRecord>, StoreError> {
        let mut records = Vec::new();
        for slug in self.list_slugs()? {
            match self.load(&slug) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => warn!("Skipping jockey file: {}", e),
            }
        }
        Ok(records)
    }

    pub fn upsert_race_entry(
        &self,
        identity: &JockeyIdentity,
        entry: RaceEntry,
    ) -> Result<UpsertSummary, StoreError> {
        self.upsert_race_entries(identity, vec![entry])
    }

    /// Merge `entries` into the jockey's history in one read-modify-write.
    ///
    /// An undecodable existing file is an error; it is never overwritten.
    pub fn upsert_race_entries(
        &self,
        identity: &JockeyIdentity,
        entries: Vec<RaceEntry>,
    ) -> Result<UpsertSummary, StoreError> {
        let slug = slugify(&identity.name);
        if slug.is_empty() {
            return Err(StoreError::EmptySlug(identity.name.clone()));
        }

        let mut summary = UpsertSummary::default();
        let mut record = match self.load(&slug)? {
            Some(record) => record,
            None => {
                summary.created = true;
                JockeyRecord::new(identity)
            }
        };

        merge_identity(&mut record, identity);

        for entry in entries {
            let existing = if self.dedup {
                let key = entry.dedup_key();
                record.stats.iter().position(|s| s.dedup_key() == key)
            } else {
                None
            };

            match existing {
                Some(index) => {
                    debug!(
                        "Updated {} ({}) on {}",
                        identity.name, entry.horse, entry.race_date
                    );
                    record.stats[index] = entry;
                    summary.replaced += 1;
                }
                None => {
                    debug!("Added {} ({}) on {}", identity.name, entry.horse, entry.race_date);
                    record.stats.push(entry);
                    summary.appended += 1;
                }
            }
        }

        write_json(&self.path_for(&slug), &record)?;
        Ok(summary)
    }
}

/// Incoming non-empty display fields win; everything else is kept.
fn merge_identity(record: &mut JockeyRecord, identity: &JockeyIdentity) {
    if !identity.name.trim().is_empty() {
        record.name = identity.name.clone();
    }
    record.is_female |= identity.is_female;
    if identity.is_apprentice {
        record.rank = identity.rank().to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StatsConfig;
    use crate::stats::compute_derived;
    use crate::types::StreakKind;
    use chrono::NaiveDate;

    fn identity(name: &str) -> JockeyIdentity {
        JockeyIdentity {
            name: name.to_string(),
            is_female: false,
            is_apprentice: false,
        }
    }

    fn entry(day: u32, horse: &str, race_number: u32, position: Option<u32>) -> RaceEntry {
        RaceEntry {
            race_date: NaiveDate::from_ymd_opt(2026, 1, day).unwrap(),
            race_title: "Maiden Plate".to_string(),
            race_venue: "Ascot".to_string(),
            race_state: Some("WA".to_string()),
            race_number: Some(race_number),
            race_grade: Some("Maiden".to_string()),
            distance: Some(1200),
            horse: horse.to_string(),
            trainer_name: Some("T. Trainer".to_string()),
            sp_value: Some(4.6),
            sp_string: Some("$4.60".to_string()),
            weight: Some(57.0),
            claimed_weight: None,
            finishing_position: position,
            barrier: Some(3),
            field_size: 9,
            track_type: "Turf".to_string(),
            track_condition: "Good 4".to_string(),
            original_field_size: 10,
            scratched_horses: 1,
        }
    }

    #[test]
    fn test_upsert_creates_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = JockeyStore::new(dir.path(), true);

        let summary = store
            .upsert_race_entry(&identity("Jane Doe"), entry(1, "Zoom", 1, Some(1)))
            .unwrap();
        assert!(summary.created);
        assert_eq!(summary.appended, 1);

        let record = store.load("jane-doe").unwrap().unwrap();
        assert_eq!(record.name, "Jane Doe");
        assert_eq!(record.stats.len(), 1);
    }

    #[test]
    fn test_upsert_is_idempotent_with_dedup() {
        let dir = tempfile::tempdir().unwrap();
        let store = JockeyStore::new(dir.path(), true);
        let who = identity("Jane Doe");

        store.upsert_race_entry(&who, entry(1, "Zoom", 1, None)).unwrap();
        let summary = store.upsert_race_entry(&who, entry(1, "zoom", 1, Some(2))).unwrap();
        assert!(!summary.created);
        assert_eq!(summary.replaced, 1);
        assert_eq!(summary.appended, 0);

        let record = store.load("jane-doe").unwrap().unwrap();
        assert_eq!(record.stats.len(), 1);
        assert_eq!(record.stats[0].finishing_position, Some(2));
    }

    #[test]
    fn test_upsert_without_dedup_appends() {
        let dir = tempfile::tempdir().unwrap();
        let store = JockeyStore::new(dir.path(), false);
        let who = identity("Jane Doe");

        store.upsert_race_entry(&who, entry(1, "Zoom", 1, Some(1))).unwrap();
        store.upsert_race_entry(&who, entry(1, "Zoom", 1, Some(1))).unwrap();

        let record = store.load("jane-doe").unwrap().unwrap();
        assert_eq!(record.stats.len(), 2);
    }

    #[test]
    fn test_upsert_preserves_display_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = JockeyStore::new(dir.path(), true);

        let mut existing = JockeyRecord::new(&identity("Ms Jane Doe"));
        existing.location = "Perth".to_string();
        existing.age = "27".to_string();
        existing.is_female = true;
        existing.rank = "Apprentice".to_string();
        store.save(&existing).unwrap();

        store
            .upsert_race_entry(&identity("Ms Jane Doe"), entry(2, "Blink", 3, Some(4)))
            .unwrap();

        let record = store.load("ms-jane-doe").unwrap().unwrap();
        assert_eq!(record.location, "Perth");
        assert_eq!(record.age, "27");
        assert!(record.is_female);
        assert_eq!(record.rank, "Apprentice");
        assert_eq!(record.stats.len(), 1);
    }

    #[test]
    fn test_upsert_refuses_to_clobber_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JockeyStore::new(dir.path(), true);
        std::fs::write(store.path_for("jane-doe"), "{not json").unwrap();

        let err = store
            .upsert_race_entry(&identity("Jane Doe"), entry(1, "Zoom", 1, Some(1)))
            .unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
        assert_eq!(std::fs::read_to_string(store.path_for("jane-doe")).unwrap(), "{not json");
    }

    #[test]
    fn test_empty_slug_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = JockeyStore::new(dir.path(), true);
        let err = store
            .upsert_race_entry(&identity("()"), entry(1, "Zoom", 1, Some(1)))
            .unwrap_err();
        assert!(matches!(err, StoreError::EmptySlug(_)));
    }

    #[test]
    fn test_round_trip_preserves_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = JockeyStore::new(dir.path(), true);

        let mut record = JockeyRecord::new(&identity("Jane Doe"));
        record.stats = vec![
            entry(1, "Zoom", 1, Some(1)),
            entry(3, "Blink", 2, None),
            entry(5, "Kettle", 4, Some(4)),
        ];
        let today = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let derived = compute_derived(&record.stats, today, &StatsConfig::default());
        assert_eq!(derived.win_rate, 0.5);
        assert_eq!(derived.days_since_last_win, Some(9));
        assert_eq!(derived.current_streak.kind, StreakKind::Losing);
        record.derived = Some(derived);
        store.save(&record).unwrap();

        let loaded = store.load("jane-doe").unwrap().unwrap();
        assert_eq!(loaded, record);
        assert_eq!(loaded.derived, record.derived);
    }

    #[test]
    fn test_load_all_skips_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = JockeyStore::new(dir.path(), true);
        store.save(&JockeyRecord::new(&identity("Jane Doe"))).unwrap();
        std::fs::write(store.path_for("broken"), r#"{"stats": []}"#).unwrap();

        let records = store.load_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Jane Doe");
    }
}
