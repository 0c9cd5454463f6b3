//! Classification and summary output under `processed/`.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};

use super::{list_subdirs, read_optional, write_json, StoreError};
use crate::types::{ClassifiedJockey, DashboardSummary, RosterSummary};

/// The two ranked lists written per date and globally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    HotForm,
    DueForWin,
}

impl Bucket {
    pub const ALL: [Bucket; 2] = [Bucket::HotForm, Bucket::DueForWin];

    pub fn file_name(self) -> &'static str {
        match self {
            Bucket::HotForm => "hotForm.json",
            Bucket::DueForWin => "dueForWin.json",
        }
    }

    pub fn global_file_name(self) -> &'static str {
        match self {
            Bucket::HotForm => "hotFormAll.json",
            Bucket::DueForWin => "dueForWinAll.json",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Bucket::HotForm => "hot form",
            Bucket::DueForWin => "due for a win",
        }
    }
}

pub struct SummaryStore {
    dir: PathBuf,
}

impl SummaryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn date_dir(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(date.format("%Y-%m-%d").to_string())
    }

    pub fn bucket_path(&self, date: NaiveDate, bucket: Bucket) -> PathBuf {
        self.date_dir(date).join(bucket.file_name())
    }

    pub fn write_bucket(
        &self,
        date: NaiveDate,
        bucket: Bucket,
        entries: &[ClassifiedJockey],
    ) -> Result<PathBuf, StoreError> {
        let path = self.bucket_path(date, bucket);
        write_json(&path, entries)?;
        Ok(path)
    }

    /// A per-date list; missing means empty.
    pub fn load_bucket(
        &self,
        date: NaiveDate,
        bucket: Bucket,
    ) -> Result<Vec<ClassifiedJockey>, StoreError> {
        let path = self.bucket_path(date, bucket);
        let Some(content) = read_optional(&path)? else {
            return Ok(Vec::new());
        };

        serde_json::from_str(&content).map_err(|e| StoreError::Decode {
            path,
            source: e.into(),
        })
    }

    /// Dates with a per-date output directory, ascending.
    pub fn list_dates(&self) -> Result<Vec<NaiveDate>, StoreError> {
        let mut dates: Vec<NaiveDate> = list_subdirs(&self.dir)?
            .iter()
            .filter_map(|name| NaiveDate::parse_from_str(name, "%Y-%m-%d").ok())
            .collect();
        dates.sort();
        Ok(dates)
    }

    pub fn write_global(
        &self,
        bucket: Bucket,
        entries: &[ClassifiedJockey],
    ) -> Result<PathBuf, StoreError> {
        let path = self.dir.join(bucket.global_file_name());
        write_json(&path, entries)?;
        Ok(path)
    }

    pub fn write_dashboard(&self, summary: &DashboardSummary) -> Result<PathBuf, StoreError> {
        let path = self.date_dir(summary.date).join("dashboard.json");
        write_json(&path, summary)?;
        Ok(path)
    }

    pub fn write_roster(&self, summary: &RosterSummary) -> Result<PathBuf, StoreError> {
        let path = self.dir.join("summary.json");
        write_json(&path, summary)?;
        Ok(path)
    }
}
