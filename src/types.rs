//! Record types persisted by the pipeline and read by the dashboard.
//!
//! Field names serialize in camelCase so the JSON files keep the layout the
//! dashboard already reads (`raceDate`, `spValue`, `venueInfo`, ...).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::decode;

/// One runner's participation in one race, as stored in a jockey file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceEntry {
    pub race_date: NaiveDate,
    #[serde(default, deserialize_with = "decode::string_or_empty")]
    pub race_title: String,
    #[serde(default, deserialize_with = "decode::string_or_empty")]
    pub race_venue: String,
    #[serde(default, deserialize_with = "decode::opt_string")]
    pub race_state: Option<String>,
    #[serde(default, deserialize_with = "decode::opt_u32")]
    pub race_number: Option<u32>,
    #[serde(default, deserialize_with = "decode::opt_grade")]
    pub race_grade: Option<String>,
    #[serde(default, deserialize_with = "decode::opt_u32")]
    pub distance: Option<u32>,
    pub horse: String,
    #[serde(default, deserialize_with = "decode::opt_string")]
    pub trainer_name: Option<String>,
    #[serde(default, deserialize_with = "decode::opt_f64")]
    pub sp_value: Option<f64>,
    #[serde(default, deserialize_with = "decode::opt_string")]
    pub sp_string: Option<String>,
    #[serde(default, deserialize_with = "decode::opt_f64")]
    pub weight: Option<f64>,
    #[serde(default, deserialize_with = "decode::opt_f64")]
    pub claimed_weight: Option<f64>,
    /// `None` means scratched or not yet resolved.
    #[serde(default, deserialize_with = "decode::opt_u32")]
    pub finishing_position: Option<u32>,
    #[serde(default, deserialize_with = "decode::opt_u32")]
    pub barrier: Option<u32>,
    #[serde(default, deserialize_with = "decode::u32_or_zero")]
    pub field_size: u32,
    #[serde(default, deserialize_with = "decode::string_or_empty")]
    pub track_type: String,
    #[serde(default, deserialize_with = "decode::string_or_empty")]
    pub track_condition: String,
    #[serde(default, deserialize_with = "decode::u32_or_zero")]
    pub original_field_size: u32,
    #[serde(default, deserialize_with = "decode::u32_or_zero")]
    pub scratched_horses: u32,
}

impl RaceEntry {
    /// Key used to recognise the same ride across re-crawls of a meeting.
    pub fn dedup_key(&self) -> (NaiveDate, String, Option<u32>) {
        (self.race_date, self.horse.trim().to_lowercase(), self.race_number)
    }

    pub fn is_win(&self) -> bool {
        self.finishing_position == Some(1)
    }
}

/// Per-jockey file contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JockeyRecord {
    pub name: String,
    #[serde(default)]
    pub is_female: bool,
    /// `"Apprentice"` or empty.
    #[serde(default)]
    pub rank: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub age: String,
    #[serde(default)]
    pub stats: Vec<RaceEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived: Option<DerivedStats>,
}

impl JockeyRecord {
    pub fn new(identity: &JockeyIdentity) -> Self {
        Self {
            name: identity.name.clone(),
            is_female: identity.is_female,
            rank: identity.rank().to_string(),
            location: String::new(),
            age: String::new(),
            stats: Vec::new(),
            derived: None,
        }
    }
}

/// What a single results row tells us about the jockey riding it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JockeyIdentity {
    pub name: String,
    pub is_female: bool,
    pub is_apprentice: bool,
}

impl JockeyIdentity {
    pub fn rank(&self) -> &'static str {
        if self.is_apprentice {
            "Apprentice"
        } else {
            ""
        }
    }
}

/// Aggregates recomputed from a jockey's full history on every derive run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedStats {
    pub total_rides: u32,
    pub total_wins: u32,
    pub total_places: u32,
    pub win_rate: f64,
    pub place_rate: f64,
    pub days_since_last_win: Option<i64>,
    #[serde(default)]
    pub recent_form: String,
    pub current_streak: Streak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    #[serde(rename = "type")]
    pub kind: StreakKind,
    pub count: u32,
}

impl Streak {
    pub fn unknown() -> Self {
        Self {
            kind: StreakKind::Unknown,
            count: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreakKind {
    #[serde(alias = "win")]
    Winning,
    #[serde(alias = "loss", alias = "lose")]
    Losing,
    /// Rides on record but none with a resolved finishing position.
    Neutral,
    /// No rides on record at all.
    Unknown,
}

/// Per-(date, venue) meeting file: the pre-race card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueMeeting {
    pub venue_info: VenueInfo,
    #[serde(default)]
    pub races: Vec<RaceCard>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueInfo {
    #[serde(default, deserialize_with = "decode::string_or_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "decode::string_or_empty")]
    pub location: String,
    #[serde(default, deserialize_with = "decode::string_or_empty")]
    pub club_name: String,
    #[serde(default, deserialize_with = "decode::opt_string")]
    pub state: Option<String>,
    pub date: NaiveDate,
    #[serde(default, deserialize_with = "decode::string_or_empty")]
    pub source_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceCard {
    #[serde(default, deserialize_with = "decode::string_or_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "decode::opt_u32")]
    pub race_number: Option<u32>,
    #[serde(default, deserialize_with = "decode::opt_grade")]
    pub grade: Option<String>,
    #[serde(default, deserialize_with = "decode::string_or_empty")]
    pub track_type: String,
    #[serde(default, deserialize_with = "decode::string_or_empty")]
    pub track_condition: String,
    #[serde(default, deserialize_with = "decode::opt_u32")]
    pub distance: Option<u32>,
    #[serde(default, deserialize_with = "decode::u32_or_zero")]
    pub original_field_size: u32,
    #[serde(default, deserialize_with = "decode::u32_or_zero")]
    pub scratched: u32,
    #[serde(default)]
    pub runners: Vec<Runner>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Runner {
    #[serde(default, deserialize_with = "decode::string_or_empty")]
    pub horse: String,
    #[serde(default, deserialize_with = "decode::string_or_empty")]
    pub jockey: String,
    #[serde(default, deserialize_with = "decode::opt_string")]
    pub trainer: Option<String>,
    #[serde(default, deserialize_with = "decode::opt_u32")]
    pub barrier: Option<u32>,
    #[serde(default, deserialize_with = "decode::opt_f64")]
    pub weight: Option<f64>,
    #[serde(default, deserialize_with = "decode::opt_f64")]
    pub claimed_weight: Option<f64>,
    /// Absent on pre-race cards; zero is treated as "no price".
    #[serde(default, deserialize_with = "decode::opt_f64")]
    pub sp_value: Option<f64>,
}

/// One of today's rides that qualified a jockey for a bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayRide {
    pub date: NaiveDate,
    pub venue: String,
    pub race_title: String,
    pub horse: String,
    pub odds: Option<f64>,
}

/// Entry of a hot-form or due-for-win list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedJockey {
    pub jockey_name: String,
    pub slug: String,
    pub win_rate: f64,
    pub place_rate: f64,
    pub days_since_last_win: Option<i64>,
    pub streak: Streak,
    pub recent_form: String,
    pub best_odds: Option<f64>,
    pub rides: Vec<TodayRide>,
    pub race_date: NaiveDate,
}

/// Per-date counts for the dashboard header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub date: NaiveDate,
    pub venue_count: usize,
    pub race_count: usize,
    pub runner_count: usize,
    pub jockey_count: usize,
    pub venues: Vec<VenueBreakdown>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueBreakdown {
    pub slug: String,
    pub name: String,
    pub race_count: usize,
    pub runner_count: usize,
}

/// Roster-wide overview written after every derive pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterSummary {
    pub date_generated: DateTime<Utc>,
    pub jockey_count: usize,
    pub averages: RosterAverages,
    pub top_in_form_jockeys: Vec<RosterEntry>,
    pub due_for_win_jockeys: Vec<RosterEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterAverages {
    pub win_rate: f64,
    pub place_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub name: String,
    pub slug: String,
    pub win_rate: f64,
    pub place_rate: f64,
    pub days_since_last_win: Option<i64>,
    pub recent_form: String,
}
