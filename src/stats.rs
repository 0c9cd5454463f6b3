//! Per-jockey derived statistics.
//!
//! Everything here is recomputed from the full ride history on every run;
//! nothing is carried over from a previous `derived` block.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::classify::build_roster_summary;
use crate::config::{ClassificationConfig, StatsConfig};
use crate::storage::{JockeyStore, StoreError, SummaryStore};
use crate::types::{DerivedStats, JockeyRecord, RaceEntry, Streak, StreakKind};

/// Round to 2 decimal places, the precision rates are persisted at
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Worst finishing position that still counts as a place.
///
/// With scaling enabled, small fields pay fewer places: 8+ runners use the
/// configured cutoff, 5 to 7 at most 2, and fewer than 5 only the winner.
/// An unknown field size (0) uses the configured cutoff.
pub fn place_cutoff(config: &StatsConfig, field_size: u32) -> u32 {
    let cutoff = config.place_cutoff.max(1);
    if !config.scale_places_by_field_size {
        return cutoff;
    }
    match field_size {
        0 => cutoff,
        1..=4 => 1,
        5..=7 => cutoff.min(2),
        _ => cutoff,
    }
}

/// Streak over date-sorted resolved rides, walking back from the latest.
pub fn compute_streak(rides: &[&RaceEntry]) -> Streak {
    let Some(latest) = rides.last() else {
        return Streak {
            kind: StreakKind::Neutral,
            count: 0,
        };
    };

    let winning = latest.is_win();
    let count = rides
        .iter()
        .rev()
        .take_while(|ride| ride.is_win() == winning)
        .count() as u32;

    Streak {
        kind: if winning {
            StreakKind::Winning
        } else {
            StreakKind::Losing
        },
        count,
    }
}

pub fn compute_derived(stats: &[RaceEntry], today: NaiveDate, config: &StatsConfig) -> DerivedStats {
    let mut rides: Vec<&RaceEntry> = stats
        .iter()
        .filter(|entry| entry.finishing_position.is_some())
        .collect();
    rides.sort_by_key(|entry| (entry.race_date, entry.race_number));

    let total_rides = rides.len() as u32;
    let total_wins = rides.iter().filter(|r| r.is_win()).count() as u32;
    let total_places = rides
        .iter()
        .filter(|r| {
            r.finishing_position
                .is_some_and(|p| p <= place_cutoff(config, r.field_size))
        })
        .count() as u32;

    let (win_rate, place_rate) = if total_rides == 0 {
        (0.0, 0.0)
    } else {
        (
            round2(total_wins as f64 / total_rides as f64),
            round2(total_places as f64 / total_rides as f64),
        )
    };

    let days_since_last_win = rides
        .iter()
        .filter(|r| r.is_win())
        .map(|r| r.race_date)
        .max()
        .map(|last| (today - last).num_days().max(0));

    let window_start = rides.len().saturating_sub(config.form_window);
    let recent_form = rides[window_start..]
        .iter()
        .map(|r| match r.finishing_position {
            Some(p @ 1..=9) => char::from_digit(p, 10).unwrap_or('X'),
            _ => 'X',
        })
        .collect();

    let current_streak = if stats.is_empty() {
        Streak::unknown()
    } else {
        compute_streak(&rides)
    };

    DerivedStats {
        total_rides,
        total_wins,
        total_places,
        win_rate,
        place_rate,
        days_since_last_win,
        recent_form,
        current_streak,
    }
}

/// Outcome of a derive pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeriveReport {
    pub processed: usize,
    pub failed: usize,
}

/// Recompute and rewrite every jockey file, then the roster summary.
/// A file that fails to load or save is logged and skipped.
pub fn derive_all(
    store: &JockeyStore,
    summaries: &SummaryStore,
    today: NaiveDate,
    stats_config: &StatsConfig,
    classification: &ClassificationConfig,
) -> Result<DeriveReport, StoreError> {
    let mut report = DeriveReport::default();
    let mut records: Vec<(String, JockeyRecord)> = Vec::new();

    for slug in store.list_slugs()? {
        let mut record = match store.load(&slug) {
            Ok(Some(record)) => record,
            Ok(None) => continue,
            Err(e) => {
                warn!("Skipping {}: {}", slug, e);
                report.failed += 1;
                continue;
            }
        };

        let derived = compute_derived(&record.stats, today, stats_config);
        debug!(
            "{}: {} rides, {} wins, form {}",
            record.name, derived.total_rides, derived.total_wins, derived.recent_form
        );
        record.derived = Some(derived);

        match store.save_at(&slug, &record) {
            Ok(_) => {
                report.processed += 1;
                records.push((slug, record));
            }
            Err(e) => {
                warn!("Failed to save {}: {}", slug, e);
                report.failed += 1;
            }
        }
    }

    let summary = build_roster_summary(&records, classification);
    summaries.write_roster(&summary)?;

    info!(
        "Derived stats for {} jockeys ({} failed)",
        report.processed, report.failed
    );
    Ok(report)
}
