//! Hot-form and due-for-win classification of the jockeys riding on a date.

use chrono::{NaiveDate, Utc};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::config::ClassificationConfig;
use crate::stats::round2;
use crate::storage::{slugify, Bucket, JockeyStore, StoreError, SummaryStore, VenueStore};
use crate::types::{
    ClassifiedJockey, DashboardSummary, DerivedStats, JockeyRecord, RosterAverages, RosterEntry,
    RosterSummary, StreakKind, TodayRide, VenueBreakdown, VenueMeeting,
};

impl ClassificationConfig {
    /// Form criteria on stats alone, before requiring a ride
    pub fn hot_form_stats(&self, d: &DerivedStats) -> bool {
        let by_rate = d.win_rate >= self.hot_min_win_rate || d.place_rate >= self.hot_min_place_rate;
        let recent_win = d
            .days_since_last_win
            .is_some_and(|days| days <= self.hot_max_days_since_win);
        let streaking = d.current_streak.kind == StreakKind::Winning
            && d.current_streak.count >= self.hot_min_win_streak;
        by_rate || recent_win || streaking
    }

    pub fn due_for_win_stats(&self, d: &DerivedStats) -> bool {
        d.days_since_last_win
            .is_some_and(|days| days > self.due_min_days_since_win)
            && d.place_rate >= self.due_min_place_rate
    }

    pub fn is_hot_form(&self, d: &DerivedStats, rides_today: usize) -> bool {
        rides_today > 0 && self.hot_form_stats(d)
    }

    pub fn is_due_for_win(&self, d: &DerivedStats, rides_today: usize) -> bool {
        rides_today > 0 && self.due_for_win_stats(d)
    }
}

/// Jockeys with derived stats, keyed by slug
pub struct JockeyIndex {
    by_slug: HashMap<String, JockeyRecord>,
}

impl JockeyIndex {
    pub fn new(records: Vec<JockeyRecord>) -> Self {
        let by_slug = records
            .into_iter()
            .filter(|r| r.derived.is_some())
            .map(|r| (slugify(&r.name), r))
            .filter(|(slug, _)| !slug.is_empty())
            .collect();
        Self { by_slug }
    }

    pub fn get(&self, slug: &str) -> Option<(&JockeyRecord, &DerivedStats)> {
        let record = self.by_slug.get(slug)?;
        record.derived.as_ref().map(|d| (record, d))
    }

    pub fn len(&self) -> usize {
        self.by_slug.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_slug.is_empty()
    }
}

/// Both lists and the dashboard counts for one date
#[derive(Debug, Clone, PartialEq)]
pub struct DateClassification {
    pub hot_form: Vec<ClassifiedJockey>,
    pub due_for_win: Vec<ClassifiedJockey>,
    pub dashboard: DashboardSummary,
}

/// Best odds ascending (no price last), then win rate descending, then
/// number of rides descending, then slug.
pub fn compare_rank(a: &ClassifiedJockey, b: &ClassifiedJockey) -> Ordering {
    let odds = match (a.best_odds, b.best_odds) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    odds.then_with(|| b.win_rate.total_cmp(&a.win_rate))
        .then_with(|| b.rides.len().cmp(&a.rides.len()))
        .then_with(|| a.slug.cmp(&b.slug))
}

/// Cross-date order: race date ascending, then the per-date rank
pub fn compare_global(a: &ClassifiedJockey, b: &ClassifiedJockey) -> Ordering {
    a.race_date
        .cmp(&b.race_date)
        .then_with(|| compare_rank(a, b))
}

pub fn classify_date(
    date: NaiveDate,
    meetings: &[(String, VenueMeeting)],
    index: &JockeyIndex,
    policy: &ClassificationConfig,
) -> DateClassification {
    // slug -> today's rides; BTreeMap keeps iteration deterministic
    let mut rides: BTreeMap<String, Vec<TodayRide>> = BTreeMap::new();

    for (slug, meeting) in meetings {
        let venue = if meeting.venue_info.name.is_empty() {
            slug.clone()
        } else {
            meeting.venue_info.name.clone()
        };

        for race in &meeting.races {
            for runner in &race.runners {
                let jockey_slug = slugify(&runner.jockey);
                if index.get(&jockey_slug).is_none() {
                    continue;
                }
                rides.entry(jockey_slug).or_default().push(TodayRide {
                    date,
                    venue: venue.clone(),
                    race_title: race.title.clone(),
                    horse: runner.horse.clone(),
                    odds: runner.sp_value,
                });
            }
        }
    }

    let mut hot_form = Vec::new();
    let mut due_for_win = Vec::new();

    for (slug, today) in rides {
        let Some((record, derived)) = index.get(&slug) else {
            continue;
        };
        let hot = policy.is_hot_form(derived, today.len());
        let due = policy.is_due_for_win(derived, today.len());
        if !hot && !due {
            continue;
        }

        let entry = ClassifiedJockey {
            jockey_name: record.name.clone(),
            slug,
            win_rate: derived.win_rate,
            place_rate: derived.place_rate,
            days_since_last_win: derived.days_since_last_win,
            streak: derived.current_streak,
            recent_form: derived.recent_form.clone(),
            best_odds: today
                .iter()
                .filter_map(|r| r.odds)
                .min_by(|a, b| a.total_cmp(b)),
            rides: today,
            race_date: date,
        };

        match (hot, due) {
            (true, true) => {
                due_for_win.push(entry.clone());
                hot_form.push(entry);
            }
            (true, false) => hot_form.push(entry),
            _ => due_for_win.push(entry),
        }
    }

    for list in [&mut hot_form, &mut due_for_win] {
        list.sort_by(compare_rank);
        list.truncate(policy.max_results);
    }

    DateClassification {
        hot_form,
        due_for_win,
        dashboard: build_dashboard(date, meetings),
    }
}

/// Venue, race, runner and distinct jockey counts for one date
pub fn build_dashboard(date: NaiveDate, meetings: &[(String, VenueMeeting)]) -> DashboardSummary {
    let mut jockeys = HashSet::new();
    let mut venues = Vec::with_capacity(meetings.len());

    for (slug, meeting) in meetings {
        let runner_count = meeting.races.iter().map(|r| r.runners.len()).sum();
        for runner in meeting.races.iter().flat_map(|r| &r.runners) {
            let jockey = slugify(&runner.jockey);
            if !jockey.is_empty() {
                jockeys.insert(jockey);
            }
        }
        venues.push(VenueBreakdown {
            slug: slug.clone(),
            name: meeting.venue_info.name.clone(),
            race_count: meeting.races.len(),
            runner_count,
        });
    }

    DashboardSummary {
        date,
        venue_count: venues.len(),
        race_count: venues.iter().map(|v| v.race_count).sum(),
        runner_count: venues.iter().map(|v| v.runner_count).sum(),
        jockey_count: jockeys.len(),
        venues,
    }
}

/// Order the merged per-date lists for the global file and truncate
pub fn rank_global(mut entries: Vec<ClassifiedJockey>, max_results: usize) -> Vec<ClassifiedJockey> {
    entries.sort_by(compare_global);
    entries.truncate(max_results);
    entries
}

/// Roster averages and top lists from stats alone
pub fn build_roster_summary(
    records: &[(String, JockeyRecord)],
    policy: &ClassificationConfig,
) -> RosterSummary {
    let with_stats: Vec<(&String, &JockeyRecord, &DerivedStats)> = records
        .iter()
        .filter_map(|(slug, r)| r.derived.as_ref().map(|d| (slug, r, d)))
        .collect();

    let average = |f: fn(&DerivedStats) -> f64| {
        if records.is_empty() {
            0.0
        } else {
            round2(with_stats.iter().map(|(_, _, d)| f(d)).sum::<f64>() / records.len() as f64)
        }
    };
    let averages = RosterAverages {
        win_rate: average(|d| d.win_rate),
        place_rate: average(|d| d.place_rate),
    };

    let to_entry = |(slug, record, d): &(&String, &JockeyRecord, &DerivedStats)| RosterEntry {
        name: record.name.clone(),
        slug: (*slug).clone(),
        win_rate: d.win_rate,
        place_rate: d.place_rate,
        days_since_last_win: d.days_since_last_win,
        recent_form: d.recent_form.clone(),
    };

    let mut in_form: Vec<_> = with_stats
        .iter()
        .filter(|(_, _, d)| policy.hot_form_stats(d))
        .collect();
    in_form.sort_by(|a, b| b.2.place_rate.total_cmp(&a.2.place_rate).then_with(|| a.0.cmp(b.0)));

    let mut due: Vec<_> = with_stats
        .iter()
        .filter(|(_, _, d)| policy.due_for_win_stats(d))
        .collect();
    due.sort_by(|a, b| {
        b.2.days_since_last_win
            .cmp(&a.2.days_since_last_win)
            .then_with(|| a.0.cmp(b.0))
    });

    RosterSummary {
        date_generated: Utc::now(),
        jockey_count: records.len(),
        averages,
        top_in_form_jockeys: in_form
            .into_iter()
            .take(policy.summary_top_n)
            .map(to_entry)
            .collect(),
        due_for_win_jockeys: due
            .into_iter()
            .take(policy.summary_top_n)
            .map(to_entry)
            .collect(),
    }
}

/// Outcome of a classification run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifyReport {
    pub dates: usize,
    pub hot_form: usize,
    pub due_for_win: usize,
    pub global_hot_form: usize,
    pub global_due_for_win: usize,
    /// Per-date files that could not be read or written
    pub skipped_files: usize,
}

/// Classify `dates` (every date with meeting cards when `None`), then
/// rebuild the global lists from all per-date files on disk.
pub fn classify_all(
    jockeys: &JockeyStore,
    venues: &VenueStore,
    summaries: &SummaryStore,
    policy: &ClassificationConfig,
    dates: Option<&[NaiveDate]>,
) -> Result<ClassifyReport, StoreError> {
    let index = JockeyIndex::new(jockeys.load_all()?);
    if index.is_empty() {
        warn!("No jockeys have derived stats yet; lists will be empty");
    } else {
        info!("Classifying against {} jockeys with derived stats", index.len());
    }

    let dates = match dates {
        Some(dates) => dates.to_vec(),
        None => venues.list_dates()?,
    };

    let mut report = ClassifyReport::default();
    for date in dates {
        let meetings = match venues.load_date(date) {
            Ok(meetings) => meetings,
            Err(e) => {
                warn!("Skipping {}: {}", date, e);
                report.skipped_files += 1;
                continue;
            }
        };
        let result = classify_date(date, &meetings, &index, policy);

        let writes = [
            summaries.write_bucket(date, Bucket::HotForm, &result.hot_form),
            summaries.write_bucket(date, Bucket::DueForWin, &result.due_for_win),
            summaries.write_dashboard(&result.dashboard),
        ];
        for e in writes.into_iter().filter_map(Result::err) {
            warn!("{}: {}", date, e);
            report.skipped_files += 1;
        }

        info!(
            "{}: {} meetings, {} hot form, {} due for a win",
            date,
            meetings.len(),
            result.hot_form.len(),
            result.due_for_win.len()
        );
        report.dates += 1;
        report.hot_form += result.hot_form.len();
        report.due_for_win += result.due_for_win.len();
    }

    let processed_dates = summaries.list_dates()?;
    for bucket in Bucket::ALL {
        let mut combined = Vec::new();
        for date in &processed_dates {
            match summaries.load_bucket(*date, bucket) {
                Ok(entries) => combined.extend(entries),
                Err(e) => {
                    warn!("Leaving out of the global {} list: {}", bucket.label(), e);
                    report.skipped_files += 1;
                }
            }
        }
        let global = rank_global(combined, policy.max_results);
        summaries.write_global(bucket, &global)?;
        debug!("Global {} list: {} entries", bucket.label(), global.len());

        match bucket {
            Bucket::HotForm => report.global_hot_form = global.len(),
            Bucket::DueForWin => report.global_due_for_win = global.len(),
        }
    }

    Ok(report)
}
