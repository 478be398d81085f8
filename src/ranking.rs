//! Leaderboards and monthly growth rankings.
//!
//! All functions here are pure: they take the current record set and return
//! freshly built tables. Equal values are ordered by user name ascending, and
//! ranks are positions 1..N.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::{Exercise, Month, Record};
use crate::entry::ExerciseEntry;
use crate::formulas::estimate_1rm;

/// One row of the all-time best 1RM leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user: String,
    pub estimated_1rm: f64,
}

/// One row of the monthly growth ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthEntry {
    pub rank: usize,
    pub user: String,
    pub start_best: f64,
    pub end_best: f64,
    pub growth_kg: f64,
    pub growth_pct: f64,
}

/// Yields `(user, date, estimated 1RM)` for every record.
///
/// Reps-only exercises yield nothing.
fn estimates<'a>(
    records: &'a [Record],
    exercise: Exercise,
    divisor: f64,
) -> impl Iterator<Item = (&'a str, NaiveDate, f64)> + 'a {
    records
        .iter()
        .filter(move |_| exercise.has_one_rep_max())
        .map(move |r| {
            let entry = ExerciseEntry::parse(r.field(exercise));
            (
                r.submitted_by.as_str(),
                r.recorded_on,
                estimate_1rm(entry.weight_kg, entry.repetitions, divisor),
            )
        })
}

/// Sorts `(user, value)` pairs by value descending.
///
/// Input comes out of a `BTreeMap`, so it is already in name order and the
/// stable sort keeps ties alphabetical.
fn sort_descending<T>(rows: &mut [T], value: impl Fn(&T) -> f64) {
    rows.sort_by(|a, b| value(b).total_cmp(&value(a)));
}

/// Builds the all-time estimated 1RM leaderboard for one exercise.
///
/// Each user appears once with their best estimate. Users whose best is 0
/// (no usable weighted set) are left out.
pub fn leaderboard(records: &[Record], exercise: Exercise, divisor: f64) -> Vec<LeaderboardEntry> {
    let mut best: BTreeMap<&str, f64> = BTreeMap::new();
    for (user, _, e1rm) in estimates(records, exercise, divisor) {
        let slot = best.entry(user).or_insert(0.0);
        *slot = slot.max(e1rm);
    }

    let mut rows: Vec<(&str, f64)> = best.into_iter().filter(|(_, v)| *v > 0.0).collect();
    sort_descending(&mut rows, |r| r.1);

    rows.into_iter()
        .enumerate()
        .map(|(i, (user, estimated_1rm))| LeaderboardEntry {
            rank: i + 1,
            user: user.to_string(),
            estimated_1rm,
        })
        .collect()
}

/// Builds the growth ranking for one exercise over a calendar month.
///
/// For each user, `start_best` is the best estimate dated strictly before
/// the first day of `month` and `end_best` the best dated on or before its
/// last day. Only users who improved from a non-zero start are ranked, by
/// percentage growth. Rows whose growth is not finite are dropped.
pub fn growth_ranking(
    records: &[Record],
    exercise: Exercise,
    month: Month,
    divisor: f64,
) -> Vec<GrowthEntry> {
    let start = month.first_day();
    let end = month.last_day();

    let mut bests: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
    for (user, date, e1rm) in estimates(records, exercise, divisor) {
        let (start_best, end_best) = bests.entry(user).or_insert((0.0, 0.0));
        if date < start {
            *start_best = start_best.max(e1rm);
        }
        if date <= end {
            *end_best = end_best.max(e1rm);
        }
    }

    let mut rows: Vec<GrowthEntry> = bests
        .into_iter()
        .filter(|(_, (start_best, end_best))| end_best > start_best && *start_best > 0.0)
        .map(|(user, (start_best, end_best))| {
            let growth_kg = end_best - start_best;
            GrowthEntry {
                rank: 0,
                user: user.to_string(),
                start_best,
                end_best,
                growth_kg,
                growth_pct: growth_kg / start_best * 100.0,
            }
        })
        .filter(|row| row.growth_kg.is_finite() && row.growth_pct.is_finite())
        .collect();

    sort_descending(&mut rows, |r| r.growth_pct);
    for (i, row) in rows.iter_mut().enumerate() {
        row.rank = i + 1;
    }
    rows
}

/// Months that contain at least one record, newest first.
pub fn available_months(records: &[Record]) -> Vec<Month> {
    let months: BTreeSet<Month> = records.iter().map(|r| Month::of(r.recorded_on)).collect();
    months.into_iter().rev().collect()
}

/// Distinct submitter names in ascending order.
pub fn users(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.submitted_by.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
