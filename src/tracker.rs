//! Per-exercise progress series for charting.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::{Exercise, Record};
use crate::entry::ExerciseEntry;
use crate::formulas::estimate_1rm;

/// Filter applied when building a progress series.
#[derive(Debug, Clone, Default)]
pub struct ProgressFilter {
    /// Users to include; empty means everyone.
    pub users: Vec<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl ProgressFilter {
    fn accepts(&self, record: &Record) -> bool {
        let user_ok = self.users.is_empty() || self.users.iter().any(|u| *u == record.submitted_by);
        let from_ok = self.from.is_none_or(|d| record.recorded_on >= d);
        let to_ok = self.to.is_none_or(|d| record.recorded_on <= d);
        user_ok && from_ok && to_ok
    }
}

/// One logged set on the progress chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressPoint {
    pub user: String,
    pub date: NaiveDate,
    pub weight_kg: f64,
    pub repetitions: u32,
    /// Absent for reps-only exercises.
    pub estimated_1rm: Option<f64>,
}

/// Builds the progress series for one exercise, sorted by date then user.
///
/// Records with nothing logged for the exercise are skipped.
pub fn progress_series(
    records: &[Record],
    exercise: Exercise,
    filter: &ProgressFilter,
    divisor: f64,
) -> Vec<ProgressPoint> {
    let mut points: Vec<ProgressPoint> = records
        .iter()
        .filter(|r| filter.accepts(r))
        .filter_map(|r| {
            let entry = ExerciseEntry::parse(r.field(exercise));
            if entry.is_empty() {
                return None;
            }
            Some(ProgressPoint {
                user: r.submitted_by.clone(),
                date: r.recorded_on,
                weight_kg: entry.weight_kg,
                repetitions: entry.repetitions,
                estimated_1rm: exercise
                    .has_one_rep_max()
                    .then(|| estimate_1rm(entry.weight_kg, entry.repetitions, divisor)),
            })
        })
        .collect();

    points.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.user.cmp(&b.user)));
    points
}
