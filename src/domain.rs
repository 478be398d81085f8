//! Domain types for workout records.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::MonthParseError;

/// Exercises that can be logged on the submission form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Exercise {
    BenchPress,
    Deadlift,
    Squat,
    LatPulldown,
    ChinUp,
    ShoulderPress,
    LegPress,
    LegPress45,
}

impl Exercise {
    /// Returns all exercise variants, in form order.
    pub fn all() -> &'static [Exercise] {
        &[
            Exercise::BenchPress,
            Exercise::Deadlift,
            Exercise::Squat,
            Exercise::LatPulldown,
            Exercise::ChinUp,
            Exercise::ShoulderPress,
            Exercise::LegPress,
            Exercise::LegPress45,
        ]
    }

    /// Stable identifier used in URLs and English headers.
    pub fn id(&self) -> &'static str {
        match self {
            Exercise::BenchPress => "bench_press",
            Exercise::Deadlift => "deadlift",
            Exercise::Squat => "squat",
            Exercise::LatPulldown => "lat_pulldown",
            Exercise::ChinUp => "chin_up",
            Exercise::ShoulderPress => "shoulder_press",
            Exercise::LegPress => "leg_press",
            Exercise::LegPress45 => "leg_press_45",
        }
    }

    /// Returns the display name for the exercise.
    pub fn display_name(&self) -> &'static str {
        match self {
            Exercise::BenchPress => "ベンチプレス",
            Exercise::Deadlift => "デッドリフト",
            Exercise::Squat => "スクワット",
            Exercise::LatPulldown => "ラットプルダウン",
            Exercise::ChinUp => "懸垂",
            Exercise::ShoulderPress => "マシンショルダープレス",
            Exercise::LegPress => "レッグプレス",
            Exercise::LegPress45 => "45°レッグプレス",
        }
    }

    /// Column header written by the submission form.
    pub fn column_header(&self) -> &'static str {
        match self {
            Exercise::BenchPress => "ベンチプレス(kg × 回数)",
            Exercise::Deadlift => "デッドリフト(kg × 回数)",
            Exercise::Squat => "スクワット(kg × 回数)",
            Exercise::LatPulldown => "ラットプルダウン(kg × 回数)",
            Exercise::ChinUp => "懸垂(回数)",
            Exercise::ShoulderPress => "マシンショルダープレス(kg × 回数)",
            Exercise::LegPress => "レッグプレス(kg × 回数)",
            Exercise::LegPress45 => "45°レッグプレス(kg × 回数)",
        }
    }

    /// Whether the exercise is logged as reps only.
    pub fn is_reps_only(&self) -> bool {
        matches!(self, Exercise::ChinUp)
    }

    /// Whether an estimated 1RM is meaningful for this exercise.
    pub fn has_one_rep_max(&self) -> bool {
        !self.is_reps_only()
    }

    /// Matches a store header against this exercise's known spellings.
    pub fn matches_header(&self, header: &str) -> bool {
        let header = header.trim();
        header == self.column_header()
            || header == self.display_name()
            || header.eq_ignore_ascii_case(self.id())
    }
}

impl FromStr for Exercise {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Exercise::all()
            .iter()
            .copied()
            .find(|e| e.id().eq_ignore_ascii_case(s) || e.display_name() == s)
            .ok_or_else(|| format!("unknown exercise: {}", s))
    }
}

impl std::fmt::Display for Exercise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A row as it is kept in the backing store.
///
/// Raw records are never edited; new submissions are appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub timestamp: String,
    pub email: String,
    pub submitted_by: String,
    pub recorded_on: String,
    pub fields: BTreeMap<Exercise, String>,
}

impl RawRecord {
    /// Returns the raw text for an exercise, empty if absent.
    pub fn field(&self, exercise: Exercise) -> &str {
        self.fields.get(&exercise).map(String::as_str).unwrap_or("")
    }

    /// True when every column is blank.
    pub fn is_blank(&self) -> bool {
        self.timestamp.trim().is_empty()
            && self.email.trim().is_empty()
            && self.submitted_by.trim().is_empty()
            && self.recorded_on.trim().is_empty()
            && self.fields.values().all(|v| v.trim().is_empty())
    }
}

/// A normalized record ready for analytics.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub submitted_by: String,
    pub recorded_on: NaiveDate,
    pub fields: BTreeMap<Exercise, String>,
}

impl Record {
    /// Creates a record; exercises not given are stored as empty fields.
    pub fn new(
        submitted_by: impl Into<String>,
        recorded_on: NaiveDate,
        fields: impl IntoIterator<Item = (Exercise, String)>,
    ) -> Self {
        let mut all: BTreeMap<Exercise, String> =
            Exercise::all().iter().map(|e| (*e, String::new())).collect();
        all.extend(fields);
        Self {
            submitted_by: submitted_by.into(),
            recorded_on,
            fields: all,
        }
    }

    /// Returns the raw text for an exercise.
    pub fn field(&self, exercise: Exercise) -> &str {
        self.fields.get(&exercise).map(String::as_str).unwrap_or("")
    }
}

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    /// The month containing `date`.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        let (y, m) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(y, m, 1)
            .and_then(|d| d.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }
}

impl FromStr for Month {
    type Err = MonthParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || MonthParseError(s.to_string());
        let (y, m) = s.trim().split_once('-').ok_or_else(err)?;
        let year: i32 = y.parse().map_err(|_| err())?;
        let month: u32 = m.parse().map_err(|_| err())?;
        Month::new(year, month).ok_or_else(err)
    }
}

impl std::fmt::Display for Month {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for Month {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
