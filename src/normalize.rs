//! Canonical normalization of store rows.
//!
//! Every view goes through the same steps: header names are mapped to
//! columns, rows become [`RawRecord`]s (absent exercise columns read as
//! empty), and raw records become [`Record`]s with a parsed date. Rows with
//! no usable date or submitter are dropped here, once.

use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, warn};

use crate::domain::{Exercise, RawRecord, Record};
use crate::error::StoreError;

pub const COL_TIMESTAMP: &str = "タイムスタンプ";
pub const COL_EMAIL: &str = "メールアドレス";
pub const COL_NAME: &str = "記入者名";
pub const COL_DATE: &str = "記録日";

const TIMESTAMP_ALIASES: &[&str] = &[COL_TIMESTAMP, "timestamp"];
const EMAIL_ALIASES: &[&str] = &[COL_EMAIL, "email"];
const NAME_ALIASES: &[&str] = &[COL_NAME, "name", "submitted_by"];
const DATE_ALIASES: &[&str] = &[COL_DATE, "date", "recorded_on"];

/// Header row written to new stores and exports, in column order.
pub fn canonical_header() -> Vec<&'static str> {
    let mut header = vec![COL_TIMESTAMP, COL_EMAIL, COL_NAME, COL_DATE];
    header.extend(Exercise::all().iter().map(|e| e.column_header()));
    header
}

/// Flattens a raw record into cells matching [`canonical_header`].
pub fn canonical_row(record: &RawRecord) -> Vec<String> {
    let mut row = vec![
        record.timestamp.clone(),
        record.email.clone(),
        record.submitted_by.clone(),
        record.recorded_on.clone(),
    ];
    row.extend(Exercise::all().iter().map(|e| record.field(*e).to_string()));
    row
}

/// Column positions resolved from a header row.
#[derive(Debug, Clone)]
pub struct ColumnIndices {
    timestamp: Option<usize>,
    email: Option<usize>,
    name: usize,
    date: usize,
    exercises: Vec<(Exercise, usize)>,
}

impl ColumnIndices {
    /// Resolves columns from header cells.
    ///
    /// The submitter and date columns are required; everything else is
    /// optional.
    pub fn from_header<S: AsRef<str>>(header: &[S]) -> Result<Self, StoreError> {
        let find_alias = |aliases: &[&str]| -> Option<usize> {
            header.iter().position(|cell| {
                let cell = strip_bom(cell.as_ref()).trim();
                aliases.iter().any(|a| cell.eq_ignore_ascii_case(a))
            })
        };

        let name = find_alias(NAME_ALIASES)
            .ok_or_else(|| StoreError::MissingColumn(COL_NAME.to_string()))?;
        let date = find_alias(DATE_ALIASES)
            .ok_or_else(|| StoreError::MissingColumn(COL_DATE.to_string()))?;

        let exercises = Exercise::all()
            .iter()
            .filter_map(|e| {
                header
                    .iter()
                    .position(|cell| e.matches_header(strip_bom(cell.as_ref())))
                    .map(|idx| (*e, idx))
            })
            .collect();

        Ok(Self {
            timestamp: find_alias(TIMESTAMP_ALIASES),
            email: find_alias(EMAIL_ALIASES),
            name,
            date,
            exercises,
        })
    }

    /// Builds a raw record from one row of cells.
    ///
    /// Short rows are padded with empty cells.
    pub fn raw_record<S: AsRef<str>>(&self, row: &[S]) -> RawRecord {
        let cell = |idx: usize| {
            row.get(idx)
                .map(|c| c.as_ref().to_string())
                .unwrap_or_default()
        };

        RawRecord {
            timestamp: self.timestamp.map(cell).unwrap_or_default(),
            email: self.email.map(cell).unwrap_or_default(),
            submitted_by: cell(self.name),
            recorded_on: cell(self.date),
            fields: self.exercises.iter().map(|(e, idx)| (*e, cell(*idx))).collect(),
        }
    }

    /// Lays a raw record out in this header's column order.
    ///
    /// Used when appending to a store whose header is not the canonical one.
    /// Fields for exercises the header lacks are dropped.
    pub fn row_for(&self, record: &RawRecord, width: usize) -> Vec<String> {
        let mut row = vec![String::new(); width];
        let mut put = |idx: Option<usize>, value: &str| {
            if let Some(slot) = idx.and_then(|i| row.get_mut(i)) {
                *slot = value.to_string();
            }
        };

        put(self.timestamp, &record.timestamp);
        put(self.email, &record.email);
        put(Some(self.name), &record.submitted_by);
        put(Some(self.date), &record.recorded_on);
        for (exercise, idx) in &self.exercises {
            put(Some(*idx), record.field(*exercise));
        }
        for exercise in record.fields.keys() {
            if !self.exercises.iter().any(|(e, _)| e == exercise) && !record.field(*exercise).is_empty() {
                warn!("store has no column for {}, value dropped", exercise.id());
            }
        }
        row
    }
}

fn strip_bom(s: &str) -> &str {
    s.strip_prefix('\u{feff}').unwrap_or(s)
}

/// Parses a record date.
///
/// Accepts the formats the form and spreadsheets produce: ISO dates, with or
/// without a time of day, using `-` or `/`.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M",
    ];

    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(value, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
                .map(|dt| dt.date())
        })
}

/// Converts raw records into analytics records.
///
/// Drops rows whose date does not parse or whose submitter is blank; every
/// record returned has all exercise fields present.
pub fn normalize(raw: &[RawRecord]) -> Vec<Record> {
    raw.iter()
        .enumerate()
        .filter_map(|(idx, r)| {
            if r.is_blank() {
                return None;
            }

            let Some(date) = parse_date(&r.recorded_on) else {
                debug!("row {}: unparseable date '{}', skipped", idx + 1, r.recorded_on);
                return None;
            };

            let name = r.submitted_by.trim();
            if name.is_empty() {
                debug!("row {}: no submitter, skipped", idx + 1);
                return None;
            }

            Some(Record::new(
                name,
                date,
                r.fields.iter().map(|(e, v)| (*e, v.trim().to_string())),
            ))
        })
        .collect()
}
