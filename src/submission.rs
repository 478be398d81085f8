//! Record submissions from the entry form.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::domain::{Exercise, RawRecord};
use crate::error::SubmissionError;

/// A workout submitted through the form.
///
/// `fields` is keyed by exercise id (`bench_press`, `chin_up`, ...) and holds
/// the text exactly as typed, e.g. `80-10` or `15`.
#[derive(Debug, Clone, Deserialize)]
pub struct Submission {
    pub name: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl Submission {
    /// Converts the submission into the row stored in the backing sheet.
    ///
    /// The text of each field is stored as-is; parsing happens at read time.
    pub fn into_raw_record(self, submitted_at: NaiveDateTime) -> Result<RawRecord, SubmissionError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(SubmissionError::MissingName);
        }

        let mut fields = BTreeMap::new();
        for (id, value) in self.fields {
            let exercise =
                Exercise::from_str(&id).map_err(|_| SubmissionError::UnknownExercise(id.clone()))?;
            fields.insert(exercise, value.trim().to_string());
        }

        Ok(RawRecord {
            timestamp: submitted_at.format("%Y/%m/%d %H:%M:%S").to_string(),
            email: self.email.trim().to_string(),
            submitted_by: name.to_string(),
            recorded_on: self.date.format("%Y-%m-%d 00:00:00").to_string(),
            fields,
        })
    }
}
