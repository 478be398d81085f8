//! CSV backup export of all raw records.

use chrono::NaiveDate;

use crate::domain::RawRecord;
use crate::normalize::{canonical_header, canonical_row};

/// UTF-8 byte order mark; lets spreadsheet software detect the encoding of
/// Japanese names.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Serializes every raw record, unfiltered, as BOM-prefixed UTF-8 CSV.
pub fn export_csv(records: &[RawRecord]) -> Result<Vec<u8>, csv::Error> {
    let mut wtr = csv::Writer::from_writer(UTF8_BOM.to_vec());
    wtr.write_record(canonical_header())?;
    for record in records {
        wtr.write_record(canonical_row(record))?;
    }
    wtr.into_inner().map_err(|e| e.into_error().into())
}

/// Download file name for a backup taken on `date`.
pub fn backup_file_name(date: NaiveDate) -> String {
    format!("training_log_backup_{}.csv", date.format("%Y%m%d"))
}
