//! Excel (.xlsx) backend for the record store.
//!
//! Reads with calamine and appends with umya-spreadsheet, always on the
//! first worksheet.

use std::path::PathBuf;

use calamine::{Data, Reader, Xlsx, open_workbook};
use umya_spreadsheet::{new_file, reader, writer};

use crate::domain::RawRecord;
use crate::error::StoreError;
use crate::normalize::{ColumnIndices, canonical_header, canonical_row};
use crate::store::RecordStore;

/// Record store kept in the first sheet of an Excel workbook.
#[derive(Debug, Clone)]
pub struct XlsxStore {
    path: PathBuf,
}

impl XlsxStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordStore for XlsxStore {
    /// Loads raw records from the first worksheet.
    ///
    /// # Errors
    /// Returns StoreError if the file cannot be read or lacks the
    /// submitter/date columns.
    fn load(&self) -> Result<Vec<RawRecord>, StoreError> {
        let path = &self.path;

        if !path.exists() {
            return Err(StoreError::FileNotFound(path.display().to_string()));
        }

        let mut workbook: Xlsx<_> = open_workbook(path)
            .map_err(|e| StoreError::CannotRead(format!("{}: {}", path.display(), e)))?;

        let sheet_names = workbook.sheet_names().to_vec();
        let sheet_name = sheet_names
            .first()
            .ok_or_else(|| StoreError::InvalidFormat("workbook has no sheets".to_string()))?;

        let range = workbook.worksheet_range(sheet_name).map_err(|e| {
            StoreError::CannotRead(format!("cannot read sheet '{}': {}", sheet_name, e))
        })?;

        let mut rows = range.rows();

        // An empty sheet is a store with no records yet
        let Some(header) = rows.next() else {
            return Ok(Vec::new());
        };
        let header: Vec<String> = header.iter().map(cell_text).collect();
        let indices = ColumnIndices::from_header(&header)?;

        Ok(rows
            .map(|row| {
                let cells: Vec<String> = row.iter().map(cell_text).collect();
                indices.raw_record(&cells)
            })
            .filter(|raw| !raw.is_blank())
            .collect())
    }

    /// Appends a row below the last used row of the first worksheet.
    fn append(&self, record: &RawRecord) -> Result<(), StoreError> {
        let path = &self.path;

        let mut book = if path.exists() {
            reader::xlsx::read(path)
                .map_err(|e| StoreError::CannotRead(format!("{}: {}", path.display(), e)))?
        } else {
            new_file()
        };

        let sheet = book
            .get_sheet_mut(&0)
            .ok_or_else(|| StoreError::InvalidFormat("workbook has no sheets".to_string()))?;

        let highest_row = sheet.get_highest_row();
        let (cells, target_row) = if highest_row == 0 {
            for (col, title) in canonical_header().into_iter().enumerate() {
                sheet
                    .get_cell_mut((col as u32 + 1, 1))
                    .set_value_string(title);
            }
            (canonical_row(record), 2)
        } else {
            let width = sheet.get_highest_column();
            let header: Vec<String> = (1..=width).map(|col| sheet.get_value((col, 1))).collect();
            let indices = ColumnIndices::from_header(&header)?;
            (indices.row_for(record, header.len()), highest_row + 1)
        };

        for (col, value) in cells.into_iter().enumerate() {
            if !value.is_empty() {
                sheet
                    .get_cell_mut((col as u32 + 1, target_row))
                    .set_value_string(value);
            }
        }

        writer::xlsx::write(&book, path)
            .map_err(|e| StoreError::CannotWrite(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }
}

/// Renders a cell as the text the form would have written.
///
/// Numeric reps-only cells come back as floats; `15.0` renders as `15`.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|ndt| ndt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}
