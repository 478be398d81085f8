//! CSV file backend for the record store.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use log::debug;

use crate::domain::RawRecord;
use crate::error::StoreError;
use crate::normalize::{ColumnIndices, canonical_header, canonical_row};
use crate::store::RecordStore;

const BOM: &str = "\u{feff}";

/// Record store kept in a CSV file with a header row.
#[derive(Debug, Clone)]
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_text(&self) -> Result<String, StoreError> {
        if !self.path.exists() {
            return Err(StoreError::FileNotFound(self.path.display().to_string()));
        }
        fs::read_to_string(&self.path)
            .map_err(|e| StoreError::CannotRead(format!("{}: {}", self.path.display(), e)))
    }
}

fn reader(text: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.strip_prefix(BOM).unwrap_or(text).as_bytes())
}

impl RecordStore for CsvStore {
    fn load(&self) -> Result<Vec<RawRecord>, StoreError> {
        let text = self.read_text()?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut rdr = reader(&text);
        let header: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let indices = ColumnIndices::from_header(&header)?;

        let mut records = Vec::new();
        for (idx, line) in rdr.records().enumerate() {
            let line = line?;
            let cells: Vec<&str> = line.iter().collect();
            let raw = indices.raw_record(&cells);
            if raw.is_blank() {
                continue;
            }
            debug!("{}: row {} {:?}", self.path.display(), idx + 2, raw.submitted_by);
            records.push(raw);
        }

        Ok(records)
    }

    fn append(&self, record: &RawRecord) -> Result<(), StoreError> {
        let existing = if self.path.exists() {
            self.read_text()?
        } else {
            String::new()
        };

        let write_err = |e: std::io::Error| {
            StoreError::CannotWrite(format!("{}: {}", self.path.display(), e))
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(write_err)?;

        let row = if existing.trim().is_empty() {
            let mut wtr = csv::WriterBuilder::new().from_writer(Vec::new());
            wtr.write_record(canonical_header())
                .map_err(|e| StoreError::CannotWrite(e.to_string()))?;
            let header = wtr
                .into_inner()
                .map_err(|e| StoreError::CannotWrite(e.to_string()))?;
            file.write_all(&header).map_err(write_err)?;
            canonical_row(record)
        } else {
            if !existing.ends_with('\n') {
                file.write_all(b"\n").map_err(write_err)?;
            }
            let mut rdr = reader(&existing);
            let header: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
            ColumnIndices::from_header(&header)?.row_for(record, header.len())
        };

        let mut wtr = csv::WriterBuilder::new().from_writer(file);
        wtr.write_record(&row)
            .map_err(|e| StoreError::CannotWrite(e.to_string()))?;
        wtr.flush().map_err(write_err)?;

        Ok(())
    }
}
