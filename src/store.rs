//! Backing store for raw workout records.
//!
//! The store only ever reads the full table or appends one row. Analytics
//! never see the store directly; handlers load a snapshot and hand it to the
//! pure ranking functions.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::csv_store::CsvStore;
use crate::domain::RawRecord;
use crate::error::StoreError;
use crate::excel::XlsxStore;

/// A tabular store of raw records.
pub trait RecordStore: Send + Sync {
    /// Reads every row, in file order.
    fn load(&self) -> Result<Vec<RawRecord>, StoreError>;

    /// Appends a single row.
    fn append(&self, record: &RawRecord) -> Result<(), StoreError>;
}

/// Opens the store backend matching the file extension.
pub fn open_store(path: &Path) -> Result<Arc<dyn RecordStore>, StoreError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "csv" => Ok(Arc::new(CsvStore::new(path))),
        "xlsx" => Ok(Arc::new(XlsxStore::new(path))),
        other => Err(StoreError::UnsupportedExtension(other.to_string())),
    }
}

/// Configuration for retrying store appends.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first (default: 3).
    pub attempts: u32,
    /// Fixed delay between attempts (default: 500ms).
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

/// Loads every row, treating a store file that does not exist yet as empty.
///
/// The first append creates the file.
pub fn load_or_empty(store: &dyn RecordStore) -> Result<Vec<RawRecord>, StoreError> {
    match store.load() {
        Err(StoreError::FileNotFound(path)) => {
            log::debug!("Store {} not created yet", path);
            Ok(Vec::new())
        }
        other => other,
    }
}

/// Loads all raw records on the blocking pool.
pub async fn load_records(store: Arc<dyn RecordStore>) -> Result<Vec<RawRecord>, StoreError> {
    tokio::task::spawn_blocking(move || load_or_empty(store.as_ref()))
        .await
        .map_err(|e| StoreError::CannotRead(format!("load task failed: {}", e)))?
}

/// Appends a record, retrying transient failures.
///
/// Gives up after `config.attempts` failures and returns the last error.
pub async fn append_with_retry(
    store: Arc<dyn RecordStore>,
    record: RawRecord,
    config: &RetryConfig,
) -> Result<(), StoreError> {
    let attempts = config.attempts.max(1);
    let mut last_error = None;

    for attempt in 0..attempts {
        let store = store.clone();
        let row = record.clone();
        let result = tokio::task::spawn_blocking(move || store.append(&row))
            .await
            .unwrap_or_else(|e| Err(StoreError::CannotWrite(format!("append task failed: {}", e))));

        match result {
            Ok(()) => {
                if attempt > 0 {
                    log::info!("Append succeeded on attempt {}", attempt + 1);
                }
                return Ok(());
            }
            Err(e) => {
                log::warn!("Append attempt {} failed: {}", attempt + 1, e);
                last_error = Some(e);
                if attempt + 1 < attempts {
                    tokio::time::sleep(config.delay).await;
                }
            }
        }
    }

    let e = last_error.unwrap_or_else(|| StoreError::CannotWrite("no attempts made".into()));
    log::error!("Failed to append record after {} attempts: {}", attempts, e);
    Err(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Store that fails a fixed number of appends before succeeding.
    struct FlakyStore {
        failures_left: AtomicU32,
        calls: AtomicU32,
        rows: Mutex<Vec<RawRecord>>,
    }

    impl FlakyStore {
        fn new(failures: u32) -> Self {
            Self {
                failures_left: AtomicU32::new(failures),
                calls: AtomicU32::new(0),
                rows: Mutex::new(Vec::new()),
            }
        }
    }

    impl RecordStore for FlakyStore {
        fn load(&self) -> Result<Vec<RawRecord>, StoreError> {
            Ok(self.rows.lock().unwrap().clone())
        }

        fn append(&self, record: &RawRecord) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(StoreError::CannotWrite("quota exceeded".into()));
            }
            self.rows.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    fn fast_retry(attempts: u32) -> RetryConfig {
        RetryConfig {
            attempts,
            delay: Duration::from_millis(1),
        }
    }

    fn record(name: &str) -> RawRecord {
        RawRecord {
            submitted_by: name.to_string(),
            recorded_on: "2025-06-01".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.attempts, 3);
        assert_eq!(config.delay, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_append_succeeds_after_transient_failures() {
        let store = Arc::new(FlakyStore::new(2));
        let result = append_with_retry(store.clone(), record("Alice"), &fast_retry(3)).await;
        assert!(result.is_ok());
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_append_gives_up_after_attempts() {
        let store = Arc::new(FlakyStore::new(10));
        let result = append_with_retry(store.clone(), record("Alice"), &fast_retry(3)).await;
        assert!(matches!(result, Err(StoreError::CannotWrite(_))));
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_append_first_try_no_retry() {
        let store = Arc::new(FlakyStore::new(0));
        append_with_retry(store.clone(), record("Bob"), &fast_retry(3))
            .await
            .unwrap();
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_load_records() {
        let store = Arc::new(FlakyStore::new(0));
        store.append(&record("Alice")).unwrap();
        let rows = load_records(store).await.unwrap();
        assert_eq!(rows[0].submitted_by, "Alice");
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty_until_first_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.csv");
        let store = open_store(&path).unwrap();

        assert!(load_or_empty(store.as_ref()).unwrap().is_empty());
        assert!(load_records(store.clone()).await.unwrap().is_empty());

        append_with_retry(store.clone(), record("Alice"), &fast_retry(1))
            .await
            .unwrap();
        let rows = load_records(store).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].submitted_by, "Alice");
    }

    #[test]
    fn test_load_or_empty_keeps_other_errors() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be cannot be read
        let path = dir.path().join("log.csv");
        std::fs::create_dir(&path).unwrap();
        let store = open_store(&path).unwrap();
        assert!(matches!(
            load_or_empty(store.as_ref()),
            Err(StoreError::CannotRead(_))
        ));
    }

    #[test]
    fn test_open_store_by_extension() {
        assert!(open_store(&PathBuf::from("log.csv")).is_ok());
        assert!(open_store(&PathBuf::from("log.XLSX")).is_ok());
        assert!(matches!(
            open_store(&PathBuf::from("log.txt")),
            Err(StoreError::UnsupportedExtension(_))
        ));
    }
}
