//! Error types for the liftboard application.

use thiserror::Error;

/// Errors raised by a record store backend.
///
/// All of these are surfaced to API callers as retryable failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("cannot read file: {0}")]
    CannotRead(String),

    #[error("cannot write file: {0}")]
    CannotWrite(String),

    #[error("invalid store format: {0}")]
    InvalidFormat(String),

    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("unsupported store file extension: {0}")]
    UnsupportedExtension(String),
}

impl From<csv::Error> for StoreError {
    fn from(e: csv::Error) -> Self {
        StoreError::CannotRead(e.to_string())
    }
}

/// Errors for a record submission that cannot be accepted.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("submitter name must not be empty")]
    MissingName,

    #[error("unknown exercise: {0}")]
    UnknownExercise(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Error for a calendar month string that is not `YYYY-MM`.
#[derive(Debug, Error)]
#[error("invalid month '{0}', expected YYYY-MM")]
pub struct MonthParseError(pub String);

/// Errors in application configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Epley divisor must be positive: {0}")]
    BadDivisor(f64),

    #[error("retry attempts must be at least 1")]
    NoRetryAttempts,
}
