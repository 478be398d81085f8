//! Runtime configuration shared by request handlers.

use std::time::Duration;

use crate::error::ConfigError;
use crate::formulas::DEFAULT_EPLEY_DIVISOR;
use crate::store::RetryConfig;

/// Validated analytics and store settings.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Divisor `K` for the Epley 1RM estimate.
    pub epley_divisor: f64,
    /// Retry policy for appending submissions.
    pub retry: RetryConfig,
}

impl AppConfig {
    pub fn new(
        epley_divisor: f64,
        retry_attempts: u32,
        retry_delay: Duration,
    ) -> Result<Self, ConfigError> {
        if !(epley_divisor.is_finite() && epley_divisor > 0.0) {
            return Err(ConfigError::BadDivisor(epley_divisor));
        }
        if retry_attempts == 0 {
            return Err(ConfigError::NoRetryAttempts);
        }

        Ok(Self {
            epley_divisor,
            retry: RetryConfig {
                attempts: retry_attempts,
                delay: retry_delay,
            },
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            epley_divisor: DEFAULT_EPLEY_DIVISOR,
            retry: RetryConfig::default(),
        }
    }
}
