use std::time::Duration;

use derive_setters::Setters;
use serde::{Deserialize, Serialize};

/// Backoff policy applied around a single turn. Disabled unless
/// `max_retry_attempts` is non-zero.
#[derive(Debug, Clone, Serialize, Deserialize, Setters, PartialEq)]
#[serde(rename_all = "snake_case")]
#[setters(into)]
pub struct RetryConfig {
    /// Minimum delay in milliseconds between retry attempts
    pub min_delay_ms: u64,

    /// Backoff multiplication factor for each retry attempt
    pub backoff_factor: u64,

    /// Maximum number of retry attempts
    pub max_retry_attempts: usize,

    /// HTTP status codes that should trigger retries
    pub retry_status_codes: Vec<u16>,

    /// Maximum delay between retries in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay: Option<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 1000,
            backoff_factor: 2,
            max_retry_attempts: 0,
            retry_status_codes: vec![429, 500, 502, 503, 504, 408],
            max_delay: None,
        }
    }
}

impl RetryConfig {
    pub fn is_enabled(&self) -> bool {
        self.max_retry_attempts > 0
    }

    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub fn max_backoff(&self) -> Option<Duration> {
        self.max_delay.map(Duration::from_secs)
    }
}
