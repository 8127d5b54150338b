//! Dispatcher configuration.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Tuning knobs for the ingestion dispatcher.
///
/// Defaults carry the production constants: batches of 5, a 30-second idle
/// flush, 60 upstream calls per minute globally, and 5 requests per minute
/// per client.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Batch size cap; reaching it flushes immediately.
    pub batch_size: usize,
    /// Idle flush deadline, measured from a batch's first enqueue.
    pub batch_max_wait: Duration,
    /// Fixed rate-limit window length for both quota tiers.
    pub rate_window: Duration,
    /// Admitted upstream calls per window, all clients combined.
    pub global_call_limit: u32,
    /// Admitted requests per window for a single client identifier.
    pub per_client_limit: u32,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            batch_max_wait: Duration::from_secs(30),
            rate_window: Duration::from_secs(60),
            global_call_limit: 60,
            per_client_limit: 5,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    batch_size: Option<usize>,
    batch_max_wait_secs: Option<u64>,
    rate_window_secs: Option<u64>,
    global_call_limit: Option<u32>,
    per_client_limit: Option<u32>,
}

impl DispatcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_batch_max_wait(mut self, wait: Duration) -> Self {
        self.batch_max_wait = wait;
        self
    }

    pub fn with_rate_window(mut self, window: Duration) -> Self {
        self.rate_window = window;
        self
    }

    pub fn with_global_call_limit(mut self, limit: u32) -> Self {
        self.global_call_limit = limit;
        self
    }

    pub fn with_per_client_limit(mut self, limit: u32) -> Self {
        self.per_client_limit = limit;
        self
    }

    /// Load a configuration from a YAML file, filling unset keys from the
    /// defaults. Accepted keys: `batch_size`, `batch_max_wait_secs`,
    /// `rate_window_secs`, `global_call_limit`, `per_client_limit`.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let raw: RawConfig = serde_yaml::from_str(&text)?;
        let defaults = Self::default();
        let config = Self {
            batch_size: raw.batch_size.unwrap_or(defaults.batch_size),
            batch_max_wait: raw
                .batch_max_wait_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.batch_max_wait),
            rate_window: raw
                .rate_window_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.rate_window),
            global_call_limit: raw.global_call_limit.unwrap_or(defaults.global_call_limit),
            per_client_limit: raw.per_client_limit.unwrap_or(defaults.per_client_limit),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::configuration("batch_size must be at least 1"));
        }
        if self.rate_window.is_zero() {
            return Err(Error::configuration("rate_window must be non-zero"));
        }
        if self.global_call_limit == 0 || self.per_client_limit == 0 {
            return Err(Error::configuration("rate limits must be at least 1"));
        }
        Ok(())
    }
}
