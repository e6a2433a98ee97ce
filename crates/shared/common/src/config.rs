//! Shared configuration structures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Hosted backend connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Project base URL (e.g., "https://xyzcompany.supabase.co")
    pub url: String,
    /// Public API key sent with every request
    #[serde(skip_serializing)]
    pub anon_key: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl BackendConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            ..Self::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            request_timeout_ms: 30_000,
        }
    }
}

/// Query cache tunables.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryCacheConfig {
    /// How long a successful result counts as fresh
    pub stale_time_ms: u64,
    /// Extra attempts for a read that failed with a transient error
    pub read_retries: u32,
    /// Delay between read attempts
    pub retry_delay_ms: u64,
}

impl QueryCacheConfig {
    pub fn stale_time(&self) -> Duration {
        Duration::from_millis(self.stale_time_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for QueryCacheConfig {
    fn default() -> Self {
        Self {
            stale_time_ms: 5 * 60 * 1000,
            read_retries: 1,
            retry_delay_ms: 500,
        }
    }
}
