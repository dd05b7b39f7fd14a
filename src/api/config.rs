use std::time::Duration;

use crate::api::{error::ApiError, query::BatchWidth};

pub const DEFAULT_API_URL: &str = "https://api.start.gg/gql/alpha";
const MIN_TIMEOUT_SECONDS: u64 = 5;

/// Configuration for the start.gg client
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// GraphQL endpoint
    pub url: String,
    /// Bearer token
    pub key: String,
    /// Per-request timeout, never below five seconds
    pub timeout: Duration,
    /// Bound on timeout and connection-failure retries per request
    pub max_retries: u32,
    /// Events multiplexed per entrant request
    pub event_batch_width: BatchWidth,
    /// Entrants multiplexed per set request
    pub entrant_batch_width: BatchWidth,
    pub entrant_page_size: u32,
    pub set_page_size: u32
}

impl ApiConfig {
    pub fn new(url: String, key: String, timeout_seconds: u64, max_retries: u32) -> ApiConfig {
        ApiConfig {
            url,
            key,
            timeout: Duration::from_secs(timeout_seconds.max(MIN_TIMEOUT_SECONDS)),
            max_retries,
            ..ApiConfig::default()
        }
    }

    pub fn with_batch_widths(mut self, events: usize, entrants: usize) -> Result<Self, ApiError> {
        self.event_batch_width = BatchWidth::new(events)?;
        self.entrant_batch_width = BatchWidth::new(entrants)?;
        Ok(self)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_API_URL.to_string(),
            key: String::new(),
            timeout: Duration::from_secs(60),
            max_retries: 5,
            event_batch_width: BatchWidth::EVENTS,
            entrant_batch_width: BatchWidth::ENTRANTS,
            entrant_page_size: 100,
            set_page_size: 20
        }
    }
}
