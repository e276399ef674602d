//! Provider error kinds.

use crate::types::League;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP 429 that survived every retry.
    #[error("rate limited by ESPN after {attempts} attempts: {url}")]
    RateLimited { attempts: u32, url: String },

    #[error("ESPN returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("ESPN request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("failed to decode ESPN {endpoint} response: {source}")]
    Decode {
        endpoint: &'static str,
        source: serde_json::Error,
    },

    #[error("event {event_id} not found in {league}")]
    EventNotFound { league: League, event_id: String },

    #[error("could not parse date with any known format: {0}")]
    DateParse(String),

    #[error("ESPN response has no {0}")]
    MissingData(&'static str),

    #[error("ESPN request cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Only rate limiting is retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::RateLimited { .. })
    }
}
