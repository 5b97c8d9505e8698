//! Market-data source configuration

use crate::constants::DEFAULT_REQUEST_TIMEOUT_SECS;
use serde::{Deserialize, Serialize};

/// Public REST endpoint of the market-data source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceEndpoint {
    /// Base URL, without trailing slash
    pub base_url: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for SourceEndpoint {
    fn default() -> Self {
        Self {
            base_url: "https://api.kraken.com".to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl SourceEndpoint {
    /// Endpoint pointing at a custom base URL
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Full URL of the recent-trades resource
    #[must_use]
    pub fn trades_url(&self) -> String {
        format!("{}/0/public/Trades", self.base_url.trim_end_matches('/'))
    }
}
