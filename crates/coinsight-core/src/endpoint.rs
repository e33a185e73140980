//! Endpoint registry: named upstream URLs with enable flags and call statistics.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::UtcDateTime;

pub const BACKEND_DOMINANCE: &str = "BACKEND_DOMINANCE";
pub const BACKEND_MARKETS: &str = "BACKEND_MARKETS";
pub const BACKEND_COINS: &str = "BACKEND_COINS";
pub const COINGECKO_GLOBAL: &str = "COINGECKO_GLOBAL";
pub const COINGECKO_MARKETS: &str = "COINGECKO_MARKETS";
pub const COINGECKO_COINS: &str = "COINGECKO_COINS";

/// Per-endpoint call bookkeeping. Counts attempts, not successes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointStats {
    pub call_count: u64,
    pub last_called_at: Option<UtcDateTime>,
    pub error_count: u64,
    pub last_error: Option<String>,
}

/// Registry entry for one upstream endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDescriptor {
    pub id: String,
    pub url: String,
    pub enabled: bool,
    pub stats: Option<EndpointStats>,
}

impl EndpointDescriptor {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            enabled: true,
            stats: None,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Endpoint lookup and statistics sink consumed by the dispatcher.
pub trait EndpointRegistry: Send + Sync {
    /// Returns a snapshot of the endpoint registered under `key`.
    fn endpoint(&self, key: &str) -> Option<EndpointDescriptor>;

    fn is_endpoint_enabled(&self, key: &str) -> bool {
        self.endpoint(key).is_some_and(|endpoint| endpoint.enabled)
    }

    /// Bumps the call counter and stamps the attempt time.
    fn record_attempt(&self, key: &str, at: UtcDateTime);

    /// Bumps the error counter and stores the failure message.
    fn record_error(&self, key: &str, message: &str);
}

/// Process-local registry guarded by a read/write lock.
#[derive(Debug, Default)]
pub struct InMemoryEndpointRegistry {
    endpoints: RwLock<BTreeMap<String, EndpointDescriptor>>,
}

impl InMemoryEndpointRegistry {
    pub fn new(endpoints: impl IntoIterator<Item = EndpointDescriptor>) -> Self {
        let endpoints = endpoints
            .into_iter()
            .map(|endpoint| (endpoint.id.clone(), endpoint))
            .collect();
        Self {
            endpoints: RwLock::new(endpoints),
        }
    }

    /// Registry preloaded with the backend proxy and market-data endpoints.
    pub fn with_defaults(config: &ClientConfig) -> Self {
        Self::new(default_endpoints(config))
    }

    pub fn register(&self, endpoint: EndpointDescriptor) {
        let mut endpoints = self.endpoints.write().unwrap_or_else(PoisonError::into_inner);
        endpoints.insert(endpoint.id.clone(), endpoint);
    }

    /// Returns false when no endpoint is registered under `key`.
    pub fn set_enabled(&self, key: &str, enabled: bool) -> bool {
        let mut endpoints = self.endpoints.write().unwrap_or_else(PoisonError::into_inner);
        match endpoints.get_mut(key) {
            Some(endpoint) => {
                endpoint.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn stats(&self, key: &str) -> Option<EndpointStats> {
        self.endpoint(key).and_then(|endpoint| endpoint.stats)
    }

    /// All endpoints ordered by key.
    pub fn snapshot(&self) -> Vec<EndpointDescriptor> {
        let endpoints = self.endpoints.read().unwrap_or_else(PoisonError::into_inner);
        endpoints.values().cloned().collect()
    }

    fn with_stats(&self, key: &str, update: impl FnOnce(&mut EndpointStats)) {
        let mut endpoints = self.endpoints.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(endpoint) = endpoints.get_mut(key) {
            update(endpoint.stats.get_or_insert_with(EndpointStats::default));
        }
    }
}

impl EndpointRegistry for InMemoryEndpointRegistry {
    fn endpoint(&self, key: &str) -> Option<EndpointDescriptor> {
        let endpoints = self.endpoints.read().unwrap_or_else(PoisonError::into_inner);
        endpoints.get(key).cloned()
    }

    fn record_attempt(&self, key: &str, at: UtcDateTime) {
        self.with_stats(key, |stats| {
            stats.call_count = stats.call_count.saturating_add(1);
            stats.last_called_at = Some(at);
        });
    }

    fn record_error(&self, key: &str, message: &str) {
        self.with_stats(key, |stats| {
            stats.error_count = stats.error_count.saturating_add(1);
            stats.last_error = Some(message.to_owned());
        });
    }
}

pub fn default_endpoints(config: &ClientConfig) -> Vec<EndpointDescriptor> {
    let backend = config.backend_url.trim_end_matches('/');
    let coingecko = config.coingecko_url.trim_end_matches('/');

    vec![
        EndpointDescriptor::new(BACKEND_DOMINANCE, format!("{backend}/dominance")),
        EndpointDescriptor::new(BACKEND_MARKETS, format!("{backend}/markets")),
        EndpointDescriptor::new(BACKEND_COINS, format!("{backend}/coins")),
        EndpointDescriptor::new(COINGECKO_GLOBAL, format!("{coingecko}/global")),
        EndpointDescriptor::new(COINGECKO_MARKETS, format!("{coingecko}/coins/markets")),
        EndpointDescriptor::new(COINGECKO_COINS, format!("{coingecko}/coins")),
    ]
}
