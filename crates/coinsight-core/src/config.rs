//! Client configuration.
//!
//! # Environment Variables
//!
//! | Setting | Env Var | Default |
//! |---------|---------|---------|
//! | Backend proxy base URL | `COINSIGHT_BACKEND_URL` | `http://localhost:3000/api` |
//! | Market-data API base URL | `COINSIGHT_COINGECKO_URL` | `https://api.coingecko.com/api/v3` |
//! | Default call timeout | `COINSIGHT_TIMEOUT_MS` | `30000` |
//! | Data home (policy snapshots) | `COINSIGHT_HOME` | `$HOME/.coinsight` |

use std::env;
use std::path::PathBuf;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:3000/api";
pub const DEFAULT_COINGECKO_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub backend_url: String,
    pub coingecko_url: String,
    pub timeout_ms: u64,
    pub home: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: String::from(DEFAULT_BACKEND_URL),
            coingecko_url: String::from(DEFAULT_COINGECKO_URL),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            home: resolve_home(),
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Defaults overridden by any `COINSIGHT_*` variables that are set.
    pub fn from_env() -> Self {
        ClientConfigBuilder::default().with_env().build()
    }

    /// Directory holding persisted key-value entries.
    pub fn store_dir(&self) -> PathBuf {
        self.home.join("store")
    }
}

/// Builder for [`ClientConfig`].
///
/// ```rust,ignore
/// let config = ClientConfig::builder()
///     .with_env()
///     .timeout_ms(5_000)
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    backend_url: Option<String>,
    coingecko_url: Option<String>,
    timeout_ms: Option<u64>,
    home: Option<PathBuf>,
}

impl ClientConfigBuilder {
    /// Reads the `COINSIGHT_*` environment variables. Unparseable timeouts are ignored.
    pub fn with_env(mut self) -> Self {
        if let Some(url) = non_empty_var("COINSIGHT_BACKEND_URL") {
            self.backend_url = Some(url);
        }
        if let Some(url) = non_empty_var("COINSIGHT_COINGECKO_URL") {
            self.coingecko_url = Some(url);
        }
        if let Some(timeout_ms) =
            non_empty_var("COINSIGHT_TIMEOUT_MS").and_then(|raw| raw.trim().parse().ok())
        {
            self.timeout_ms = Some(timeout_ms);
        }
        if let Some(home) = non_empty_var("COINSIGHT_HOME") {
            self.home = Some(PathBuf::from(home));
        }
        self
    }

    pub fn backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = Some(url.into());
        self
    }

    pub fn coingecko_url(mut self, url: impl Into<String>) -> Self {
        self.coingecko_url = Some(url.into());
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    pub fn build(self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            backend_url: self.backend_url.unwrap_or(defaults.backend_url),
            coingecko_url: self.coingecko_url.unwrap_or(defaults.coingecko_url),
            timeout_ms: self.timeout_ms.unwrap_or(defaults.timeout_ms),
            home: self.home.unwrap_or(defaults.home),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn resolve_home() -> PathBuf {
    if let Some(path) = env::var_os("COINSIGHT_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".coinsight");
    }

    PathBuf::from(".coinsight")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = ClientConfig::builder()
            .backend_url("http://proxy.test")
            .timeout_ms(1_500)
            .home("/tmp/coinsight-test")
            .build();

        assert_eq!(config.backend_url, "http://proxy.test");
        assert_eq!(config.coingecko_url, DEFAULT_COINGECKO_URL);
        assert_eq!(config.timeout_ms, 1_500);
        assert_eq!(config.store_dir(), PathBuf::from("/tmp/coinsight-test/store"));
    }
}
