use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Logical data source a feature can prefer: the backend proxy or the public market-data API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Primary,
    Secondary,
}

impl DataSource {
    pub const ALL: [Self; 2] = [Self::Primary, Self::Secondary];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }

    /// The other source, used when falling back.
    pub const fn alternate(self) -> Self {
        match self {
            Self::Primary => Self::Secondary,
            Self::Secondary => Self::Primary,
        }
    }

    /// Upstream provider family serving this source.
    pub const fn provider(self) -> Provider {
        match self {
            Self::Primary => Provider::Backend,
            Self::Secondary => Provider::CoinGecko,
        }
    }
}

impl Display for DataSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataSource {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "primary" | "backend" => Ok(Self::Primary),
            "secondary" | "coingecko" => Ok(Self::Secondary),
            other => Err(ValidationError::InvalidDataSource {
                value: other.to_owned(),
            }),
        }
    }
}

/// Upstream provider family, the unit of global blocking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Backend,
    CoinGecko,
}

impl Provider {
    pub const ALL: [Self; 2] = [Self::Backend, Self::CoinGecko];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Backend => "backend",
            Self::CoinGecko => "coingecko",
        }
    }

    /// Endpoint keys are namespaced by provider (`BACKEND_*`, `COINGECKO_*`).
    pub fn identifies(self, endpoint_key: &str) -> bool {
        let key = endpoint_key.to_ascii_uppercase();
        match self {
            Self::Backend => key.contains("BACKEND"),
            Self::CoinGecko => key.contains("COINGECKO"),
        }
    }
}

impl Display for Provider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "backend" => Ok(Self::Backend),
            "coingecko" => Ok(Self::CoinGecko),
            other => Err(ValidationError::InvalidProvider {
                value: other.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_keys_map_to_provider_families() {
        assert!(Provider::Backend.identifies("BACKEND_DOMINANCE"));
        assert!(Provider::CoinGecko.identifies("coingecko_global"));
        assert!(!Provider::Backend.identifies("COINGECKO_MARKETS"));
        assert!(!Provider::CoinGecko.identifies("LOCAL_CACHE"));
    }

    #[test]
    fn parses_source_aliases() {
        assert_eq!("Secondary".parse::<DataSource>(), Ok(DataSource::Secondary));
        assert_eq!("backend".parse::<DataSource>(), Ok(DataSource::Primary));
        assert!("ftp".parse::<DataSource>().is_err());
    }
}
