use serde::{Deserialize, Serialize};

use crate::{UtcDateTime, ValidationError};

/// Raw market capitalisation totals, in USD, feeding the dominance calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketCapData {
    pub total: f64,
    pub btc: f64,
    pub eth: f64,
    pub stablecoins: f64,
}

impl MarketCapData {
    pub fn new(total: f64, btc: f64, eth: f64, stablecoins: f64) -> Result<Self, ValidationError> {
        validate_non_negative("total", total)?;
        validate_non_negative("btc", btc)?;
        validate_non_negative("eth", eth)?;
        validate_non_negative("stablecoins", stablecoins)?;

        Ok(Self {
            total,
            btc,
            eth,
            stablecoins,
        })
    }

    /// True when the named parts do not exceed the total.
    pub fn is_consistent(&self) -> bool {
        self.btc + self.eth + self.stablecoins <= self.total
    }
}

/// Market cap of one category and its share of the total, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DominanceShare {
    pub market_cap: f64,
    pub dominance: f64,
}

impl DominanceShare {
    pub const fn new(market_cap: f64, dominance: f64) -> Self {
        Self {
            market_cap,
            dominance,
        }
    }
}

/// Dominance breakdown of the total crypto market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DominanceAnalysis {
    pub total_market_cap: f64,
    pub btc: DominanceShare,
    pub eth: DominanceShare,
    pub stablecoins: DominanceShare,
    pub others: DominanceShare,
    #[serde(default = "UtcDateTime::now")]
    pub timestamp: UtcDateTime,
}

impl DominanceAnalysis {
    pub fn dominance_sum(&self) -> f64 {
        self.btc.dominance + self.eth.dominance + self.stablecoins.dominance + self.others.dominance
    }
}

/// One row of a top-markets listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinMarket {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub total_volume: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
}

/// Coin metadata returned by the per-coin endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinDetail {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub hashing_algorithm: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}
