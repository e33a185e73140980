//! Market dominance derived from raw market-cap totals.

use tracing::{debug, warn};

use crate::domain::{DominanceAnalysis, DominanceShare, MarketCapData};
use crate::UtcDateTime;

/// Allowed deviation of the rounded dominance sum from 100.
pub const DOMINANCE_SUM_TOLERANCE: f64 = 0.01;

/// Pure dominance calculation.
///
/// BTC, ETH and stablecoin shares are each `round2(part / total * 100)`.
/// The `others` share is not computed from its own market cap: it is the
/// rounded remainder `round2(100 - btc - eth - stablecoins)`, clamped at zero,
/// so its value can differ from `others.market_cap / total` by a few hundredths.
///
/// Because of that, the sum self-check only fires when the remainder is
/// clamped: either the named parts exceed the total (inconsistent input) or
/// their rounded shares already add up to more than 100. Both cases are
/// reported through a warning, never an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct DominanceCalculator;

impl DominanceCalculator {
    pub fn new() -> Self {
        Self
    }

    pub fn calculate(&self, data: &MarketCapData) -> DominanceAnalysis {
        self.calculate_at(data, UtcDateTime::now())
    }

    pub fn calculate_at(&self, data: &MarketCapData, timestamp: UtcDateTime) -> DominanceAnalysis {
        let others_market_cap = (data.total - data.btc - data.eth - data.stablecoins).max(0.0);

        if !(data.total > 0.0 && data.total.is_finite()) {
            debug!(total = data.total, "total market cap is not positive; dominance set to zero");
            return DominanceAnalysis {
                total_market_cap: data.total,
                btc: DominanceShare::new(data.btc, 0.0),
                eth: DominanceShare::new(data.eth, 0.0),
                stablecoins: DominanceShare::new(data.stablecoins, 0.0),
                others: DominanceShare::new(others_market_cap, 0.0),
                timestamp,
            };
        }

        let btc = round2(percentage(data.btc, data.total));
        let eth = round2(percentage(data.eth, data.total));
        let stablecoins = round2(percentage(data.stablecoins, data.total));
        let others = round2(100.0 - btc - eth - stablecoins).max(0.0);

        let analysis = DominanceAnalysis {
            total_market_cap: data.total,
            btc: DominanceShare::new(data.btc, btc),
            eth: DominanceShare::new(data.eth, eth),
            stablecoins: DominanceShare::new(data.stablecoins, stablecoins),
            others: DominanceShare::new(others_market_cap, others),
            timestamp,
        };

        let sum = analysis.dominance_sum();
        if (sum - 100.0).abs() > DOMINANCE_SUM_TOLERANCE {
            warn!(
                sum,
                consistent = data.is_consistent(),
                total = data.total,
                btc = data.btc,
                eth = data.eth,
                stablecoins = data.stablecoins,
                "dominance percentages do not sum to 100"
            );
        }

        analysis
    }
}

fn percentage(part: f64, total: f64) -> f64 {
    part / total * 100.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
