use std::collections::HashMap;

use serde::Deserialize;
use tracing::info;

use crate::call_result::{BlockedCallResult, CallErrorKind, CallFailure, CallSuccess};
use crate::dispatcher::CallOptions;
use crate::domain::{CoinMarket, DominanceAnalysis, MarketCapData};
use crate::dominance::DominanceCalculator;
use crate::endpoint::{BACKEND_DOMINANCE, COINGECKO_GLOBAL, COINGECKO_MARKETS};
use crate::fallback::{AttemptFuture, FallbackResult, SourceFallback};
use crate::gateway::{blocked_failure, FeatureGateway};
use crate::{DataSource, Provider};

pub const DOMINANCE_FEATURE: &str = "dominance";

const BITCOIN_ID: &str = "bitcoin";
const ETHEREUM_ID: &str = "ethereum";
const STABLECOIN_IDS: [&str; 3] = ["tether", "usd-coin", "dai"];
const BASKET_IDS: &str = "bitcoin,ethereum,tether,usd-coin,dai";

#[derive(Debug, Deserialize)]
struct GlobalResponse {
    data: GlobalData,
}

#[derive(Debug, Deserialize)]
struct GlobalData {
    #[serde(default)]
    total_market_cap: HashMap<String, f64>,
}

/// Market dominance for the `dominance` feature.
///
/// The primary source serves a precomputed analysis. The secondary source has
/// no equivalent endpoint, so the analysis is derived from the global total
/// and one batched basket lookup, fetched concurrently.
#[derive(Clone)]
pub struct DominanceFeed {
    gateway: FeatureGateway,
    fallback: SourceFallback,
    calculator: DominanceCalculator,
    options: CallOptions,
}

impl DominanceFeed {
    pub fn new(gateway: FeatureGateway) -> Self {
        let fallback = SourceFallback::new(gateway.policy().clone());
        Self {
            gateway,
            fallback,
            calculator: DominanceCalculator::new(),
            options: CallOptions::default(),
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.options = self.options.timeout_ms(timeout_ms);
        self
    }

    pub async fn fetch(&self) -> FallbackResult<DominanceAnalysis> {
        self.fallback
            .run(DOMINANCE_FEATURE, |source| self.attempt(source))
            .await
    }

    fn attempt(&self, source: DataSource) -> AttemptFuture<'_, DominanceAnalysis> {
        Box::pin(async move {
            match source {
                DataSource::Primary => {
                    self.gateway
                        .call_for_feature(DOMINANCE_FEATURE, BACKEND_DOMINANCE, source, &self.options)
                        .await
                }
                DataSource::Secondary => self.derive_from_market_data().await,
            }
        })
    }

    async fn derive_from_market_data(&self) -> BlockedCallResult<DominanceAnalysis> {
        let source = DataSource::Secondary;
        let policy = self.gateway.policy();
        if policy.is_global_blocked(Provider::CoinGecko)
            || policy.is_feature_source_blocked(DOMINANCE_FEATURE, source)
        {
            info!(
                feature = DOMINANCE_FEATURE,
                source = source.as_str(),
                "derived dominance skipped; source is blocked"
            );
            return BlockedCallResult::blocked(blocked_failure(DOMINANCE_FEATURE, source));
        }

        let basket_options = self
            .options
            .clone()
            .query("vs_currency", "usd")
            .query("ids", BASKET_IDS);
        let (global, basket) = tokio::join!(
            self.gateway.call_for_feature::<GlobalResponse>(
                DOMINANCE_FEATURE,
                COINGECKO_GLOBAL,
                source,
                &self.options,
            ),
            self.gateway.call_for_feature::<Vec<CoinMarket>>(
                DOMINANCE_FEATURE,
                COINGECKO_MARKETS,
                source,
                &basket_options,
            ),
        );

        let global = match global.result {
            Ok(success) => success,
            Err(failure) => {
                return BlockedCallResult {
                    result: Err(failure),
                    blocked: global.blocked,
                }
            }
        };
        let basket = match basket.result {
            Ok(success) => success,
            Err(failure) => {
                return BlockedCallResult {
                    result: Err(failure),
                    blocked: basket.blocked,
                }
            }
        };

        let result = market_cap_data(&global.data, &basket.data)
            .map(|data| CallSuccess::new(self.calculator.calculate(&data), global.status));
        BlockedCallResult::dispatched(result)
    }
}

fn market_cap_data(global: &GlobalResponse, basket: &[CoinMarket]) -> Result<MarketCapData, CallFailure> {
    let Some(total) = global.data.total_market_cap.get("usd").copied() else {
        return Err(CallFailure::new(
            CallErrorKind::Decode,
            "global market data is missing total_market_cap.usd",
        ));
    };

    let market_cap_of = |id: &str| {
        basket
            .iter()
            .find(|coin| coin.id == id)
            .and_then(|coin| coin.market_cap)
            .unwrap_or(0.0)
    };
    let stablecoins: f64 = STABLECOIN_IDS.iter().map(|&id| market_cap_of(id)).sum();

    MarketCapData::new(total, market_cap_of(BITCOIN_ID), market_cap_of(ETHEREUM_ID), stablecoins)
        .map_err(|error| CallFailure::new(CallErrorKind::Decode, error.to_string()))
}
