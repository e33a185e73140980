use url::Url;

use crate::dispatcher::CallOptions;
use crate::domain::{CoinDetail, CoinMarket};
use crate::endpoint::{BACKEND_COINS, BACKEND_MARKETS, COINGECKO_COINS, COINGECKO_MARKETS};
use crate::fallback::{AttemptFuture, FallbackResult, SourceFallback};
use crate::gateway::FeatureGateway;
use crate::DataSource;

pub const MARKETS_FEATURE: &str = "markets";

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PER_PAGE: u32 = 100;

/// Paging and currency for a top-markets listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketsQuery {
    pub page: u32,
    pub per_page: u32,
    pub vs_currency: String,
}

impl Default for MarketsQuery {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
            vs_currency: String::from("usd"),
        }
    }
}

impl MarketsQuery {
    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.max(1);
        self
    }
}

/// Top-markets listing and per-coin detail for the `markets` feature.
///
/// Both sources return the same row shape, so only the query parameters
/// differ between them.
#[derive(Clone)]
pub struct MarketsFeed {
    gateway: FeatureGateway,
    fallback: SourceFallback,
    options: CallOptions,
}

impl MarketsFeed {
    pub fn new(gateway: FeatureGateway) -> Self {
        let fallback = SourceFallback::new(gateway.policy().clone());
        Self {
            gateway,
            fallback,
            options: CallOptions::default(),
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.options = self.options.timeout_ms(timeout_ms);
        self
    }

    pub async fn top_markets(&self, query: &MarketsQuery) -> FallbackResult<Vec<CoinMarket>> {
        self.fallback
            .run(MARKETS_FEATURE, |source| self.markets_attempt(source, query))
            .await
    }

    pub async fn coin_detail(&self, coin_id: &str) -> FallbackResult<CoinDetail> {
        let path = path_segment(coin_id.trim());
        self.fallback
            .run(MARKETS_FEATURE, |source| self.detail_attempt(source, &path))
            .await
    }

    fn markets_attempt<'a>(
        &'a self,
        source: DataSource,
        query: &'a MarketsQuery,
    ) -> AttemptFuture<'a, Vec<CoinMarket>> {
        Box::pin(async move {
            let (endpoint_key, options) = match source {
                DataSource::Primary => (
                    BACKEND_MARKETS,
                    self.options
                        .clone()
                        .query("page", query.page)
                        .query("limit", query.per_page)
                        .query("currency", query.vs_currency.as_str()),
                ),
                DataSource::Secondary => (
                    COINGECKO_MARKETS,
                    self.options
                        .clone()
                        .query("vs_currency", query.vs_currency.as_str())
                        .query("order", "market_cap_desc")
                        .query("per_page", query.per_page)
                        .query("page", query.page)
                        .query("sparkline", false),
                ),
            };
            self.gateway
                .call_for_feature(MARKETS_FEATURE, endpoint_key, source, &options)
                .await
        })
    }

    fn detail_attempt<'a>(&'a self, source: DataSource, path: &'a str) -> AttemptFuture<'a, CoinDetail> {
        Box::pin(async move {
            let (endpoint_key, options) = match source {
                DataSource::Primary => (BACKEND_COINS, self.options.clone()),
                DataSource::Secondary => (
                    COINGECKO_COINS,
                    self.options
                        .clone()
                        .query("localization", false)
                        .query("tickers", false)
                        .query("market_data", false)
                        .query("community_data", false)
                        .query("developer_data", false),
                ),
            };
            self.gateway
                .call_for_feature_with_path(MARKETS_FEATURE, endpoint_key, path, source, &options)
                .await
        })
    }
}

/// Percent-encodes `raw` as a single URL path segment, so `/`, `?` and spaces
/// stay inside the segment.
fn path_segment(raw: &str) -> String {
    Url::parse("http://localhost/")
        .ok()
        .and_then(|mut scratch| {
            scratch.path_segments_mut().ok()?.clear().push(raw);
            Some(scratch.path().trim_start_matches('/').to_owned())
        })
        .unwrap_or_default()
}
