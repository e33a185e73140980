//! Behaviour tests for source fallback in the dominance and markets feeds.

mod support;

use coinsight_core::endpoint::{BACKEND_DOMINANCE, BACKEND_MARKETS};
use coinsight_core::policy::{
    FeatureBlockingPatch, FeaturePreferencesPatch, GlobalBlockingPatch, GlobalPreferencesPatch,
};
use coinsight_core::{
    CallErrorKind, DataSource, DominanceFeed, MarketsFeed, MarketsQuery, PolicyStore, Provider,
};

use support::{Harness, Reply, ScriptedHttpClient, BACKEND_URL, COINGECKO_URL};

const BACKEND_DOMINANCE_BODY: &str = r#"{
    "totalMarketCap": 2000.0,
    "btc": {"marketCap": 1000.0, "dominance": 50.0},
    "eth": {"marketCap": 400.0, "dominance": 20.0},
    "stablecoins": {"marketCap": 200.0, "dominance": 10.0},
    "others": {"marketCap": 400.0, "dominance": 20.0},
    "timestamp": "2024-01-01T00:00:00Z"
}"#;

const GLOBAL_BODY: &str = r#"{"data":{"total_market_cap":{"usd":2500.0}}}"#;

const BASKET_BODY: &str = r#"[
    {"id":"bitcoin","symbol":"btc","name":"Bitcoin","market_cap":1300.0},
    {"id":"ethereum","symbol":"eth","name":"Ethereum","market_cap":400.0},
    {"id":"tether","symbol":"usdt","name":"Tether","market_cap":100.0},
    {"id":"usd-coin","symbol":"usdc","name":"USDC","market_cap":40.0},
    {"id":"dai","symbol":"dai","name":"Dai","market_cap":10.0}
]"#;

fn gecko(path: &str) -> String {
    format!("{COINGECKO_URL}{path}")
}

fn backend(path: &str) -> String {
    format!("{BACKEND_URL}{path}")
}

fn derived_dominance_upstream() -> ScriptedHttpClient {
    ScriptedHttpClient::new()
        .on(&gecko("/global"), Reply::json(GLOBAL_BODY))
        .on(&gecko("/coins/markets"), Reply::json(BASKET_BODY))
}

async fn disable_fallback(policy: &PolicyStore) {
    policy
        .set_global_preferences(GlobalPreferencesPatch {
            enable_fallback: Some(false),
            ..GlobalPreferencesPatch::default()
        })
        .await
        .expect("in-memory policy");
}

// =============================================================================
// Dominance: preferred source
// =============================================================================

#[tokio::test]
async fn when_backend_answers_market_data_api_is_never_called() {
    // Given: A healthy backend
    let harness = Harness::new(
        derived_dominance_upstream().on(&backend("/dominance"), Reply::json(BACKEND_DOMINANCE_BODY)),
    );

    // When: Dominance is fetched
    let success = DominanceFeed::new(harness.gateway())
        .fetch()
        .await
        .expect("backend succeeds");

    // Then: The backend payload is returned untouched
    assert_eq!(success.selected_source, DataSource::Primary);
    assert!(!success.used_fallback);
    assert_eq!(success.data.btc.dominance, 50.0);
    assert_eq!(harness.http.calls_to(COINGECKO_URL), 0);
}

// =============================================================================
// Dominance: derived fallback
// =============================================================================

#[tokio::test]
async fn when_backend_fails_dominance_is_derived_from_market_caps() {
    // Given: A failing backend and a healthy market-data API
    let harness = Harness::new(
        derived_dominance_upstream()
            .on(&backend("/dominance"), Reply::Status(502, String::from("bad gateway"))),
    );

    // When: Dominance is fetched
    let success = DominanceFeed::new(harness.gateway())
        .fetch()
        .await
        .expect("derived path succeeds");

    // Then: The analysis is computed from the global total and the basket
    assert_eq!(success.selected_source, DataSource::Secondary);
    assert!(success.used_fallback);
    assert_eq!(success.source_chain, vec![DataSource::Primary, DataSource::Secondary]);
    assert_eq!(success.errors.len(), 1);
    assert_eq!(success.errors[0].failure.status(), Some(502));

    let analysis = success.data;
    assert_eq!(analysis.total_market_cap, 2500.0);
    assert_eq!(analysis.btc.dominance, 52.0);
    assert_eq!(analysis.eth.dominance, 16.0);
    assert_eq!(analysis.stablecoins.market_cap, 150.0);
    assert_eq!(analysis.stablecoins.dominance, 6.0);
    assert_eq!(analysis.others.market_cap, 650.0);
    assert!((analysis.dominance_sum() - 100.0).abs() <= 0.01);

    // And: Exactly one global call and one batched basket call were made
    assert_eq!(harness.http.calls_to(&gecko("/global")), 1);
    assert_eq!(harness.http.calls_to(&gecko("/coins/markets")), 1);
    let basket_url = harness
        .http
        .requests()
        .into_iter()
        .map(|request| request.url)
        .find(|url| url.starts_with(&gecko("/coins/markets")))
        .expect("basket request");
    assert!(
        basket_url.contains("ids=bitcoin%2Cethereum%2Ctether%2Cusd-coin%2Cdai"),
        "{basket_url}"
    );
    assert!(basket_url.contains("vs_currency=usd"), "{basket_url}");
}

#[tokio::test]
async fn inconsistent_market_caps_clamp_others_to_zero() {
    // Given: A basket larger than the reported total
    let harness = Harness::new(
        ScriptedHttpClient::new()
            .on(&backend("/dominance"), Reply::Status(503, String::new()))
            .on(&gecko("/global"), Reply::json(r#"{"data":{"total_market_cap":{"usd":1000.0}}}"#))
            .on(&gecko("/coins/markets"), Reply::json(BASKET_BODY)),
    );

    // When: Dominance is derived
    let analysis = DominanceFeed::new(harness.gateway())
        .fetch()
        .await
        .expect("derived path still answers")
        .data;

    // Then: Others never goes negative
    assert_eq!(analysis.others.market_cap, 0.0);
    assert_eq!(analysis.others.dominance, 0.0);
}

#[tokio::test]
async fn blocked_market_data_api_skips_derivation_before_any_request() {
    // Given: Secondary preferred but the market-data provider globally blocked
    let harness = Harness::new(
        derived_dominance_upstream().on(&backend("/dominance"), Reply::json(BACKEND_DOMINANCE_BODY)),
    );
    harness
        .policy
        .set_global_preferences(GlobalPreferencesPatch {
            preferred_data_source: Some(DataSource::Secondary),
            ..GlobalPreferencesPatch::default()
        })
        .await
        .expect("in-memory policy");
    harness
        .policy
        .set_global_blocking(GlobalBlockingPatch::provider(Provider::CoinGecko, true))
        .await
        .expect("in-memory policy");

    // When: Dominance is fetched
    let success = DominanceFeed::new(harness.gateway())
        .fetch()
        .await
        .expect("falls back to backend");

    // Then: The derived path was refused up front and the backend served the data
    assert_eq!(success.source_chain, vec![DataSource::Secondary, DataSource::Primary]);
    assert!(success.errors[0].blocked);
    assert_eq!(success.errors[0].failure.status(), Some(503));
    assert_eq!(harness.http.calls_to(COINGECKO_URL), 0);
    assert_eq!(harness.http.calls_to(&backend("/dominance")), 1);
}

#[tokio::test]
async fn feature_block_on_secondary_stops_derivation_when_fallback_disabled() {
    // Given: Dominance prefers secondary, secondary is feature-blocked, fallback off
    let harness = Harness::new(derived_dominance_upstream());
    harness
        .policy
        .set_feature_preferences(
            "dominance",
            FeaturePreferencesPatch {
                preferred_data_source: Some(DataSource::Secondary),
                enable_fallback: Some(false),
                use_global_preferences: Some(false),
            },
        )
        .await
        .expect("in-memory policy");
    harness
        .policy
        .set_feature_blocking("dominance", FeatureBlockingPatch::source(DataSource::Secondary, true))
        .await
        .expect("in-memory policy");

    // When: Dominance is fetched
    let failure = DominanceFeed::new(harness.gateway())
        .fetch()
        .await
        .expect_err("nothing may be attempted");

    // Then: No request was sent and the failure says fallback is disabled
    assert_eq!(failure.kind, CallErrorKind::FallbackDisabled);
    assert!(failure.message.contains("fallback is disabled"), "{}", failure.message);
    assert!(failure.all_blocked());
    assert_eq!(harness.http.call_count(), 0);
}

// =============================================================================
// Dominance: fallback disabled and exhaustion
// =============================================================================

#[tokio::test]
async fn disabled_fallback_never_touches_the_alternate_source() {
    // Given: A failing backend with fallback disabled
    let harness = Harness::new(
        derived_dominance_upstream().on(&backend("/dominance"), Reply::Status(500, String::from("down"))),
    );
    disable_fallback(&harness.policy).await;

    // When: Dominance is fetched
    let failure = DominanceFeed::new(harness.gateway())
        .fetch()
        .await
        .expect_err("no fallback allowed");

    // Then: Only the backend was called
    assert_eq!(failure.kind, CallErrorKind::FallbackDisabled);
    assert_eq!(failure.source_chain, vec![DataSource::Primary]);
    assert_eq!(harness.http.call_count(), 1);
    assert_eq!(harness.http.calls_to(COINGECKO_URL), 0);
}

#[tokio::test]
async fn exhausted_sources_report_both_attempts() {
    // Given: Both providers failing
    let harness = Harness::new(
        ScriptedHttpClient::new()
            .on(&backend("/dominance"), Reply::Status(500, String::from("backend down")))
            .on(COINGECKO_URL, Reply::Status(429, String::from("rate limited"))),
    );

    // When: Dominance is fetched
    let failure = DominanceFeed::new(harness.gateway())
        .fetch()
        .await
        .expect_err("both fail");

    // Then: The message names both sources and both errors are kept
    assert_eq!(failure.kind, CallErrorKind::FallbackExhausted);
    assert!(failure.message.contains("Both primary and secondary"), "{}", failure.message);
    assert!(failure.message.contains("backend down"));
    assert!(failure.message.contains("rate limited"));
    assert_eq!(failure.errors.len(), 2);
    assert!(!failure.all_blocked());
    assert_eq!(
        harness.registry.stats(BACKEND_DOMINANCE).map(|stats| stats.error_count),
        Some(1)
    );
}

// =============================================================================
// Markets
// =============================================================================

#[tokio::test]
async fn markets_fall_back_to_market_data_api_with_its_paging_parameters() {
    // Given: Primary blocked for markets only
    let harness = Harness::new(
        ScriptedHttpClient::new()
            .on(&backend("/markets"), Reply::json("[]"))
            .on(
                &gecko("/coins/markets"),
                Reply::json(r#"[{"id":"bitcoin","symbol":"btc","name":"Bitcoin","market_cap_rank":1}]"#),
            ),
    );
    harness
        .policy
        .set_feature_blocking("markets", FeatureBlockingPatch::source(DataSource::Primary, true))
        .await
        .expect("in-memory policy");

    // When: Page two is requested
    let query = MarketsQuery::default().page(2).per_page(50);
    let success = MarketsFeed::new(harness.gateway())
        .top_markets(&query)
        .await
        .expect("secondary serves markets");

    // Then: The market-data API was queried with its own parameter names
    assert_eq!(success.selected_source, DataSource::Secondary);
    assert_eq!(success.data[0].market_cap_rank, Some(1));
    assert_eq!(harness.http.calls_to(&backend("/markets")), 0);
    assert_eq!(harness.registry.stats(BACKEND_MARKETS), None);
    let requests = harness.http.requests();
    assert_eq!(
        requests[0].url,
        gecko("/coins/markets?vs_currency=usd&order=market_cap_desc&per_page=50&page=2&sparkline=false")
    );
}

#[tokio::test]
async fn coin_detail_uses_the_coin_id_as_path_suffix() {
    // Given: A backend that only knows bitcoin
    let harness = Harness::new(ScriptedHttpClient::new().on(
        &backend("/coins/bitcoin"),
        Reply::json(r#"{"id":"bitcoin","symbol":"btc","name":"Bitcoin","categories":["Layer 1"]}"#),
    ));

    // When: The detail is requested
    let success = MarketsFeed::new(harness.gateway())
        .coin_detail("bitcoin")
        .await
        .expect("backend knows bitcoin");

    // Then: The suffixed URL was used
    assert_eq!(success.data.name, "Bitcoin");
    assert_eq!(success.data.categories, vec![String::from("Layer 1")]);
    assert_eq!(harness.http.requests()[0].url, backend("/coins/bitcoin"));
}

#[tokio::test]
async fn coin_detail_percent_encodes_the_id_as_a_path_segment() {
    // Given: A backend serving a coin whose id needs escaping
    let harness = Harness::new(ScriptedHttpClient::new().on(
        &backend("/coins/wrapped%20bitcoin"),
        Reply::json(r#"{"id":"wrapped bitcoin","symbol":"wbtc","name":"Wrapped Bitcoin"}"#),
    ));

    // When: The detail is requested
    let success = MarketsFeed::new(harness.gateway())
        .coin_detail("wrapped bitcoin")
        .await
        .expect("backend knows the coin");

    // Then: The space is path-encoded, not form-encoded
    assert_eq!(success.data.symbol, "wbtc");
    assert_eq!(harness.http.requests()[0].url, backend("/coins/wrapped%20bitcoin"));
}

#[tokio::test]
async fn coin_detail_falls_back_with_minimal_payload_flags() {
    // Given: A backend without the coin
    let harness = Harness::new(
        ScriptedHttpClient::new()
            .on(&backend("/coins"), Reply::Status(404, String::from("unknown coin")))
            .on(
                &gecko("/coins/ethereum"),
                Reply::json(r#"{"id":"ethereum","symbol":"eth","name":"Ethereum"}"#),
            ),
    );

    // When: The detail is requested
    let success = MarketsFeed::new(harness.gateway())
        .coin_detail("ethereum")
        .await
        .expect("secondary knows ethereum");

    // Then: The market-data API was asked for the bare coin record
    assert_eq!(success.selected_source, DataSource::Secondary);
    let urls: Vec<String> = harness.http.requests().into_iter().map(|r| r.url).collect();
    assert_eq!(
        urls[1],
        gecko("/coins/ethereum?localization=false&tickers=false&market_data=false&community_data=false&developer_data=false")
    );
}
