//! # Coinsight Core
//!
//! Client-side data access for crypto market metrics served by two upstream
//! providers: a backend proxy (the primary source) and a public market-data
//! API (the secondary source).
//!
//! ## Overview
//!
//! - **Request dispatch** with per-call timeouts, structured failure
//!   classification and per-endpoint call statistics
//! - **Feature gateway** that consults the blocking policy before any call
//! - **Policy store** holding per-feature and global blocking and source
//!   preferences, persisted as versioned snapshots
//! - **Source fallback** from the preferred provider to the alternate one
//! - **Dominance calculation** from raw market-cap totals
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`call_result`] | Call outcome and failure types |
//! | [`config`] | Client configuration and environment loading |
//! | [`dispatcher`] | Endpoint-keyed HTTP dispatch |
//! | [`domain`] | Market metric models |
//! | [`dominance`] | Dominance calculator |
//! | [`endpoint`] | Endpoint registry and statistics |
//! | [`error`] | Core error types |
//! | [`fallback`] | Preferred-then-alternate orchestration |
//! | [`feeds`] | Dominance and markets feature feeds |
//! | [`gateway`] | Policy-aware feature gateway |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`kv`] | Key-value persistence |
//! | [`policy`] | Blocking and preference policy |
//! | [`source`] | Data source and provider identifiers |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use coinsight_core::{
//!     ClientConfig, DominanceFeed, FeatureGateway, InMemoryEndpointRegistry, PolicyStore,
//!     ReqwestHttpClient, RequestDispatcher,
//! };
//!
//! let config = ClientConfig::from_env();
//! let dispatcher = RequestDispatcher::new(
//!     Arc::new(InMemoryEndpointRegistry::with_defaults(&config)),
//!     Arc::new(ReqwestHttpClient::default()),
//! );
//! let gateway = FeatureGateway::new(dispatcher, Arc::new(PolicyStore::in_memory()));
//! let analysis = DominanceFeed::new(gateway).fetch().await?;
//! println!("BTC dominance: {:.2}%", analysis.data.btc.dominance);
//! ```

pub mod call_result;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod dominance;
pub mod endpoint;
pub mod error;
pub mod fallback;
pub mod feeds;
pub mod gateway;
pub mod http_client;
pub mod kv;
pub mod policy;
pub mod source;

pub use call_result::{BlockedCallResult, CallErrorKind, CallFailure, CallResult, CallSuccess};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use dispatcher::{CallOptions, QueryValue, RequestDispatcher};
pub use domain::{
    CoinDetail, CoinMarket, DominanceAnalysis, DominanceShare, MarketCapData, UtcDateTime,
};
pub use dominance::DominanceCalculator;
pub use endpoint::{EndpointDescriptor, EndpointRegistry, EndpointStats, InMemoryEndpointRegistry};
pub use error::{CoreError, PolicyError, ValidationError};
pub use fallback::{
    FallbackFailure, FallbackResult, FallbackSuccess, SourceAttemptError, SourceFallback,
};
pub use feeds::{DominanceFeed, MarketsFeed, MarketsQuery};
pub use gateway::FeatureGateway;
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use kv::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use policy::PolicyStore;
pub use source::{DataSource, Provider};
