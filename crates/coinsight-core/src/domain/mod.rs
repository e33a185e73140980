//! # Domain Models
//!
//! Market metric types exchanged with the upstream providers.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`MarketCapData`] | Raw totals feeding the dominance calculation |
//! | [`DominanceAnalysis`] | Per-category market cap and dominance percentage |
//! | [`CoinMarket`] | One row of a top-markets listing |
//! | [`CoinDetail`] | Per-coin metadata |
//! | [`UtcDateTime`] | UTC timestamp |

mod models;
mod timestamp;

pub use models::{CoinDetail, CoinMarket, DominanceAnalysis, DominanceShare, MarketCapData};
pub use timestamp::UtcDateTime;
