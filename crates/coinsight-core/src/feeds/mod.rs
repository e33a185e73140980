//! Feature orchestrators built on [`SourceFallback`](crate::fallback::SourceFallback).

mod dominance;
mod markets;

pub use dominance::{DominanceFeed, DOMINANCE_FEATURE};
pub use markets::{MarketsFeed, MarketsQuery, DEFAULT_PAGE, DEFAULT_PER_PAGE, MARKETS_FEATURE};
