use coinsight_core::DominanceFeed;

use crate::error::CliError;
use crate::output::Response;

use super::{from_fallback, Context};

pub async fn run(context: &Context) -> Result<Response, CliError> {
    let feed = DominanceFeed::new(context.gateway()).with_timeout_ms(context.config.timeout_ms);
    from_fallback(feed.fetch().await)
}
