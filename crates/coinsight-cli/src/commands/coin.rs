use coinsight_core::MarketsFeed;

use crate::cli::CoinArgs;
use crate::error::CliError;
use crate::output::Response;

use super::{from_fallback, Context};

pub async fn run(args: &CoinArgs, context: &Context) -> Result<Response, CliError> {
    let id = args.id.trim();
    if id.is_empty() {
        return Err(CliError::Command(String::from("coin id cannot be empty")));
    }

    let feed = MarketsFeed::new(context.gateway()).with_timeout_ms(context.config.timeout_ms);
    from_fallback(feed.coin_detail(id).await)
}
