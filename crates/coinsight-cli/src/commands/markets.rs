use coinsight_core::{MarketsFeed, MarketsQuery};

use crate::cli::MarketsArgs;
use crate::error::CliError;
use crate::output::Response;

use super::{from_fallback, Context};

pub async fn run(args: &MarketsArgs, context: &Context) -> Result<Response, CliError> {
    if args.page == 0 || args.limit == 0 {
        return Err(CliError::Command(String::from(
            "--page and --limit must be at least 1",
        )));
    }

    let query = MarketsQuery::default().page(args.page).per_page(args.limit);
    let feed = MarketsFeed::new(context.gateway()).with_timeout_ms(context.config.timeout_ms);
    from_fallback(feed.top_markets(&query).await)
}
