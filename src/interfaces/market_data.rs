use crate::types::{RawSentimentFeed, VixQuote};
use crate::error::Result;
use async_trait::async_trait;

/// Where the router gets its raw data from. One call is one upstream round
/// trip; implementations do not retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch_sentiment_feed(&self) -> Result<RawSentimentFeed>;
    async fn fetch_vix_quote(&self) -> Result<VixQuote>;
}
