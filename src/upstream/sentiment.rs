use reqwest::Client;
use crate::error::Result;
use crate::types::{RawSentimentFeed, UpstreamSource};
use crate::upstream::{get_checked, transport_error};

/// Reads the Fear & Greed graph-data JSON document.
pub struct SentimentFetcher {
    client: Client,
    url: String,
}

impl SentimentFetcher {
    pub fn new(client: Client, url: &str) -> Self {
        SentimentFetcher {
            client,
            url: url.to_string(),
        }
    }

    pub async fn fetch(&self) -> Result<RawSentimentFeed> {
        let response = get_checked(&self.client, &self.url, "application/json", UpstreamSource::Sentiment).await?;
        let body = response.bytes()
            .await
            .map_err(|e| transport_error(UpstreamSource::Sentiment, e))?;

        let feed = RawSentimentFeed::from_json(&body)?;
        tracing::debug!(score = feed.fear_and_greed.score, rating = %feed.fear_and_greed.rating, "Sentiment feed fetched");
        Ok(feed)
    }
}
