use reqwest::Client;
use crate::error::Result;
use crate::interfaces::QuoteExtractor;
use crate::types::{UpstreamSource, VixQuote};
use crate::upstream::{get_checked, transport_error};

/// Scrapes the VIX quote page and derives the day's change.
pub struct VixFetcher {
    client: Client,
    url: String,
    extractor: Box<dyn QuoteExtractor>,
}

impl VixFetcher {
    pub fn new(client: Client, url: &str, extractor: Box<dyn QuoteExtractor>) -> Self {
        VixFetcher {
            client,
            url: url.to_string(),
            extractor,
        }
    }

    pub async fn fetch(&self) -> Result<VixQuote> {
        let response = get_checked(&self.client, &self.url, "text/html", UpstreamSource::Vix).await?;
        let html = response.text()
            .await
            .map_err(|e| transport_error(UpstreamSource::Vix, e))?;

        self.parse(&html)
    }

    /// Missing previous close degrades to a zero change; a missing price fails.
    pub fn parse(&self, html: &str) -> Result<VixQuote> {
        let price = self.extractor.extract_price(html)?;
        let previous_close = match self.extractor.extract_previous_close(html) {
            Some(close) => close,
            None => {
                tracing::warn!("VIX previous close not found, reporting zero change");
                price
            }
        };

        Ok(VixQuote::from_prices(price, previous_close))
    }
}
