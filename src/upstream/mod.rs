pub mod google_finance;
pub mod sentiment;
pub mod vix;

use std::future::Future;
use std::time::Instant;
use async_trait::async_trait;
use reqwest::{Client, Response, header};
use tracing::Instrument;
use crate::config::upstream::UpstreamConfig;
use crate::error::{Error, Result};
use crate::interfaces::MarketDataSource;
use crate::observability::metrics::{UPSTREAM_LATENCY, UPSTREAM_REQUESTS};
use crate::observability::tracing::upstream_span;
use crate::types::{RawSentimentFeed, UpstreamSource, VixQuote};

pub use google_finance::GoogleFinanceExtractor;
pub use sentiment::SentimentFetcher;
pub use vix::VixFetcher;

/// Shared outbound client: browser-like user agent and a hard per-request
/// timeout covering connect, headers and body.
pub fn build_client(config: &UpstreamConfig) -> Result<Client> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(config.timeout())
        .build()
        .map_err(|e| Error::ConfigError(format!("failed to build HTTP client: {}", e)))
}

/// Issues one GET and fails on transport errors or a non-success status.
pub(crate) async fn get_checked(
    client: &Client,
    url: &str,
    accept: &'static str,
    source: UpstreamSource,
) -> Result<Response> {
    let response = client
        .get(url)
        .header(header::ACCEPT, accept)
        .send()
        .await
        .map_err(|e| transport_error(source, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::UpstreamUnavailable {
            upstream: source,
            status: Some(status.as_u16()),
            reason: format!("non-success status {}", status),
        });
    }

    Ok(response)
}

pub(crate) fn transport_error(source: UpstreamSource, err: reqwest::Error) -> Error {
    let reason = if err.is_timeout() {
        format!("timed out: {}", err)
    } else {
        err.to_string()
    };

    Error::UpstreamUnavailable {
        upstream: source,
        status: None,
        reason,
    }
}

/// Production [`MarketDataSource`] backed by the two HTTP fetchers.
pub struct HttpMarketData {
    sentiment: SentimentFetcher,
    vix: VixFetcher,
}

impl HttpMarketData {
    pub fn new(sentiment: SentimentFetcher, vix: VixFetcher) -> Self {
        HttpMarketData { sentiment, vix }
    }

    pub fn from_config(config: &UpstreamConfig) -> Result<Self> {
        let client = build_client(config)?;
        Ok(HttpMarketData {
            sentiment: SentimentFetcher::new(client.clone(), &config.sentiment_url),
            vix: VixFetcher::new(client, &config.vix_url, Box::new(GoogleFinanceExtractor::new())),
        })
    }
}

#[async_trait]
impl MarketDataSource for HttpMarketData {
    async fn fetch_sentiment_feed(&self) -> Result<RawSentimentFeed> {
        observe(UpstreamSource::Sentiment, self.sentiment.fetch()).await
    }

    async fn fetch_vix_quote(&self) -> Result<VixQuote> {
        observe(UpstreamSource::Vix, self.vix.fetch()).await
    }
}

async fn observe<T, F>(source: UpstreamSource, fetch: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let result = fetch.instrument(upstream_span(source)).await;
    let elapsed = started.elapsed();

    UPSTREAM_LATENCY
        .with_label_values(&[source.as_str()])
        .observe(elapsed.as_secs_f64());

    let outcome = match &result {
        Ok(_) => "ok",
        Err(Error::UpstreamUnavailable { .. }) => "unavailable",
        Err(Error::UpstreamMalformed { .. }) => "malformed",
        Err(_) => "error",
    };
    UPSTREAM_REQUESTS
        .with_label_values(&[source.as_str(), outcome])
        .inc();

    tracing::debug!(source = source.as_str(), outcome, elapsed_ms = elapsed.as_millis() as u64, "Upstream fetch finished");
    result
}
