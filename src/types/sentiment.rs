use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::types::UpstreamSource;

/// Fear & Greed graph-data document as served by the sentiment index API.
///
/// Every field listed here is required; serde rejects documents that miss one
/// or carry the wrong JSON type. Unknown extra sections are ignored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawSentimentFeed {
    pub fear_and_greed: FearAndGreed,
    pub fear_and_greed_historical: FearAndGreedHistorical,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FearAndGreed {
    pub score: f64,
    pub rating: String,
    pub timestamp: String,
    pub previous_close: f64,
    pub previous_1_week: f64,
    pub previous_1_month: f64,
    pub previous_1_year: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FearAndGreedHistorical {
    pub timestamp: f64,
    pub score: f64,
    pub rating: String,
    pub data: Vec<HistoricalPoint>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPoint {
    /// Unix timestamp in milliseconds
    pub x: f64,
    /// Index value (0-100)
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
}

impl RawSentimentFeed {
    pub fn from_json(body: &[u8]) -> Result<Self> {
        let feed: RawSentimentFeed = serde_json::from_slice(body)
            .map_err(|e| malformed(e.to_string()))?;
        feed.validate()?;
        Ok(feed)
    }

    pub fn validate(&self) -> Result<()> {
        let current = &self.fear_and_greed;
        let numbers = [
            ("fear_and_greed.score", current.score),
            ("fear_and_greed.previous_close", current.previous_close),
            ("fear_and_greed.previous_1_week", current.previous_1_week),
            ("fear_and_greed.previous_1_month", current.previous_1_month),
            ("fear_and_greed.previous_1_year", current.previous_1_year),
            ("fear_and_greed_historical.timestamp", self.fear_and_greed_historical.timestamp),
            ("fear_and_greed_historical.score", self.fear_and_greed_historical.score),
        ];

        if let Some((field, value)) = numbers.iter().find(|(_, v)| !v.is_finite()) {
            return Err(malformed(format!("{} is not finite: {}", field, value)));
        }

        for (index, point) in self.fear_and_greed_historical.data.iter().enumerate() {
            if !point.x.is_finite() || !point.y.is_finite() {
                return Err(malformed(format!("historical point {} is not finite", index)));
            }
        }

        Ok(())
    }
}

fn malformed(details: String) -> Error {
    Error::UpstreamMalformed {
        upstream: UpstreamSource::Sentiment,
        details,
    }
}

/// Widget payload for `GET /`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentSnapshot {
    pub score: i64,
    pub rating: String,
    pub timestamp: String,
}

impl SentimentSnapshot {
    pub const MIN_SCORE: i64 = 0;
    pub const MAX_SCORE: i64 = 100;

    pub fn validate(&self) -> Result<()> {
        if !(Self::MIN_SCORE..=Self::MAX_SCORE).contains(&self.score) {
            return Err(Error::InvalidOutput(format!("score out of range: {}", self.score)));
        }
        if self.rating.trim().is_empty() {
            return Err(Error::InvalidOutput("rating is empty".to_string()));
        }
        if self.timestamp.trim().is_empty() {
            return Err(Error::InvalidOutput("timestamp is empty".to_string()));
        }
        Ok(())
    }
}
