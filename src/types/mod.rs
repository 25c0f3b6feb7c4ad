pub mod ids;
pub mod sentiment;
pub mod vix;

use std::fmt;

pub use sentiment::{FearAndGreed, FearAndGreedHistorical, HistoricalPoint, RawSentimentFeed, SentimentSnapshot};
pub use vix::{VixQuote, VixSnapshot};

/// The two third-party feeds the proxy reads from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UpstreamSource {
    Sentiment,
    Vix,
}

impl UpstreamSource {
    /// Stable label for metrics and spans.
    pub fn as_str(&self) -> &'static str {
        match self {
            UpstreamSource::Sentiment => "sentiment",
            UpstreamSource::Vix => "vix",
        }
    }
}

impl fmt::Display for UpstreamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamSource::Sentiment => write!(f, "Sentiment index API"),
            UpstreamSource::Vix => write!(f, "VIX quote page"),
        }
    }
}
