use chrono::{DateTime, Utc};
use crate::error::Result;
use crate::types::{RawSentimentFeed, SentimentSnapshot, VixQuote, VixSnapshot};
use crate::utils::helper::to_iso8601;

/// Current index reading for the widget. The score is rounded half away from
/// zero (`74.5 -> 75`); rating and timestamp are passed through untouched.
pub fn normalize_sentiment(feed: &RawSentimentFeed) -> Result<SentimentSnapshot> {
    let current = &feed.fear_and_greed;

    let snapshot = SentimentSnapshot {
        score: current.score.round() as i64,
        rating: current.rating.clone(),
        timestamp: current.timestamp.clone(),
    };

    snapshot.validate()?;
    Ok(snapshot)
}

/// Stamps the quote with `now`, not with any time the quote page reports.
pub fn normalize_vix(quote: &VixQuote, now: DateTime<Utc>) -> Result<VixSnapshot> {
    let snapshot = VixSnapshot {
        price: quote.price,
        change: quote.change,
        change_percent: quote.change_percent,
        timestamp: to_iso8601(now),
    };

    snapshot.validate()?;
    Ok(snapshot)
}
