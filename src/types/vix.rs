use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::utils::helper::round_to_cents;

/// Quote scraped from the finance page, deltas already derived.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VixQuote {
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
}

impl VixQuote {
    /// Derive the quote from the last traded price and the previous close.
    /// A non-positive previous close yields a zero percentage instead of
    /// dividing by zero.
    pub fn from_prices(price: f64, previous_close: f64) -> Self {
        let change = round_to_cents(price - previous_close);
        let change_percent = if previous_close > 0.0 {
            round_to_cents((change / previous_close) * 100.0)
        } else {
            0.0
        };

        VixQuote {
            price: round_to_cents(price),
            change,
            change_percent,
        }
    }
}

/// Widget payload for `GET /vix`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VixSnapshot {
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub timestamp: String,
}

impl VixSnapshot {
    pub fn validate(&self) -> Result<()> {
        let numbers = [
            ("price", self.price),
            ("change", self.change),
            ("changePercent", self.change_percent),
        ];

        for (field, value) in numbers {
            if !value.is_finite() {
                return Err(Error::InvalidOutput(format!("{} is not finite: {}", field, value)));
            }
            if round_to_cents(value) != value {
                return Err(Error::InvalidOutput(format!("{} has more than 2 decimals: {}", field, value)));
            }
        }

        if self.timestamp.trim().is_empty() {
            return Err(Error::InvalidOutput("timestamp is empty".to_string()));
        }

        Ok(())
    }
}
