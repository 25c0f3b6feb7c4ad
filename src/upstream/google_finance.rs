use lazy_static::lazy_static;
use regex::Regex;
use crate::error::{Error, Result};
use crate::interfaces::QuoteExtractor;
use crate::types::UpstreamSource;

lazy_static! {
    static ref RE_LAST_PRICE: Regex = Regex::new(r#"data-last-price="([^"]+)""#)
        .expect("last price pattern is valid");
    static ref RE_PREVIOUS_CLOSE: Regex = Regex::new(r#"class="P6K39c"[^>]*>\s*\$?([0-9][0-9,]*(?:\.[0-9]+)?)\s*<"#)
        .expect("previous close pattern is valid");
}

/// Regex matcher for the Google Finance quote page markup.
#[derive(Clone, Copy, Debug, Default)]
pub struct GoogleFinanceExtractor;

impl GoogleFinanceExtractor {
    pub fn new() -> Self {
        GoogleFinanceExtractor
    }
}

fn parse_decimal(raw: &str) -> Option<f64> {
    raw.trim()
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

impl QuoteExtractor for GoogleFinanceExtractor {
    fn extract_price(&self, html: &str) -> Result<f64> {
        let raw = RE_LAST_PRICE.captures(html)
            .and_then(|c| c.get(1))
            .ok_or_else(|| Error::UpstreamMalformed {
                upstream: UpstreamSource::Vix,
                details: "data-last-price attribute not found".to_string(),
            })?;

        parse_decimal(raw.as_str()).ok_or_else(|| Error::UpstreamMalformed {
            upstream: UpstreamSource::Vix,
            details: format!("data-last-price is not a price: {:?}", raw.as_str()),
        })
    }

    fn extract_previous_close(&self, html: &str) -> Option<f64> {
        RE_PREVIOUS_CLOSE.captures(html)
            .and_then(|c| c.get(1))
            .and_then(|m| parse_decimal(m.as_str()))
    }
}
