use std::time::Duration;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SENTIMENT_URL: &str =
    "https://production.dataviz.cnn.io/index/fearandgreed/graphdata/";
pub const DEFAULT_VIX_URL: &str = "https://www.google.com/finance/quote/VIX:INDEXCBOE";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub sentiment_url: String,
    pub vix_url: String,
    pub user_agent: String,
    pub timeout_ms: u64,
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        UpstreamConfig {
            sentiment_url: DEFAULT_SENTIMENT_URL.to_string(),
            vix_url: DEFAULT_VIX_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_ms: 5_000,
        }
    }
}
