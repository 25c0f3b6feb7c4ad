use std::time::Duration;
use serde::{Deserialize, Serialize};

pub mod server;
pub mod upstream;
pub mod observability;
pub mod loader;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub window_ms: u64,
    pub max_requests: usize,
    /// Defaults to five windows when unset.
    pub compaction_interval_ms: Option<u64>,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn compaction_interval(&self) -> Duration {
        self.compaction_interval_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.window() * 5)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitConfig {
            window_ms: 60_000,  // 1 minute
            max_requests: 30,
            compaction_interval_ms: None,
        }
    }
}
