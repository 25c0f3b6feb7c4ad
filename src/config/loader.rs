use crate::config::observability::ObservabilityConfig;
use crate::config::server::ServerConfig;
use crate::config::upstream::UpstreamConfig;
use crate::config::*;
use crate::error::{Error, Result};
use crate::CONFIG_DIR;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;

pub const ENV_PREFIX: &str = "SENTIMENT_PROXY";

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub rate_limit: RateLimitConfig,
    pub upstream: UpstreamConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Layers `config/default`, `config/{env}` and `SENTIMENT_PROXY__*`
    /// variables. Both files are optional.
    pub fn load(env: &str) -> Result<Self> {
        let builder = Config::builder()
            .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
            .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, env)).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );

        Self::from_builder(builder)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config: AppConfig = builder
            .build()
            .map_err(|e| Error::ConfigError(e.to_string()))?
            .try_deserialize()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rate_limit.window_ms == 0 {
            return Err(Error::ConfigError("rate_limit.window_ms must be positive".to_string()));
        }
        if self.rate_limit.max_requests == 0 {
            return Err(Error::ConfigError("rate_limit.max_requests must be positive".to_string()));
        }
        if self.rate_limit.compaction_interval_ms == Some(0) {
            return Err(Error::ConfigError("rate_limit.compaction_interval_ms must be positive".to_string()));
        }
        if self.upstream.timeout_ms == 0 {
            return Err(Error::ConfigError("upstream.timeout_ms must be positive".to_string()));
        }

        for (name, url) in [
            ("upstream.sentiment_url", &self.upstream.sentiment_url),
            ("upstream.vix_url", &self.upstream.vix_url),
        ] {
            reqwest::Url::parse(url)
                .map_err(|e| Error::ConfigError(format!("{} is not a valid URL: {}", name, e)))?;
        }

        Ok(())
    }
}
