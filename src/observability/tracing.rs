use tracing::Span;
use tracing_subscriber::EnvFilter;
use crate::config::observability::{LogFormat, ObservabilityConfig};
use crate::error::{Error, Result};
use crate::types::UpstreamSource;
use crate::types::ids::RequestId;

/// Installs the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let installed = match config.log_format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };

    installed.map_err(|e| Error::ConfigError(format!("tracing init failed: {}", e)))
}

pub fn request_span(request_id: RequestId, method: &str, path: &str, client_id: &str) -> Span {
    tracing::info_span!(
        "request",
        request_id = %request_id,
        method = method,
        path = path,
        client_id = client_id,
    )
}

pub fn upstream_span(source: UpstreamSource) -> Span {
    tracing::info_span!(
        "upstream_fetch",
        source = source.as_str(),
    )
}
