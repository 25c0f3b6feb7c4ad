use std::net::SocketAddr;
use axum::{Router, routing::get, http::header, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use tokio::sync::watch;
use crate::error::{Error, Result};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Request metrics
    pub static ref HTTP_REQUESTS: IntCounterVec = IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of handled requests"),
        &["route", "status"]
    ).expect("http_requests_total definition is valid");

    pub static ref RATE_LIMITED_REQUESTS: IntCounter = IntCounter::new(
        "rate_limited_requests_total",
        "Total number of requests rejected by the rate limiter"
    ).expect("rate_limited_requests_total definition is valid");

    pub static ref RATE_LIMIT_TRACKED_CLIENTS: IntGauge = IntGauge::new(
        "rate_limit_tracked_clients",
        "Client ids held by the rate limiter after the last compaction"
    ).expect("rate_limit_tracked_clients definition is valid");

    // Upstream metrics
    pub static ref UPSTREAM_REQUESTS: IntCounterVec = IntCounterVec::new(
        Opts::new("upstream_requests_total", "Outbound upstream requests by outcome"),
        &["source", "outcome"]
    ).expect("upstream_requests_total definition is valid");

    pub static ref UPSTREAM_LATENCY: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "upstream_latency_seconds",
            "Upstream fetch latency"
        ).buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        &["source"]
    ).expect("upstream_latency_seconds definition is valid");
}

/// Registers every metric with [`REGISTRY`]. Safe to call more than once.
pub fn register_metrics() -> Result<()> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(HTTP_REQUESTS.clone()),
        Box::new(RATE_LIMITED_REQUESTS.clone()),
        Box::new(RATE_LIMIT_TRACKED_CLIENTS.clone()),
        Box::new(UPSTREAM_REQUESTS.clone()),
        Box::new(UPSTREAM_LATENCY.clone()),
    ];

    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(Error::MetricsError(e)),
        }
    }
    Ok(())
}

/// Text exposition of everything in [`REGISTRY`].
pub fn render() -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| Error::Internal(e.to_string()))
}

async fn metrics_handler() -> Result<impl IntoResponse> {
    let body = render()?;
    Ok(([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body))
}

pub fn metrics_router() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

/// Serves `/metrics` on its own listener until shutdown is requested.
pub async fn serve_metrics(addr: SocketAddr, mut shutdown: watch::Receiver<bool>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Metrics listening on http://{}/metrics", addr);

    axum::serve(listener, metrics_router())
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await?;
    Ok(())
}
