use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use anyhow::Context;
use sentiment_proxy::RUN_ENV_VAR;
use sentiment_proxy::api::{ApiState, RateLimiter, create_router};
use sentiment_proxy::config::loader::AppConfig;
use sentiment_proxy::observability::metrics::{register_metrics, serve_metrics};
use sentiment_proxy::observability::tracing::init_tracing;
use sentiment_proxy::upstream::HttpMarketData;
use sentiment_proxy::utils::task_supervisor::TaskSupervisor;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = std::env::var(RUN_ENV_VAR).unwrap_or_else(|_| "development".to_string());
    let config = AppConfig::load(&env).context("failed to load configuration")?;

    init_tracing(&config.observability)?;
    register_metrics()?;
    tracing::info!(env = %env, "Starting sentiment proxy");

    let market_data = Arc::new(HttpMarketData::from_config(&config.upstream)?);
    let rate_limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
    tracing::info!(
        max_requests = rate_limiter.max_requests(),
        window_ms = rate_limiter.window().as_millis() as u64,
        "Rate limiter configured"
    );

    let mut supervisor = TaskSupervisor::new();

    let compaction = Arc::clone(&rate_limiter)
        .run_compaction(config.rate_limit.compaction_interval(), supervisor.shutdown_receiver());
    supervisor.spawn("rate_limit_compaction", compaction);

    if let Some(bind) = &config.observability.metrics_bind {
        let addr: SocketAddr = bind.parse()
            .with_context(|| format!("invalid observability.metrics_bind: {}", bind))?;
        let shutdown = supervisor.shutdown_receiver();
        supervisor.spawn("metrics_listener", async move {
            if let Err(e) = serve_metrics(addr, shutdown).await {
                tracing::error!("Metrics listener failed: {}", e);
            }
        });
    }

    let state = Arc::new(ApiState {
        rate_limiter,
        market_data,
        trust_proxy: config.server.trust_proxy,
    });
    let app = create_router(state);

    let listen_addr = config.server.listen_addr();
    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", listen_addr))?;
    tracing::info!("Sentiment proxy listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = supervisor.check_health() {
        tracing::warn!("Background task stopped early: {}", e);
    }
    supervisor.shutdown(SHUTDOWN_GRACE).await;

    tracing::info!("Sentiment proxy stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received, gracefully stopping");
}
