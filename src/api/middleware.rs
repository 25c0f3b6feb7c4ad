use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use axum::{
    Router,
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method, header},
    middleware::Next,
    response::Response,
};
use tower_http::set_header::SetResponseHeaderLayer;
use crate::api::rest::ApiState;
use crate::error::{Error, Result};
use crate::observability::metrics::{HTTP_REQUESTS, RATE_LIMITED_REQUESTS};

/// Shared bucket for callers whose address cannot be resolved. Every such
/// caller competes for the same quota.
pub const UNKNOWN_CLIENT: &str = "unknown";

const SECURITY_HEADERS: [(HeaderName, &str); 7] = [
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "DENY"),
    (header::X_XSS_PROTECTION, "0"),
    (header::REFERRER_POLICY, "no-referrer"),
    (header::CACHE_CONTROL, "public, max-age=300"),
    (header::ACCESS_CONTROL_ALLOW_ORIGIN, ""),
    (header::ACCESS_CONTROL_ALLOW_METHODS, "GET"),
];

/// Wraps every route and the fallback so the headers land on all responses,
/// errors included.
pub fn with_security_headers(router: Router) -> Router {
    SECURITY_HEADERS.iter().fold(router, |router, (name, value)| {
        router.layer(SetResponseHeaderLayer::overriding(
            name.clone(),
            HeaderValue::from_static(*value),
        ))
    })
}

/// Client id in priority order: TCP peer address, first `X-Forwarded-For`
/// hop, then [`UNKNOWN_CLIENT`]. Behind a trusted proxy the forwarded hop
/// comes first and the peer is the fallback.
pub fn resolve_client_id<B>(request: &axum::http::Request<B>, trust_proxy: bool) -> String {
    let peer = || {
        request.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
    };
    let forwarded = || forwarded_for(request.headers());

    let resolved = if trust_proxy {
        forwarded().or_else(peer)
    } else {
        peer().or_else(forwarded)
    };

    resolved.unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers.get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
        .map(str::to_string)
}

/// Method check, then rate limiting. Runs before routing so unknown paths
/// still count against the caller's quota.
pub async fn admission_guard(
    State(state): State<Arc<ApiState>>,
    request: Request,
    next: Next,
) -> Result<Response> {
    if request.method() != Method::GET {
        return Err(Error::MethodNotAllowed);
    }

    let client_id = resolve_client_id(&request, state.trust_proxy);
    state.rate_limiter.check(&client_id).inspect_err(|_| {
        RATE_LIMITED_REQUESTS.inc();
        if client_id == UNKNOWN_CLIENT {
            tracing::warn!("Rate limited the shared unknown-client bucket");
        } else {
            tracing::info!(client_id = %client_id, "Rate limited client");
        }
    })?;

    Ok(next.run(request).await)
}

pub async fn record_metrics(request: Request, next: Next) -> Response {
    let route = route_label(request.uri().path());
    let started = Instant::now();

    let response = next.run(request).await;

    HTTP_REQUESTS
        .with_label_values(&[route, response.status().as_str()])
        .inc();
    tracing::debug!(route, status = response.status().as_u16(), elapsed_ms = started.elapsed().as_millis() as u64, "Request finished");
    response
}

fn route_label(path: &str) -> &'static str {
    match path {
        "" | "/" => "sentiment",
        "/vix" => "vix",
        _ => "other",
    }
}
