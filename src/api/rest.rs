use axum::{
    Router,
    body::Body,
    extract::{Json, State},
    http::Request,
    middleware,
    routing::get,
};
use chrono::Utc;
use std::sync::Arc;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::Level;
use crate::api::middleware::{admission_guard, record_metrics, resolve_client_id, with_security_headers};
use crate::api::rate_limit::RateLimiter;
use crate::core::normalizer::{normalize_sentiment, normalize_vix};
use crate::error::{Error, Result};
use crate::interfaces::MarketDataSource;
use crate::observability::tracing::request_span;
use crate::types::{SentimentSnapshot, VixSnapshot};
use crate::types::ids::RequestId;

pub struct ApiState {
    pub rate_limiter: Arc<RateLimiter>,
    pub market_data: Arc<dyn MarketDataSource>,
    pub trust_proxy: bool,
}

/// Public router. Layers run outermost first: security headers, request
/// span, metrics, then the method/rate-limit guard ahead of routing.
pub fn create_router(state: Arc<ApiState>) -> Router {
    let trust_proxy = state.trust_proxy;

    let router = Router::new()
        .route("/", get(get_sentiment))
        .route("/vix", get(get_vix))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(Arc::clone(&state), admission_guard))
        .layer(middleware::from_fn(record_metrics))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(move |request: &Request<Body>| {
                    request_span(
                        RequestId::new(),
                        request.method().as_str(),
                        request.uri().path(),
                        &resolve_client_id(request, trust_proxy),
                    )
                })
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state);

    with_security_headers(router)
}

async fn get_sentiment(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<SentimentSnapshot>> {
    let feed = state.market_data.fetch_sentiment_feed().await?;
    let snapshot = normalize_sentiment(&feed)?;

    tracing::debug!(score = snapshot.score, rating = %snapshot.rating, "Serving sentiment snapshot");
    Ok(Json(snapshot))
}

async fn get_vix(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<VixSnapshot>> {
    let quote = state.market_data.fetch_vix_quote().await?;
    let snapshot = normalize_vix(&quote, Utc::now())?;

    tracing::debug!(price = snapshot.price, change = snapshot.change, "Serving VIX snapshot");
    Ok(Json(snapshot))
}

async fn not_found() -> Error {
    Error::NotFound
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::market_data::MockMarketDataSource;
    use crate::types::{RawSentimentFeed, UpstreamSource, VixQuote};
    use crate::types::sentiment::tests::VALID_FEED;
    use axum::http::{Method, StatusCode, header};
    use axum::response::Response;
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    fn router_with(mock: MockMarketDataSource, max_requests: usize) -> Router {
        create_router(Arc::new(ApiState {
            rate_limiter: Arc::new(RateLimiter::new(max_requests, Duration::from_secs(60))),
            market_data: Arc::new(mock),
            trust_proxy: false,
        }))
    }

    fn sentiment_feed() -> RawSentimentFeed {
        RawSentimentFeed::from_json(VALID_FEED.as_bytes()).unwrap()
    }

    async fn send(router: &Router, method: Method, uri: &str, client: &str) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", client)
            .body(Body::empty())
            .unwrap();
        router.clone().oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn assert_security_headers(response: &Response) {
        let headers = response.headers();
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
        assert_eq!(headers[header::X_XSS_PROTECTION], "0");
        assert_eq!(headers[header::REFERRER_POLICY], "no-referrer");
        assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=300");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "GET");
    }

    #[tokio::test]
    async fn sentiment_route_serves_rounded_snapshot() {
        let mut mock = MockMarketDataSource::new();
        mock.expect_fetch_sentiment_feed().times(1).returning(|| Ok(sentiment_feed()));
        let router = router_with(mock, 30);

        let response = send(&router, Method::GET, "/", "203.0.113.1").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_security_headers(&response);
        let body = json_body(response).await;
        assert_eq!(body["score"], 75);
        assert_eq!(body["rating"], "greed");
        assert_eq!(body["timestamp"], "2024-02-23T12:00:00+00:00");
    }

    #[tokio::test]
    async fn vix_route_serves_quote() {
        let mut mock = MockMarketDataSource::new();
        mock.expect_fetch_vix_quote().times(1).returning(|| Ok(VixQuote::from_prices(21.01, 19.09)));
        let router = router_with(mock, 30);

        let response = send(&router, Method::GET, "/vix", "203.0.113.1").await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["price"], 21.01);
        assert_eq!(body["change"], 1.92);
        assert_eq!(body["changePercent"], 10.06);
        assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let router = router_with(MockMarketDataSource::new(), 30);

        let response = send(&router, Method::GET, "/unknown", "203.0.113.1").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_security_headers(&response);
        assert_eq!(json_body(response).await["error"], "Not Found");
    }

    #[tokio::test]
    async fn non_get_is_rejected_before_routing() {
        let mut mock = MockMarketDataSource::new();
        mock.expect_fetch_sentiment_feed().times(0);
        let router = router_with(mock, 30);

        for uri in ["/", "/unknown"] {
            let response = send(&router, Method::POST, uri, "203.0.113.1").await;
            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
            assert_security_headers(&response);
            assert_eq!(json_body(response).await["error"], "Method Not Allowed");
        }
    }

    #[tokio::test]
    async fn exceeding_quota_is_rate_limited_per_client() {
        let mut mock = MockMarketDataSource::new();
        mock.expect_fetch_sentiment_feed().times(31).returning(|| Ok(sentiment_feed()));
        let router = router_with(mock, 30);

        for _ in 0..30 {
            let response = send(&router, Method::GET, "/", "203.0.113.7").await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = send(&router, Method::GET, "/", "203.0.113.7").await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_security_headers(&response);
        assert_eq!(json_body(response).await["error"], "Too Many Requests");

        let response = send(&router, Method::GET, "/", "203.0.113.8").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_paths_count_against_quota() {
        let router = router_with(MockMarketDataSource::new(), 2);

        assert_eq!(send(&router, Method::GET, "/a", "198.51.100.2").await.status(), StatusCode::NOT_FOUND);
        assert_eq!(send(&router, Method::GET, "/b", "198.51.100.2").await.status(), StatusCode::NOT_FOUND);
        assert_eq!(send(&router, Method::GET, "/c", "198.51.100.2").await.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn upstream_status_maps_to_bad_gateway() {
        let mut mock = MockMarketDataSource::new();
        mock.expect_fetch_sentiment_feed().returning(|| {
            Err(Error::UpstreamUnavailable {
                upstream: UpstreamSource::Sentiment,
                status: Some(503),
                reason: "non-success status 503".to_string(),
            })
        });
        let router = router_with(mock, 30);

        let response = send(&router, Method::GET, "/", "203.0.113.1").await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_security_headers(&response);
        let message = json_body(response).await["error"].as_str().unwrap().to_string();
        assert!(message.contains("503"));
    }

    #[tokio::test]
    async fn malformed_upstream_returns_generic_message() {
        let mut mock = MockMarketDataSource::new();
        mock.expect_fetch_vix_quote().returning(|| {
            Err(Error::UpstreamMalformed {
                upstream: UpstreamSource::Vix,
                details: "data-last-price attribute not found".to_string(),
            })
        });
        let router = router_with(mock, 30);

        let response = send(&router, Method::GET, "/vix", "203.0.113.1").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await, serde_json::json!({ "error": "Invalid data format" }));
    }

    #[tokio::test]
    async fn invalid_output_is_internal_error() {
        let mut mock = MockMarketDataSource::new();
        mock.expect_fetch_sentiment_feed().returning(|| {
            let mut feed = sentiment_feed();
            feed.fear_and_greed.score = 250.0;
            Ok(feed)
        });
        let router = router_with(mock, 30);

        let response = send(&router, Method::GET, "/", "203.0.113.1").await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await, serde_json::json!({ "error": "Internal Server Error" }));
    }
}
