//! Shared helpers for the integration suite.

pub mod mock_upstream;

use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use thumbd::config::ThumbdConfig;
use thumbd::service::{router, AppState};
use thumbd::stats::HttpStats;
use tower::ServiceExt;

/// Build an application router whose face client points at `face_url`,
/// returning the router and a handle on its counters.
pub fn test_app(face_url: &str) -> (Router, Arc<HttpStats>) {
    let config = ThumbdConfig {
        face_api_url: face_url.to_string(),
        ..ThumbdConfig::default()
    };
    let state = AppState::new(&config).expect("client construction");
    let stats = Arc::clone(&state.stats);
    (router(state), stats)
}

/// Drive one GET request through the router.
pub async fn get(app: &Router, uri: &str) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("request build"),
        )
        .await
        .expect("infallible service")
}

/// Collect a response body into bytes.
pub async fn body_bytes(response: Response) -> bytes::Bytes {
    use http_body_util::BodyExt;
    response
        .into_body()
        .collect()
        .await
        .expect("body collect")
        .to_bytes()
}
