//! The HTTP surface and per-request orchestration.
//!
//! Three routes: `/server-status` (counter dump), `/favicon.ico` (404), and
//! everything else is a thumbnail request driven through the pipeline:
//! parse, optional face annotation, source fetch, engine, respond. Every
//! exit path updates the counters exactly once; the in-flight gauge and
//! elapsed-time accumulator are closed out by a Drop guard even when the
//! caller abandons the connection mid-request.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::ThumbdConfig;
use crate::engine::{JpegEngine, Thumbnailer};
use crate::error::ThumbError;
use crate::face::FaceClient;
use crate::fetch::SourceFetcher;
use crate::params::parse_path;
use crate::stats::{HttpStats, RequestTimer};

/// Shared per-process state handed to every request task.
#[derive(Clone)]
pub struct AppState {
    pub stats: Arc<HttpStats>,
    pub fetcher: SourceFetcher,
    pub faces: FaceClient,
    pub engine: Arc<dyn Thumbnailer>,
}

impl AppState {
    /// Wire up the default state: pooled upstream clients and the stock
    /// JPEG engine.
    pub fn new(config: &ThumbdConfig) -> reqwest::Result<Self> {
        Ok(Self {
            stats: Arc::new(HttpStats::new()),
            fetcher: SourceFetcher::new(config)?,
            faces: FaceClient::new(config)?,
            engine: Arc::new(JpegEngine),
        })
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/server-status", get(status_handler))
        .route("/favicon.ico", get(favicon_handler))
        .fallback(thumb_handler)
        .with_state(state)
}

/// `GET /server-status`: plain-text `name value` counter dump plus a
/// version line. Read-only.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.stats.render(),
    )
}

async fn favicon_handler() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "404 Not Found\n")
}

/// The thumbnail pipeline. See the module docs for the step sequence.
async fn thumb_handler(State(state): State<AppState>, req: Request) -> Response {
    let timer = RequestTimer::start(Arc::clone(&state.stats));

    // The query string belongs to the target (source URLs carry signatures
    // and cache-busters), so parse path-and-query, not just the path.
    let path = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| req.uri().path())
        .to_owned();

    let parsed = match parse_path(&path) {
        Ok(parsed) => parsed,
        Err(err) => return fail(&state, err, HeaderMap::new(), timer),
    };

    // Face annotation is best-effort: its outcome lands in headers on every
    // subsequent branch, and it can never abort the pipeline.
    let mut face_headers = HeaderMap::new();
    if parsed.face_lookup {
        face_headers.insert("x-face-on", HeaderValue::from_static("1"));
        let lookup = state.faces.detect(&parsed.target.to_url()).await;
        debug!(target = parsed.target.as_str(), outcome = ?lookup, "face lookup finished");
        lookup.apply_headers(&mut face_headers);
    } else {
        face_headers.insert("x-face-on", HeaderValue::from_static("0"));
    }

    let source = match state.fetcher.fetch(&parsed.target.to_url()).await {
        Ok(source) => source,
        Err(err) => return fail(&state, err, face_headers, timer),
    };

    match state.engine.make_thumbnail(source, &parsed.params).await {
        Ok(encoded) => {
            state.stats.record_ok();
            info!(
                target = parsed.target.as_str(),
                width = parsed.params.width,
                height = parsed.params.height,
                bytes = encoded.len(),
                "thumbnail served"
            );
            success(face_headers, encoded, timer)
        }
        Err(err) => fail(&state, err.into(), face_headers, timer),
    }
}

fn success(mut headers: HeaderMap, encoded: Bytes, timer: RequestTimer) -> Response {
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/jpeg"));
    let last_modified = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
    if let Ok(value) = HeaderValue::from_str(&last_modified) {
        headers.insert(header::LAST_MODIFIED, value);
    }
    drop(timer);
    (StatusCode::OK, headers, Body::from(encoded)).into_response()
}

/// Terminal failure path: bump the one matching counter, log, and answer
/// with a human-readable plain-text body. The face headers accumulated so
/// far ride along so the response stays self-describing.
fn fail(state: &AppState, err: ThumbError, headers: HeaderMap, timer: RequestTimer) -> Response {
    err.record(&state.stats);
    warn!(
        status = %err.status_code(),
        counter = err.counter_name(),
        error = %err,
        "request failed"
    );
    drop(timer);
    (err.status_code(), headers, format!("{err}\n")).into_response()
}
