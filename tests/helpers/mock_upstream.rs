//! Mock upstream servers for integration testing: an image origin and a
//! face-detection service, each on an ephemeral port.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, RgbImage};
use serde_json::json;
use tokio::net::TcpListener;

/// Encode a small test JPEG in memory.
pub fn sample_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 7 % 256) as u8, (y * 5 % 256) as u8, 96])
    });
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, 90)
        .encode(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .expect("jpeg fixture");
    out
}

struct ImageOrigin {
    jpeg: Vec<u8>,
    hits: AtomicUsize,
}

/// Handle on a running mock image origin.
pub struct MockImageServer {
    pub addr: SocketAddr,
    state: Arc<ImageOrigin>,
}

impl MockImageServer {
    /// Serve `/img.jpg` (200, image bytes), `/missing` (404), and
    /// `/broken` (200, not an image). Every hit is counted.
    pub async fn start() -> Self {
        let state = Arc::new(ImageOrigin {
            jpeg: sample_jpeg(64, 48),
            hits: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/img.jpg", get(serve_image))
            .route("/missing", get(serve_missing))
            .route("/broken", get(serve_broken))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("image origin");
        });

        Self { addr, state }
    }

    /// Number of requests the origin has seen.
    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }
}

async fn serve_image(State(state): State<Arc<ImageOrigin>>) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "image/jpeg")],
        state.jpeg.clone(),
    )
}

async fn serve_missing(State(state): State<Arc<ImageOrigin>>) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    (StatusCode::NOT_FOUND, "no such image")
}

async fn serve_broken(State(state): State<Arc<ImageOrigin>>) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "image/jpeg")],
        "these bytes are not an image",
    )
}

/// Handle on a running mock face-detection service.
pub struct MockFaceServer {
    pub addr: SocketAddr,
}

impl MockFaceServer {
    /// Serve three POST endpoints covering the lookup outcomes:
    /// `/found` (one detection), `/empty` (no detections), `/error` (500).
    pub async fn start() -> Self {
        let app = Router::new()
            .route("/found", post(face_found))
            .route("/empty", post(face_empty))
            .route("/error", post(face_error));

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("face service");
        });

        Self { addr }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

async fn face_found() -> impl IntoResponse {
    axum::Json(json!([
        {
            "faceId": "e2f94d4a",
            "faceRectangle": {"top": 12, "left": 34, "width": 56, "height": 78},
            "attributes": {"gender": "male", "age": 27}
        }
    ]))
}

async fn face_empty() -> impl IntoResponse {
    axum::Json(json!([]))
}

async fn face_error() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "detection backend down")
}
