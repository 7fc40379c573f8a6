//! Best-effort face-detection client.
//!
//! Given the target URL, asks the external detection API whether the image
//! contains a face and, if so, where and what it looks like. This is an
//! advisory annotation: the client API is infallible, every failure mode
//! (transport error, non-200 response, empty or unparseable detection list)
//! degrades to a non-`Found` outcome and the thumbnail pipeline continues.
//!
//! The outcome renders itself into `X-Face-*` response headers so the
//! caller can always tell exactly what happened, on success and failure
//! responses alike.

use axum::http::{HeaderMap, HeaderValue, StatusCode};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::ThumbdConfig;

/// Bounding box of the first detected face.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceRectangle {
    pub top: i32,
    pub left: i32,
    pub width: i32,
    pub height: i32,
}

/// Attributes reported for the detected face.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceAttributes {
    pub gender: String,
    pub age: i32,
}

/// One detection record from the API. The service returns a JSON array of
/// these; only the first entry is used.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceDetection {
    pub face_rectangle: FaceRectangle,
    pub attributes: FaceAttributes,
}

/// Outcome of a face lookup. Absence of a face is a valid, expected
/// outcome, not an error; so is a misbehaving detection service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaceLookup {
    /// The service answered 200 with at least one detection.
    Found {
        status: StatusCode,
        detection: FaceDetection,
    },
    /// The service answered 200 with an empty (or unusable) detection list.
    NotFound { status: StatusCode },
    /// The service answered with a non-success status.
    ServiceError { status: StatusCode },
    /// The request never completed (connect failure, timeout, ...).
    TransportError,
}

impl FaceLookup {
    /// Render this outcome into response headers. `X-Face-Contains` is set
    /// for every outcome so the header set is self-describing; the upstream
    /// status headers are set whenever the service answered at all.
    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        match self {
            Self::Found { status, detection } => {
                set_status_headers(headers, *status);
                headers.insert("x-face-contains", HeaderValue::from_static("1"));
                let rect = &detection.face_rectangle;
                headers.insert("x-face-facerectangle-top", HeaderValue::from(rect.top));
                headers.insert("x-face-facerectangle-left", HeaderValue::from(rect.left));
                headers.insert("x-face-facerectangle-width", HeaderValue::from(rect.width));
                headers.insert("x-face-facerectangle-height", HeaderValue::from(rect.height));
                if let Ok(gender) = HeaderValue::from_str(&detection.attributes.gender) {
                    headers.insert("x-face-attributes-gender", gender);
                }
                headers.insert(
                    "x-face-attributes-age",
                    HeaderValue::from(detection.attributes.age),
                );
            }
            Self::NotFound { status } | Self::ServiceError { status } => {
                set_status_headers(headers, *status);
                headers.insert("x-face-contains", HeaderValue::from_static("0"));
            }
            Self::TransportError => {
                headers.insert("x-face-contains", HeaderValue::from_static("0"));
            }
        }
    }
}

fn set_status_headers(headers: &mut HeaderMap, status: StatusCode) {
    let text = match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&text) {
        headers.insert("x-face-http-status", value);
    }
    headers.insert(
        "x-face-http-status-code",
        HeaderValue::from(status.as_u16()),
    );
}

/// Client for the external face-detection service.
#[derive(Clone)]
pub struct FaceClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl FaceClient {
    pub fn new(config: &ThumbdConfig) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(config.upstream_timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: config.face_api_url.clone(),
            api_key: config.face_api_key.clone(),
        })
    }

    /// Look up face metadata for the image at `target_url`. Never fails;
    /// see [`FaceLookup`] for the degradation ladder.
    pub async fn detect(&self, target_url: &str) -> FaceLookup {
        let request = self
            .client
            .post(&self.endpoint)
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .json(&serde_json::json!({ "url": target_url }));

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %target_url, error = %e, "face lookup transport failure");
                return FaceLookup::TransportError;
            }
        };

        let status =
            StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
        if status != StatusCode::OK {
            debug!(url = %target_url, status = %status, "face service returned non-200");
            return FaceLookup::ServiceError { status };
        }

        let detections: Vec<FaceDetection> = match response.json().await {
            Ok(detections) => detections,
            Err(e) => {
                warn!(url = %target_url, error = %e, "face response did not parse");
                return FaceLookup::NotFound { status };
            }
        };

        match detections.into_iter().next() {
            Some(detection) => {
                debug!(url = %target_url, "face detected");
                FaceLookup::Found { status, detection }
            }
            None => FaceLookup::NotFound { status },
        }
    }
}
