//! Source image fetcher.
//!
//! Fetches the raw source bytes from the target reference over HTTP with a
//! pooled client and bounded timeouts. Failures here are always upstream
//! failures: transport errors surface as 502, non-200 answers pass the
//! upstream status through.
//!
//! The fetched body is returned as a stream; dropping it on any exit path
//! releases the underlying connection back to the pool, so error returns
//! cannot leak connections.

use std::io;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::{Stream, StreamExt, TryStreamExt};
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::config::ThumbdConfig;
use crate::error::{ThumbError, ThumbResult};

/// The source image body as an async byte stream.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, io::Error>> + Send>>;

/// HTTP client for source images.
///
/// `Clone` is cheap; the underlying reqwest client pools connections
/// internally and can be shared across request tasks.
#[derive(Clone)]
pub struct SourceFetcher {
    client: Client,
}

impl SourceFetcher {
    /// Build a fetcher with the configured timeouts. No automatic retries:
    /// a single upstream failure is reported, not retried.
    pub fn new(config: &ThumbdConfig) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(config.upstream_timeout)
            .connect_timeout(config.connect_timeout)
            .tcp_nodelay(true)
            .build()?;
        Ok(Self { client })
    }

    /// Fetch the source image, yielding its body stream on HTTP 200.
    pub async fn fetch(&self, url: &str) -> ThumbResult<ByteStream> {
        debug!(url = %url, "fetching source image");

        let response = self.client.get(url).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "source fetch failed");
            ThumbError::Upstream {
                status: None,
                reason: e.to_string(),
            }
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(url = %url, status = %status, "source returned non-200");
            return Err(ThumbError::Upstream {
                // reqwest and axum pull in the same `http` version, so the
                // status converts via the u16 code.
                status: axum::http::StatusCode::from_u16(status.as_u16()).ok(),
                reason: format!("upstream returned HTTP {status}"),
            });
        }

        let stream = response
            .bytes_stream()
            .map_err(io::Error::other)
            .boxed();
        Ok(stream)
    }
}
