//! The thumbnailing engine seam and the stock JPEG engine.
//!
//! The orchestrator talks to a [`Thumbnailer`] trait object, so the pixel
//! engine can be swapped (or mocked in tests) without touching the request
//! pipeline. Engine failures carry an explicit kind instead of relying on
//! error downcasting: a `Transport` failure originated in the source byte
//! stream and is the upstream's fault; a `Processing` failure happened in
//! decode/resize/encode and is ours.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType};
use thiserror::Error;
use tracing::debug;

use crate::error::ThumbError;
use crate::fetch::ByteStream;
use crate::params::TransformParams;

/// Where an engine failure originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailErrorKind {
    /// Failure while reading the source byte stream; classified as an
    /// upstream failure by the orchestrator.
    Transport,
    /// Failure in decode, resize, or encode.
    Processing,
}

/// A tagged engine failure.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ThumbnailError {
    pub kind: ThumbnailErrorKind,
    message: String,
}

impl ThumbnailError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: ThumbnailErrorKind::Transport,
            message: message.into(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self {
            kind: ThumbnailErrorKind::Processing,
            message: message.into(),
        }
    }
}

impl From<ThumbnailError> for ThumbError {
    fn from(err: ThumbnailError) -> Self {
        match err.kind {
            ThumbnailErrorKind::Transport => ThumbError::Upstream {
                status: None,
                reason: err.to_string(),
            },
            ThumbnailErrorKind::Processing => ThumbError::Thumbnail(err.to_string()),
        }
    }
}

/// The image-processing engine invoked with the fetched byte stream and the
/// validated parameters.
#[async_trait]
pub trait Thumbnailer: Send + Sync {
    /// Consume the source stream and produce the encoded thumbnail.
    async fn make_thumbnail(
        &self,
        source: ByteStream,
        params: &TransformParams,
    ) -> Result<Bytes, ThumbnailError>;
}

/// Stock engine backed by the `image` crate: decode anything `image`
/// understands, resize, re-encode as JPEG.
///
/// The `optimize` parameter is accepted but has no effect here; the JPEG
/// encoder in `image` has no entropy-optimization switch.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegEngine;

#[async_trait]
impl Thumbnailer for JpegEngine {
    async fn make_thumbnail(
        &self,
        mut source: ByteStream,
        params: &TransformParams,
    ) -> Result<Bytes, ThumbnailError> {
        // Drain the stream first so transport failures stay distinguishable
        // from pixel-level ones.
        let mut data = Vec::new();
        while let Some(chunk) = source.next().await {
            let chunk = chunk
                .map_err(|e| ThumbnailError::transport(format!("reading source image: {e}")))?;
            data.extend_from_slice(&chunk);
        }

        let params = params.clone();
        // Decode/resize/encode is CPU-bound; keep it off the async workers.
        tokio::task::spawn_blocking(move || render_jpeg(&data, &params))
            .await
            .map_err(|e| ThumbnailError::processing(format!("render task failed: {e}")))?
    }
}

fn render_jpeg(data: &[u8], params: &TransformParams) -> Result<Bytes, ThumbnailError> {
    let img = image::load_from_memory(data)
        .map_err(|e| ThumbnailError::processing(format!("decoding source image: {e}")))?;

    let (target_w, target_h) = target_dimensions(img.width(), img.height(), params);
    debug!(
        src_w = img.width(),
        src_h = img.height(),
        target_w,
        target_h,
        "rendering thumbnail"
    );

    let img = prescale(img, target_w, target_h, params.prescale_factor);
    let resized = if params.force_aspect {
        img.resize_exact(target_w, target_h, FilterType::Lanczos3)
    } else {
        img.resize(target_w, target_h, FilterType::Lanczos3)
    };

    let rgb = resized.to_rgb8();
    let mut out = Vec::new();
    // The encoder rejects quality 0; q=0 means "worst acceptable".
    let quality = params.quality.max(1);
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| ThumbnailError::processing(format!("encoding thumbnail: {e}")))?;

    Ok(Bytes::from(out))
}

/// Requested dimensions, clamped to the source size when upscaling is off.
fn target_dimensions(src_w: u32, src_h: u32, params: &TransformParams) -> (u32, u32) {
    if !params.upscale && src_w <= params.width && src_h <= params.height {
        (src_w, src_h)
    } else {
        (params.width, params.height)
    }
}

/// Cheap pre-pass: when the source is much larger than the target, shrink
/// it with a fast filter down to `prescale_factor x target` first so the
/// final high-quality resize works on far fewer pixels.
fn prescale(img: DynamicImage, target_w: u32, target_h: u32, factor: f64) -> DynamicImage {
    let pre_w = (f64::from(target_w) * factor).ceil() as u32;
    let pre_h = (f64::from(target_h) * factor).ceil() as u32;
    if img.width() > pre_w && img.height() > pre_h {
        img.resize(pre_w, pre_h, FilterType::Triangle)
    } else {
        img
    }
}
