//! The parameter mini-language embedded in the request path.
//!
//! A thumbnail request looks like
//!
//! ```text
//! /w=160,h=120,q=85,f=1/images.example.com/cat.jpg?sig=abc
//! ```
//!
//! The path splits at the first `/` after the leading one into a parameter
//! block and a target reference; everything after that first split belongs
//! to the target, including any further slashes and the query string.
//! Parsing is a pure function of the path; validation is the only gate
//! between raw input and the thumbnailing engine.

use crate::error::{ThumbError, ThumbResult};

/// Largest accepted width or height.
pub const MAX_DIMENSION: i64 = 65_000;
/// Largest accepted `width * height` product.
pub const MAX_PIXELS: i64 = 10_000_000;

/// Validated transform parameters, safe to hand to a [`Thumbnailer`].
///
/// [`Thumbnailer`]: crate::engine::Thumbnailer
#[derive(Debug, Clone, PartialEq)]
pub struct TransformParams {
    pub width: u32,
    pub height: u32,
    /// JPEG quality in `[0, 100]`.
    pub quality: u8,
    /// Allow enlarging a source smaller than the requested dimensions.
    pub upscale: bool,
    /// Stretch to exactly `width x height` instead of fitting within them.
    pub force_aspect: bool,
    /// Hint for encoders that support entropy optimization.
    pub optimize: bool,
    /// Cheap-prescale factor applied before the final resize pass.
    pub prescale_factor: f64,
}

/// The remainder of the path after parameter extraction: where to fetch the
/// source image from. Scheme is defaulted to `http`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRef(String);

impl TargetRef {
    /// The fully-qualified URL to fetch.
    pub fn to_url(&self) -> String {
        format!("http://{}", self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Everything one request needs from its path: validated parameters, the
/// per-request face-lookup toggle, and the target reference.
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbRequest {
    pub params: TransformParams,
    /// Whether this request asked for face annotation (`f=1`). Carried per
    /// request so concurrent requests cannot interfere.
    pub face_lookup: bool,
    pub target: TargetRef,
}

/// Parse and validate a request path (including any query string, which is
/// part of the target).
pub fn parse_path(path: &str) -> ThumbResult<ThumbRequest> {
    let rest = path
        .strip_prefix('/')
        .ok_or_else(|| ThumbError::Argument("path must start with '/'".into()))?;

    let (arg_block, target) = rest.split_once('/').ok_or_else(|| {
        ThumbError::Argument("path needs to have at least two components".into())
    })?;

    // Defaults; width and height have no default and must be supplied.
    let mut width: i64 = 0;
    let mut height: i64 = 0;
    let mut quality: i64 = 90;
    let mut upscale = true;
    let mut force_aspect = true;
    let mut optimize = false;
    let mut prescale_factor: f64 = 2.0;
    let mut face_lookup = false;

    for arg in arg_block.split(',') {
        let (key, value) = arg.split_once('=').ok_or_else(|| {
            ThumbError::Argument("arguments must have the form name=value".into())
        })?;
        match key {
            "w" | "h" | "q" | "u" | "a" | "o" | "f" => {
                let val: i64 = value.parse().map_err(|_| {
                    ThumbError::Argument(format!("invalid integer value for {key}"))
                })?;
                match key {
                    "w" => width = val,
                    "h" => height = val,
                    "q" => quality = val,
                    "u" => upscale = val != 0,
                    "a" => force_aspect = val != 0,
                    "o" => optimize = val != 0,
                    "f" => face_lookup = val != 0,
                    _ => unreachable!(),
                }
            }
            "p" => {
                prescale_factor = value.parse().map_err(|_| {
                    ThumbError::Argument(format!("invalid float value for {key}"))
                })?;
            }
            // Unrecognized keys are ignored so new clients can talk to old
            // servers.
            _ => {}
        }
    }

    if width <= 0 || width > MAX_DIMENSION {
        return Err(ThumbError::Argument(
            "width (w) not specified or out of range".into(),
        ));
    }
    if height <= 0 || height > MAX_DIMENSION {
        return Err(ThumbError::Argument(
            "height (h) not specified or out of range".into(),
        ));
    }
    if width * height > MAX_PIXELS {
        return Err(ThumbError::Argument(
            "image dimensions exceed the pixel limit".into(),
        ));
    }
    if !(0..=100).contains(&quality) {
        return Err(ThumbError::Argument(
            "quality (q) must be between 0 and 100".into(),
        ));
    }
    if !(prescale_factor > 0.0) {
        return Err(ThumbError::Argument(
            "prescale factor (p) must be positive".into(),
        ));
    }

    Ok(ThumbRequest {
        params: TransformParams {
            width: width as u32,
            height: height as u32,
            quality: quality as u8,
            upscale,
            force_aspect,
            optimize,
            prescale_factor,
        },
        face_lookup,
        target: TargetRef(target.to_string()),
    })
}
