//! Error taxonomy for the thumbnailing pipeline.
//!
//! Every request failure falls into one of three classes, each with a fixed
//! HTTP mapping and exactly one operational counter:
//!
//! - `Argument` — malformed or out-of-bound request parameters (client
//!   caused, HTTP 400, `arg_error`)
//! - `Upstream` — source fetch or transport failure (HTTP 502, or the
//!   upstream's own status when it answered with a non-200, `upstream_error`)
//! - `Thumbnail` — processing failure inside the engine that is not
//!   attributable to transport (HTTP 500, `thumb_error`)
//!
//! Face-detection failures are absorbed by the face client and never become
//! a `ThumbError`.

use axum::http::StatusCode;
use thiserror::Error;

use crate::stats::HttpStats;

/// A classified request failure.
#[derive(Debug, Error)]
pub enum ThumbError {
    /// Malformed or out-of-bound request parameters.
    #[error("{0}")]
    Argument(String),

    /// Source fetch failed, either at the transport layer (`status: None`)
    /// or with a non-200 upstream response (`status: Some(..)`).
    #[error("upstream failed: {reason}")]
    Upstream {
        /// Upstream HTTP status, when the upstream answered at all.
        status: Option<StatusCode>,
        reason: String,
    },

    /// The thumbnailing engine failed to produce an image.
    #[error("thumbnailing failed: {0}")]
    Thumbnail(String),
}

/// Result type alias for pipeline operations.
pub type ThumbResult<T> = Result<T, ThumbError>;

impl ThumbError {
    /// HTTP status this failure surfaces as. A non-200 upstream answer is
    /// passed through verbatim; pure transport failures map to 502.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Argument(_) => StatusCode::BAD_REQUEST,
            Self::Upstream { status, .. } => status.unwrap_or(StatusCode::BAD_GATEWAY),
            Self::Thumbnail(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Counter name for logging, matching the `/server-status` output.
    pub fn counter_name(&self) -> &'static str {
        match self {
            Self::Argument(_) => "arg_error",
            Self::Upstream { .. } => "upstream_error",
            Self::Thumbnail(_) => "thumb_error",
        }
    }

    /// Increment the one counter that corresponds to this failure class.
    pub fn record(&self, stats: &HttpStats) {
        match self {
            Self::Argument(_) => stats.record_arg_error(),
            Self::Upstream { .. } => stats.record_upstream_error(),
            Self::Thumbnail(_) => stats.record_thumb_error(),
        }
    }
}
