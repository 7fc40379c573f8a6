//! Runtime configuration.
//!
//! Defaults are compiled in, every knob can be overridden via `THUMBD_*`
//! environment variables, and the CLI flags in `main` take precedence over
//! both.

use std::time::Duration;

/// Default face-detection endpoint (Project Oxford detection API).
pub const DEFAULT_FACE_API_URL: &str =
    "https://api.projectoxford.ai/face/v0/detections?analyzesAge=true&analyzesGender=true";

/// Configuration for the upstream clients and the face-detection API.
#[derive(Debug, Clone)]
pub struct ThumbdConfig {
    /// Total timeout for each upstream HTTP request (source fetch and face
    /// detection alike).
    pub upstream_timeout: Duration,
    /// TCP/TLS connect timeout for upstream requests.
    pub connect_timeout: Duration,
    /// Face-detection endpoint URL.
    pub face_api_url: String,
    /// Subscription key sent with face-detection requests.
    pub face_api_key: String,
}

impl Default for ThumbdConfig {
    fn default() -> Self {
        Self {
            upstream_timeout: Duration::from_secs(3),
            connect_timeout: Duration::from_secs(3),
            face_api_url: DEFAULT_FACE_API_URL.to_string(),
            face_api_key: String::new(),
        }
    }
}

impl ThumbdConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// # Environment Variables
    ///
    /// - `THUMBD_UPSTREAM_TIMEOUT_SECS` (default: 3)
    /// - `THUMBD_CONNECT_TIMEOUT_SECS` (default: 3)
    /// - `THUMBD_FACE_API_URL` (default: the Project Oxford endpoint)
    /// - `THUMBD_FACE_API_KEY` (default: empty)
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            upstream_timeout: std::env::var("THUMBD_UPSTREAM_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.upstream_timeout),

            connect_timeout: std::env::var("THUMBD_CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.connect_timeout),

            face_api_url: std::env::var("THUMBD_FACE_API_URL")
                .ok()
                .unwrap_or(default.face_api_url),

            face_api_key: std::env::var("THUMBD_FACE_API_KEY")
                .ok()
                .unwrap_or(default.face_api_key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ThumbdConfig::default();
        assert_eq!(config.upstream_timeout, Duration::from_secs(3));
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.face_api_url, DEFAULT_FACE_API_URL);
        assert!(config.face_api_key.is_empty());
    }

    #[test]
    fn env_overrides_are_applied() {
        // Env var mutation is process-global; keep this test's variables
        // distinct from anything other tests read.
        std::env::set_var("THUMBD_UPSTREAM_TIMEOUT_SECS", "9");
        std::env::set_var("THUMBD_FACE_API_KEY", "secret");

        let config = ThumbdConfig::from_env();
        assert_eq!(config.upstream_timeout, Duration::from_secs(9));
        assert_eq!(config.face_api_key, "secret");

        std::env::remove_var("THUMBD_UPSTREAM_TIMEOUT_SECS");
        std::env::remove_var("THUMBD_FACE_API_KEY");
    }
}
