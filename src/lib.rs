//! thumbd - HTTP image-thumbnailing proxy.
//!
//! A client asks for `/<k=v,...>/<target>`; thumbd fetches the source image
//! from `<target>`, optionally annotates the response with face-detection
//! headers from an external service, hands the bytes to a pluggable
//! thumbnailing engine, and streams back the encoded JPEG. Operational
//! counters are exposed as plain text at `/server-status`.
//!
//! # Pipeline
//!
//! parse -> (optional) face annotation -> source fetch -> engine -> respond
//!
//! Face annotation is best-effort and never fails a request; source-fetch
//! and engine-transport failures are upstream errors (502 or the upstream's
//! own status); engine processing failures are thumbnail errors (500).

pub mod config;
pub mod engine;
pub mod error;
pub mod face;
pub mod fetch;
pub mod params;
pub mod service;
pub mod stats;
