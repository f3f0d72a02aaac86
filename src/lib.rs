//! meshcap - captures sidecar-observed HTTP/gRPC traffic, sanitizes it of
//! credentials and PII, deduplicates repeat traffic, and replays the
//! surviving requests as mock-server rules so a canary environment's
//! downstream dependencies can be stubbed from real production shapes.

pub mod collector;
pub mod config;
pub mod dedup;
pub mod error;
pub mod grpc;
pub mod http;
pub mod metrics;
pub mod queue;
pub mod rule_loader;
pub mod sanitizer;
pub mod startup;
pub mod types;

pub use error::{CaptureError, Result};

/// Version information, surfaced in the startup banner and `/health` payload.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration file name, searched for relative to the working
/// directory before falling back to built-in defaults and environment overrides.
pub const DEFAULT_CONFIG_FILE: &str = "meshcap.yaml";
