//! Error types for the capture pipeline.
//!
//! Error kinds follow the propagation policy: transient I/O is recovered
//! locally by retry, record-level errors never abort a pipeline worker, and
//! configuration errors are the only kind allowed to be fatal at startup.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CaptureError>;

/// Top-level error type for the Collector and Rule Loader binaries.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// Refuse-to-start configuration problems (bad pattern catalog, zero cache size, ...).
    #[error("configuration error: {message}")]
    Config { message: String },

    /// A CaptureRecord failed shape/bound validation at ingest.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The post-sanitization re-scan still matched a pattern; the record is dropped.
    #[error("sanitization leak detected in pattern '{pattern}'")]
    Leak { pattern: String },

    /// The staging channel stayed full past `enqueue_timeout`.
    #[error("backpressure: staging channel full")]
    Backpressure,

    /// Queue connectivity or protocol error, retried internally before surfacing here.
    #[error("queue error: {message}")]
    Queue { message: String },

    /// Mock-server install failed after exhausting retries, or was rejected outright.
    #[error("install error ({kind}): {message}")]
    Install { kind: InstallErrorKind, message: String },

    /// IO errors (backup sink, config file reads).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML config parsing errors.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON (de)serialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors talking to the mock-server admin API.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Redis queue backend errors.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Catch-all for unexpected internal errors.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Classification of an install failure, used to decide retry vs. dead-letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallErrorKind {
    /// 5xx or transport failure; retried up to `retry_attempts`.
    Transient,
    /// 4xx other than 409; dead-lettered immediately.
    Permanent,
}

impl std::fmt::Display for InstallErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstallErrorKind::Transient => write!(f, "transient"),
            InstallErrorKind::Permanent => write!(f, "permanent"),
        }
    }
}

impl CaptureError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into() }
    }

    pub fn leak<S: Into<String>>(pattern: S) -> Self {
        Self::Leak { pattern: pattern.into() }
    }

    pub fn queue<S: Into<String>>(message: S) -> Self {
        Self::Queue { message: message.into() }
    }

    pub fn install<S: Into<String>>(kind: InstallErrorKind, message: S) -> Self {
        Self::Install { kind, message: message.into() }
    }

    /// Whether this error should be retried by the Queue adapter's internal retry loop.
    pub fn is_queue_retryable(&self) -> bool {
        matches!(self, CaptureError::Redis(_) | CaptureError::Io(_))
    }

    /// Stable category label, safe to attach to metrics and log lines (never carries
    /// capture payload bytes).
    pub fn category(&self) -> &'static str {
        match self {
            CaptureError::Config { .. } => "config",
            CaptureError::Validation { .. } => "validation",
            CaptureError::Leak { .. } => "leak",
            CaptureError::Backpressure => "backpressure",
            CaptureError::Queue { .. } => "queue",
            CaptureError::Install { kind: InstallErrorKind::Transient, .. } => "install_transient",
            CaptureError::Install { kind: InstallErrorKind::Permanent, .. } => "install_permanent",
            CaptureError::Io(_) => "io",
            CaptureError::Yaml(_) => "yaml",
            CaptureError::Json(_) => "json",
            CaptureError::Http(_) => "http",
            CaptureError::Redis(_) => "redis",
            CaptureError::Internal(_) => "internal",
        }
    }
}
