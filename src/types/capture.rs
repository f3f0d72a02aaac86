use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which leg of a sidecar-observed connection this capture represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// The request side of a capture. Header and query names are stored as given by the
/// sidecar (headers are expected lower-cased already); values are kept as lists since
/// both headers and query strings may repeat a key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestPart {
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub query: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub headers: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub body: Vec<u8>,
    /// Set when `body` was truncated to the configured max at ingest.
    #[serde(default)]
    pub body_truncated: bool,
}

/// The response side of a capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsePart {
    pub status: u16,
    #[serde(default)]
    pub headers: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub body: Vec<u8>,
    #[serde(default)]
    pub body_truncated: bool,
}

/// One observed request/response pair forwarded by a sidecar tap, exactly as received
/// at the Collector's ingest RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub direction: Direction,
    pub request: RequestPart,
    pub response: ResponsePart,
    pub observed_at: DateTime<Utc>,
    #[serde(default)]
    pub source_labels: BTreeMap<String, String>,
}

/// Same shape as [`CaptureRecord`], with every pattern match in headers, query values,
/// and body replaced by a marker literal. Carries the sanitization audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizedCapture {
    pub direction: Direction,
    pub request: RequestPart,
    pub response: ResponsePart,
    pub observed_at: DateTime<Utc>,
    pub source_labels: BTreeMap<String, String>,
    /// Pattern name -> number of substitutions made across the whole record.
    pub sanitization_report: BTreeMap<String, u32>,
}
