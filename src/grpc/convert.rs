//! Wire (protobuf) <-> internal type conversions for the capture ingest RPC.

use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};

use crate::error::{CaptureError, Result};
use crate::grpc::pb;
use crate::types::{CaptureRecord, Direction, RequestPart, ResponsePart};

fn header_values(map: std::collections::HashMap<String, pb::HeaderValues>) -> BTreeMap<String, Vec<String>> {
    map.into_iter().map(|(k, v)| (k, v.values)).collect()
}

fn query_values(map: std::collections::HashMap<String, pb::QueryValues>) -> BTreeMap<String, Vec<String>> {
    map.into_iter().map(|(k, v)| (k, v.values)).collect()
}

/// Convert a wire `CaptureRecord` into the internal shape. Fails only on
/// structurally missing fields (absent `request`/`response` messages);
/// content-level validation (method/path/status bounds) happens afterward in
/// the Collector pipeline.
pub fn from_wire(record: pb::CaptureRecord) -> Result<CaptureRecord> {
    let direction = match pb::Direction::try_from(record.direction).unwrap_or(pb::Direction::Unspecified) {
        pb::Direction::Inbound => Direction::Inbound,
        pb::Direction::Outbound => Direction::Outbound,
        pb::Direction::Unspecified => {
            return Err(CaptureError::validation("direction must be specified"));
        }
    };

    let request = record.request.ok_or_else(|| CaptureError::validation("request is required"))?;
    let response = record.response.ok_or_else(|| CaptureError::validation("response is required"))?;

    let observed_at = Utc
        .timestamp_millis_opt(record.observed_at_unix_ms)
        .single()
        .ok_or_else(|| CaptureError::validation("observed_at_unix_ms is out of range"))?;

    Ok(CaptureRecord {
        direction,
        request: RequestPart {
            method: request.method,
            path: request.path,
            query: query_values(request.query),
            headers: header_values(request.headers),
            body: request.body,
            body_truncated: false,
        },
        response: ResponsePart {
            status: response.status.min(u16::MAX as u32) as u16,
            headers: header_values(response.headers),
            body: response.body,
            body_truncated: false,
        },
        observed_at,
        source_labels: map_to_btree_string(record.source_labels),
    })
}

fn map_to_btree_string(map: std::collections::HashMap<String, String>) -> BTreeMap<String, String> {
    map.into_iter().collect()
}

/// Build an acknowledgement from a pipeline [`crate::collector::Outcome`].
pub fn ack_for(outcome: &crate::collector::Outcome) -> pb::CaptureAck {
    match outcome {
        crate::collector::Outcome::Accepted => {
            pb::CaptureAck { accepted: true, duplicate: false, dropped_reason: String::new() }
        }
        crate::collector::Outcome::Duplicate => {
            pb::CaptureAck { accepted: false, duplicate: true, dropped_reason: String::new() }
        }
        crate::collector::Outcome::Dropped { reason } => {
            pb::CaptureAck { accepted: false, duplicate: false, dropped_reason: reason.to_string() }
        }
    }
}
