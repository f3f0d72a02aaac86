//! Pure, deterministic redaction of capture records.
//!
//! [`Sanitizer::sanitize`] never fails outright: it returns [`SanitizeOutcome::Leak`]
//! rather than raising, which the Collector turns into a dropped record and a
//! `sanitizer.leak_detected` counter bump. This is the exception-for-control-flow
//! pattern re-expressed as a result value (see DESIGN.md).

pub mod json_walk;
pub mod patterns;

use std::collections::BTreeMap;

use crate::types::{CaptureRecord, RequestPart, ResponsePart, SanitizedCapture};
use json_walk::sanitize_json;
use patterns::PatternCatalog;

/// Header-value marker used regardless of content for denied header names.
pub const HEADER_DENYLIST_MARKER: &str = "SANITIZED_HEADER";

/// Result of a sanitize pass: either the sanitized record, or a fail-closed leak
/// verdict naming the pattern that still matched the re-scan.
pub enum SanitizeOutcome {
    Sanitized(SanitizedCapture),
    Leak { pattern: String },
}

pub struct Sanitizer {
    catalog: PatternCatalog,
    header_denylist: Vec<String>,
    field_denylist: Vec<String>,
}

impl Sanitizer {
    pub fn new(catalog: PatternCatalog, header_denylist: Vec<String>, field_denylist: Vec<String>) -> Self {
        Self { catalog, header_denylist, field_denylist }
    }

    /// Sanitize a capture record. Pure, deterministic, total: identical input and
    /// configuration always produce identical output bytes.
    pub fn sanitize(&self, record: &CaptureRecord) -> SanitizeOutcome {
        let mut report = BTreeMap::new();

        let request = RequestPart {
            method: record.request.method.to_uppercase(),
            path: record.request.path.clone(),
            query: self.sanitize_value_map(&record.request.query, &mut report),
            headers: self.sanitize_header_map(&record.request.headers, &mut report),
            body: self.sanitize_body(&record.request.body, record.request.body_truncated, &mut report),
            body_truncated: record.request.body_truncated,
        };

        let response = ResponsePart {
            status: record.response.status,
            headers: self.sanitize_header_map(&record.response.headers, &mut report),
            body: self.sanitize_body(&record.response.body, record.response.body_truncated, &mut report),
            body_truncated: record.response.body_truncated,
        };

        if let Some(pattern) = self.rescan(&request, &response) {
            return SanitizeOutcome::Leak { pattern: pattern.to_string() };
        }

        SanitizeOutcome::Sanitized(SanitizedCapture {
            direction: record.direction,
            request,
            response,
            observed_at: record.observed_at,
            source_labels: record.source_labels.clone(),
            sanitization_report: report,
        })
    }

    fn sanitize_header_map(
        &self,
        headers: &BTreeMap<String, Vec<String>>,
        report: &mut BTreeMap<String, u32>,
    ) -> BTreeMap<String, Vec<String>> {
        let mut out = BTreeMap::new();
        for (name, values) in headers {
            let lower = name.to_lowercase();
            if self.header_denylist.iter().any(|denied| denied == &lower) {
                *report.entry(format!("{}_header", lower)).or_insert(0) += values.len() as u32;
                out.insert(name.clone(), vec![HEADER_DENYLIST_MARKER.to_string(); values.len()]);
            } else {
                out.insert(
                    name.clone(),
                    values.iter().map(|v| self.catalog.apply(v, report)).collect(),
                );
            }
        }
        out
    }

    fn sanitize_value_map(
        &self,
        values_by_key: &BTreeMap<String, Vec<String>>,
        report: &mut BTreeMap<String, u32>,
    ) -> BTreeMap<String, Vec<String>> {
        values_by_key
            .iter()
            .map(|(key, values)| {
                (key.clone(), values.iter().map(|v| self.catalog.apply(v, report)).collect())
            })
            .collect()
    }

    fn sanitize_body(&self, body: &[u8], truncated: bool, report: &mut BTreeMap<String, u32>) -> Vec<u8> {
        if truncated || body.is_empty() {
            // Truncated/empty bodies are treated as opaque binary; never scanned.
            return body.to_vec();
        }

        if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
            let sanitized = sanitize_json(&value, &self.catalog, &self.field_denylist, report);
            return serde_json::to_vec(&sanitized).unwrap_or_else(|_| body.to_vec());
        }

        match std::str::from_utf8(body) {
            Ok(text) => self.catalog.apply(text, report).into_bytes(),
            Err(_) => body.to_vec(),
        }
    }

    /// Re-scan every sanitized string surface for a surviving pattern match. This is
    /// the belt-and-braces check: the pattern list is consulted twice per record, not
    /// a general loop (see DESIGN.md).
    fn rescan(&self, request: &RequestPart, response: &ResponsePart) -> Option<&str> {
        let mut surfaces: Vec<String> = Vec::new();

        for values in request.headers.values().chain(response.headers.values()) {
            surfaces.extend(values.iter().cloned());
        }
        for values in request.query.values() {
            surfaces.extend(values.iter().cloned());
        }
        if !request.body_truncated {
            if let Ok(text) = std::str::from_utf8(&request.body) {
                surfaces.push(text.to_string());
            }
        }
        if !response.body_truncated {
            if let Ok(text) = std::str::from_utf8(&response.body) {
                surfaces.push(text.to_string());
            }
        }

        for surface in &surfaces {
            if let Some(pattern) = self.catalog.first_match(surface) {
                return self.catalog.patterns().iter().find(|p| p.name == pattern).map(|p| p.name.as_str());
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction;
    use chrono::Utc;

    fn sanitizer() -> Sanitizer {
        Sanitizer::new(
            PatternCatalog::compile(&PatternCatalog::default_configs()).unwrap(),
            PatternCatalog::default_header_denylist(),
            PatternCatalog::default_field_name_denylist(),
        )
    }

    fn base_record() -> CaptureRecord {
        CaptureRecord {
            direction: Direction::Inbound,
            request: RequestPart {
                method: "get".to_string(),
                path: "/v1/users/42".to_string(),
                query: BTreeMap::new(),
                headers: BTreeMap::new(),
                body: Vec::new(),
                body_truncated: false,
            },
            response: ResponsePart {
                status: 200,
                headers: BTreeMap::new(),
                body: br#"{"id":42,"name":"John"}"#.to_vec(),
                body_truncated: false,
            },
            observed_at: Utc::now(),
            source_labels: BTreeMap::new(),
        }
    }

    #[test]
    fn jwt_in_authorization_header_is_redacted_wholesale() {
        let mut record = base_record();
        record.request.headers.insert(
            "authorization".to_string(),
            vec!["Bearer eyJhbGciOiJIUzI1NiJ9.eyJzdWIiOiJqb2huIn0.sig".to_string()],
        );

        match sanitizer().sanitize(&record) {
            SanitizeOutcome::Sanitized(capture) => {
                assert_eq!(
                    capture.request.headers["authorization"],
                    vec![HEADER_DENYLIST_MARKER.to_string()]
                );
                assert_eq!(capture.sanitization_report.get("authorization_header"), Some(&1));
            }
            SanitizeOutcome::Leak { pattern } => panic!("unexpected leak: {pattern}"),
        }
    }

    #[test]
    fn credit_card_in_json_body_is_redacted_field_by_field() {
        let mut record = base_record();
        record.request.method = "POST".to_string();
        record.request.path = "/pay".to_string();
        record.request.body = br#"{"card":"4111111111111111","amount":10}"#.to_vec();

        match sanitizer().sanitize(&record) {
            SanitizeOutcome::Sanitized(capture) => {
                let body: serde_json::Value = serde_json::from_slice(&capture.request.body).unwrap();
                assert_eq!(body["card"], serde_json::json!("SANITIZED_CREDIT_CARD"));
                assert_eq!(body["amount"], serde_json::json!(10));
            }
            SanitizeOutcome::Leak { pattern } => panic!("unexpected leak: {pattern}"),
        }
    }

    #[test]
    fn marker_from_a_previous_run_does_not_trigger_a_false_leak() {
        let mut record = base_record();
        record.request.headers.insert(
            "x-previous-marker".to_string(),
            vec!["SANITIZED_EMAIL already redacted upstream".to_string()],
        );

        match sanitizer().sanitize(&record) {
            SanitizeOutcome::Sanitized(_) => {}
            SanitizeOutcome::Leak { pattern } => panic!("marker text falsely re-triggered leak: {pattern}"),
        }
    }

    #[test]
    fn truncated_body_is_passed_through_opaque() {
        let mut record = base_record();
        record.response.body = b"not valid json and not scanned".to_vec();
        record.response.body_truncated = true;

        match sanitizer().sanitize(&record) {
            SanitizeOutcome::Sanitized(capture) => {
                assert_eq!(capture.response.body, record.response.body);
            }
            SanitizeOutcome::Leak { pattern } => panic!("unexpected leak: {pattern}"),
        }
    }
}
