//! The per-record Collector pipeline: validate, sanitize, fingerprint, deduplicate,
//! stage. Everything here runs on the ingest handler's own task; the only
//! suspension point is the bounded send into the staging channel (see
//! [`crate::collector::staging`]).

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::dedup::{Deduplicator, Observation};
use crate::sanitizer::{Sanitizer, SanitizeOutcome};
use crate::types::{
    BodyPredicate, CaptureRecord, DescriptorMetadata, Fingerprint, MatchBlock, MockRuleDescriptor,
    RequestPart, ResponseBlock, ResponsePart,
};

/// Outcome of running one capture through the pipeline, translated by the gRPC
/// layer into a `CaptureAck`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Accepted,
    Duplicate,
    Dropped { reason: &'static str },
}

pub struct Pipeline {
    sanitizer: Sanitizer,
    dedup: Deduplicator,
    staging_tx: mpsc::Sender<MockRuleDescriptor>,
    max_body_bytes: usize,
    fingerprint_body_limit: usize,
    enqueue_timeout: Duration,
    static_source_labels: BTreeMap<String, String>,
}

impl Pipeline {
    pub fn new(
        sanitizer: Sanitizer,
        dedup: Deduplicator,
        staging_tx: mpsc::Sender<MockRuleDescriptor>,
        max_body_bytes: usize,
        fingerprint_body_limit: usize,
        enqueue_timeout: Duration,
        static_source_labels: BTreeMap<String, String>,
    ) -> Self {
        Self {
            sanitizer,
            dedup,
            staging_tx,
            max_body_bytes,
            fingerprint_body_limit,
            enqueue_timeout,
            static_source_labels,
        }
    }

    /// Validate shape/bounds, truncate oversized bodies, sanitize, fingerprint,
    /// deduplicate, and stage the survivor. Never panics; every failure mode is a
    /// variant of [`Outcome`].
    pub async fn process(&self, mut record: CaptureRecord) -> Outcome {
        if let Err(reason) = validate_shape(&record) {
            warn!(%reason, "rejecting malformed capture record");
            crate::metrics::record_request("validation_error");
            return Outcome::Dropped { reason: "validation" };
        }

        truncate_body(&mut record.request, self.max_body_bytes);
        truncate_body(&mut record.response, self.max_body_bytes);

        let sanitized = match self.sanitizer.sanitize(&record) {
            SanitizeOutcome::Sanitized(capture) => capture,
            SanitizeOutcome::Leak { pattern } => {
                warn!(pattern = %pattern, "sanitizer re-scan detected a leak; dropping capture");
                crate::metrics::record_leak_detected();
                crate::metrics::record_request("leak");
                return Outcome::Dropped { reason: "leak" };
            }
        };
        for (pattern, count) in &sanitized.sanitization_report {
            crate::metrics::record_sanitization(pattern, *count);
        }

        let fingerprint = Fingerprint::compute(
            &sanitized.request.method,
            &sanitized.request.path,
            &sanitized.request.query,
            &sanitized.request.body,
            self.fingerprint_body_limit,
        );

        match self.dedup.observe(fingerprint.clone()) {
            Observation::Duplicate => {
                crate::metrics::record_dedup("duplicate");
                crate::metrics::record_request("duplicate");
                Outcome::Duplicate
            }
            Observation::Fresh => {
                crate::metrics::record_dedup("fresh");
                let descriptor = build_descriptor(&sanitized, &fingerprint, &self.static_source_labels);

                match self.staging_tx.send_timeout(descriptor, self.enqueue_timeout).await {
                    Ok(()) => {
                        crate::metrics::record_request("accepted");
                        Outcome::Accepted
                    }
                    Err(_) => {
                        warn!("staging channel full past enqueue_timeout; dropping capture");
                        crate::metrics::record_request("backpressure");
                        Outcome::Dropped { reason: "backpressure" }
                    }
                }
            }
        }
    }
}

fn validate_shape(record: &CaptureRecord) -> Result<(), &'static str> {
    if record.request.method.trim().is_empty() {
        return Err("request.method is empty");
    }
    if !record.request.path.starts_with('/') {
        return Err("request.path does not start with '/'");
    }
    if !(100..=599).contains(&record.response.status) {
        return Err("response.status is out of the 100-599 range");
    }
    Ok(())
}

fn truncate_body(part: &mut impl BodyBearing, max_body_bytes: usize) {
    if part.body().len() > max_body_bytes {
        debug!(max_body_bytes, "truncating oversized body");
        crate::metrics::record_body_truncated();
        part.set_body(part.body()[..max_body_bytes].to_vec());
        part.set_truncated(true);
    }
}

trait BodyBearing {
    fn body(&self) -> &[u8];
    fn set_body(&mut self, body: Vec<u8>);
    fn set_truncated(&mut self, truncated: bool);
}

impl BodyBearing for RequestPart {
    fn body(&self) -> &[u8] {
        &self.body
    }
    fn set_body(&mut self, body: Vec<u8>) {
        self.body = body;
    }
    fn set_truncated(&mut self, truncated: bool) {
        self.body_truncated = truncated;
    }
}

impl BodyBearing for ResponsePart {
    fn body(&self) -> &[u8] {
        &self.body
    }
    fn set_body(&mut self, body: Vec<u8>) {
        self.body = body;
    }
    fn set_truncated(&mut self, truncated: bool) {
        self.body_truncated = truncated;
    }
}

/// Translate a sanitized capture into the Queue payload. The response side is
/// carried verbatim (already sanitized); the request side becomes a matcher.
fn build_descriptor(
    sanitized: &crate::types::SanitizedCapture,
    fingerprint: &Fingerprint,
    static_source_labels: &BTreeMap<String, String>,
) -> MockRuleDescriptor {
    let mut query = BTreeMap::new();
    for (key, values) in &sanitized.request.query {
        let mut sorted = values.clone();
        sorted.sort();
        query.insert(key.clone(), sorted);
    }

    let body_predicate = if sanitized.request.body_truncated || sanitized.request.body.is_empty() {
        BodyPredicate::Any
    } else if let Ok(value) = serde_json::from_slice::<serde_json::Value>(&sanitized.request.body) {
        BodyPredicate::EqualToJson { value }
    } else {
        BodyPredicate::EqualTo { value: String::from_utf8_lossy(&sanitized.request.body).into_owned() }
    };

    let mut source_labels = static_source_labels.clone();
    source_labels.extend(sanitized.source_labels.clone());

    MockRuleDescriptor {
        fingerprint: fingerprint.to_string(),
        r#match: MatchBlock {
            method: sanitized.request.method.clone(),
            path: sanitized.request.path.clone(),
            query,
            body_predicate,
        },
        response: ResponseBlock {
            status: sanitized.response.status,
            headers: sanitized.response.headers.clone(),
            body: sanitized.response.body.clone(),
        },
        metadata: DescriptorMetadata {
            observed_at: sanitized.observed_at,
            source_labels,
            sanitization_report: sanitized.sanitization_report.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitizer::patterns::PatternCatalog;
    use crate::types::Direction;
    use chrono::Utc;
    use std::num::NonZeroUsize;

    fn pipeline(depth: usize) -> (Pipeline, mpsc::Receiver<MockRuleDescriptor>) {
        let (tx, rx) = mpsc::channel(depth);
        let sanitizer = Sanitizer::new(
            PatternCatalog::compile(&PatternCatalog::default_configs()).unwrap(),
            PatternCatalog::default_header_denylist(),
            PatternCatalog::default_field_name_denylist(),
        );
        let dedup = Deduplicator::new(NonZeroUsize::new(16).unwrap());
        let pipeline = Pipeline::new(
            sanitizer,
            dedup,
            tx,
            8 * 1024,
            1024,
            Duration::from_millis(500),
            BTreeMap::new(),
        );
        (pipeline, rx)
    }

    fn record() -> CaptureRecord {
        CaptureRecord {
            direction: Direction::Inbound,
            request: RequestPart {
                method: "GET".to_string(),
                path: "/search".to_string(),
                query: BTreeMap::new(),
                headers: BTreeMap::new(),
                body: Vec::new(),
                body_truncated: false,
            },
            response: ResponsePart {
                status: 200,
                headers: BTreeMap::new(),
                body: Vec::new(),
                body_truncated: false,
            },
            observed_at: Utc::now(),
            source_labels: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn fresh_capture_is_accepted_and_staged() {
        let (pipeline, mut rx) = pipeline(8);
        assert_eq!(pipeline.process(record()).await, Outcome::Accepted);
        let staged = rx.recv().await.expect("descriptor staged");
        assert_eq!(staged.r#match.method, "GET");
    }

    #[tokio::test]
    async fn second_identical_capture_is_a_duplicate() {
        let (pipeline, mut rx) = pipeline(8);
        assert_eq!(pipeline.process(record()).await, Outcome::Accepted);
        assert_eq!(pipeline.process(record()).await, Outcome::Duplicate);
        // Only one descriptor was ever staged.
        rx.recv().await.expect("first descriptor staged");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn body_exactly_at_max_is_not_truncated() {
        let (pipeline, mut rx) = pipeline(8);
        let mut at_limit = record();
        at_limit.request.method = "POST".to_string();
        at_limit.request.body = vec![b'a'; 8 * 1024];
        assert_eq!(pipeline.process(at_limit).await, Outcome::Accepted);
        let staged = rx.recv().await.expect("descriptor staged");
        assert_eq!(staged.r#match.body_predicate, BodyPredicate::EqualTo { value: "a".repeat(8 * 1024) });
    }

    #[tokio::test]
    async fn body_one_byte_over_max_is_truncated_to_any_predicate() {
        let (pipeline, mut rx) = pipeline(8);
        let mut over_limit = record();
        over_limit.request.method = "POST".to_string();
        over_limit.request.body = vec![b'a'; 8 * 1024 + 1];
        assert_eq!(pipeline.process(over_limit).await, Outcome::Accepted);
        let staged = rx.recv().await.expect("descriptor staged");
        assert_eq!(staged.r#match.body_predicate, BodyPredicate::Any);
    }

    #[tokio::test]
    async fn malformed_path_is_rejected_without_reaching_dedup() {
        let (pipeline, _rx) = pipeline(8);
        let mut bad = record();
        bad.request.path = "missing-leading-slash".to_string();
        assert_eq!(pipeline.process(bad).await, Outcome::Dropped { reason: "validation" });
    }

    #[tokio::test]
    async fn full_staging_channel_drops_with_backpressure_reason() {
        let (tx, _rx) = mpsc::channel(1);
        let sanitizer = Sanitizer::new(
            PatternCatalog::compile(&PatternCatalog::default_configs()).unwrap(),
            PatternCatalog::default_header_denylist(),
            PatternCatalog::default_field_name_denylist(),
        );
        let dedup = Deduplicator::new(NonZeroUsize::new(16).unwrap());
        let pipeline = Pipeline::new(sanitizer, dedup, tx, 8 * 1024, 1024, Duration::from_millis(50), BTreeMap::new());

        // Fill the channel's single slot directly, bypassing the pipeline, then
        // force a second capture through `process` so it must wait on a full
        // channel and time out.
        let filler = build_descriptor(
            &matches_sanitized(),
            &Fingerprint::compute("GET", "/filler", &BTreeMap::new(), b"", 1024),
            &BTreeMap::new(),
        );
        pipeline.staging_tx.send(filler).await.unwrap();

        let mut second = record();
        second.request.path = "/other".to_string();
        assert_eq!(pipeline.process(second).await, Outcome::Dropped { reason: "backpressure" });
    }

    fn matches_sanitized() -> crate::types::SanitizedCapture {
        let sanitizer = Sanitizer::new(
            PatternCatalog::compile(&PatternCatalog::default_configs()).unwrap(),
            PatternCatalog::default_header_denylist(),
            PatternCatalog::default_field_name_denylist(),
        );
        match sanitizer.sanitize(&record()) {
            SanitizeOutcome::Sanitized(capture) => capture,
            SanitizeOutcome::Leak { .. } => panic!("unexpected leak in test fixture"),
        }
    }
}
