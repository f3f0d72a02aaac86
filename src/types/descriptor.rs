use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the Rule Loader should match the request body when installing the rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BodyPredicate {
    /// Sanitized body parsed as JSON; matched structurally by the mock server.
    EqualToJson { value: serde_json::Value },
    /// Short non-JSON body; matched as an exact byte/string comparison.
    EqualTo { value: String },
    /// Truncated or empty body; no body matcher is installed.
    Any,
}

/// Request-matcher half of a mock rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchBlock {
    pub method: String,
    pub path: String,
    /// Sorted so that two descriptors with the same logical query produce identical bytes.
    pub query: BTreeMap<String, Vec<String>>,
    pub body_predicate: BodyPredicate,
}

/// Canned-response half of a mock rule, taken from the sanitized response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseBlock {
    pub status: u16,
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: Vec<u8>,
}

/// Provenance carried alongside a rule for operational visibility; never contains
/// unsanitized bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptorMetadata {
    pub observed_at: DateTime<Utc>,
    pub source_labels: BTreeMap<String, String>,
    pub sanitization_report: BTreeMap<String, u32>,
}

/// The Queue payload: everything the Rule Loader needs to install a mock rule,
/// keyed for idempotency by `fingerprint`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockRuleDescriptor {
    pub fingerprint: String,
    pub r#match: MatchBlock,
    pub response: ResponseBlock,
    pub metadata: DescriptorMetadata,
}
