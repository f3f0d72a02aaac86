use std::collections::BTreeMap;
use std::fmt;

use sha2::{Digest, Sha256};

/// 256-bit content hash of a sanitized request's canonical form. Identity for
/// deduplication and the external idempotency key used to install mock rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Canonicalize `method`/`path`/`query`/`body` per the dedup spec and hash the
    /// result with SHA-256. `query` values are sorted by key then value; `body` is
    /// re-serialized with sorted keys if it parses as JSON, otherwise taken as raw
    /// bytes truncated to `body_limit`.
    pub fn compute(method: &str, path: &str, query: &BTreeMap<String, Vec<String>>, body: &[u8], body_limit: usize) -> Self {
        let canonical_query = canonical_query_string(query);
        let canonical_body = canonical_body_bytes(body, body_limit);

        let mut hasher = Sha256::new();
        hasher.update(method.to_uppercase().as_bytes());
        hasher.update(b"\n");
        hasher.update(path.as_bytes());
        hasher.update(b"\n");
        hasher.update(canonical_query.as_bytes());
        hasher.update(b"\n");
        hasher.update(&canonical_body);

        Fingerprint(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `k=v&k=v`, entries sorted by key then value, reserved bytes percent-encoded.
/// `BTreeMap` already yields keys in order; each key's values are sorted too so that
/// a caller's query-parameter ordering never affects the result.
pub fn canonical_query_string(query: &BTreeMap<String, Vec<String>>) -> String {
    let mut pairs = Vec::new();
    for (key, values) in query {
        let mut sorted_values = values.clone();
        sorted_values.sort();
        for value in sorted_values {
            pairs.push(format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(&value)
            ));
        }
    }
    pairs.join("&")
}

/// JSON-reserialize with sorted keys and no insignificant whitespace when possible;
/// otherwise the raw bytes, truncated to `limit`.
pub fn canonical_body_bytes(body: &[u8], limit: usize) -> Vec<u8> {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        let canonical = canonicalize_json(&value);
        if let Ok(bytes) = serde_json::to_vec(&canonical) {
            return bytes;
        }
    }
    body.iter().take(limit).copied().collect()
}

/// Recursively rebuild a `serde_json::Value` with object keys in sorted order so
/// that `to_string` output is stable regardless of the original key order.
fn canonicalize_json(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut sorted = serde_json::Map::new();
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                sorted.insert(key.clone(), canonicalize_json(&map[key]));
            }
            serde_json::Value::Object(sorted)
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(canonicalize_json).collect())
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_order_does_not_affect_canonical_string() {
        let mut a = BTreeMap::new();
        a.insert("b".to_string(), vec!["2".to_string()]);
        a.insert("a".to_string(), vec!["1".to_string()]);

        let mut b = BTreeMap::new();
        b.insert("a".to_string(), vec!["1".to_string()]);
        b.insert("b".to_string(), vec!["2".to_string()]);

        assert_eq!(canonical_query_string(&a), canonical_query_string(&b));
        assert_eq!(canonical_query_string(&a), "a=1&b=2");
    }

    #[test]
    fn json_key_order_does_not_affect_canonical_body() {
        let a = br#"{"b":2,"a":1}"#;
        let b = br#"{"a":1,"b":2}"#;
        assert_eq!(canonical_body_bytes(a, 1024), canonical_body_bytes(b, 1024));
    }

    #[test]
    fn fingerprint_ignores_response_and_reordering() {
        let mut query = BTreeMap::new();
        query.insert("b".to_string(), vec!["2".to_string()]);
        query.insert("a".to_string(), vec!["1".to_string()]);

        let fp1 = Fingerprint::compute("get", "/search", &query, br#"{}"#, 1024);

        let mut query2 = BTreeMap::new();
        query2.insert("a".to_string(), vec!["1".to_string()]);
        query2.insert("b".to_string(), vec!["2".to_string()]);

        let fp2 = Fingerprint::compute("GET", "/search", &query2, br#"{}"#, 1024);

        assert_eq!(fp1, fp2);
    }
}
