//! HTTP client for the mock server's JSON admin API. Translates a
//! [`MockRuleDescriptor`] into the admin API's rule representation and
//! installs it keyed by `fingerprint` so repeated installs are idempotent.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use crate::error::InstallErrorKind;
use crate::types::{BodyPredicate, MockRuleDescriptor};

pub struct MockServerClient {
    http: Client,
    base_url: String,
    auth_token: Option<SecretString>,
}

impl MockServerClient {
    pub fn new(base_url: String, timeout: Duration, auth_token: Option<SecretString>) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .use_rustls_tls()
            .build()
            .expect("failed to build mock-server HTTP client");
        Self { http, base_url: base_url.trim_end_matches('/').to_string(), auth_token }
    }

    /// Install `descriptor` as a mock rule, upserting by its fingerprint. Tries
    /// the native upsert-by-id endpoint first (`PUT /__admin/mappings/{id}`);
    /// falls back to create (`POST /__admin/mappings`) if the mock server
    /// reports the mapping doesn't exist yet. A 409 from either call is treated
    /// as success, per the spec's upsert semantics.
    pub async fn install(&self, descriptor: &MockRuleDescriptor) -> Result<(), InstallErrorKind> {
        let body = to_admin_rule(descriptor);

        let put_url = format!("{}/__admin/mappings/{}", self.base_url, descriptor.fingerprint);
        let response = self.authed(self.http.put(&put_url)).json(&body).send().await;

        match response {
            Ok(resp) if resp.status().is_success() || resp.status() == StatusCode::CONFLICT => Ok(()),
            Ok(resp) if resp.status() == StatusCode::NOT_FOUND => self.create(&body).await,
            Ok(resp) if resp.status().is_server_error() => Err(InstallErrorKind::Transient),
            Ok(_) => Err(InstallErrorKind::Permanent),
            Err(_) => Err(InstallErrorKind::Transient),
        }
    }

    async fn create(&self, body: &Value) -> Result<(), InstallErrorKind> {
        let create_url = format!("{}/__admin/mappings", self.base_url);
        match self.authed(self.http.post(&create_url)).json(body).send().await {
            Ok(resp) if resp.status().is_success() || resp.status() == StatusCode::CONFLICT => Ok(()),
            Ok(resp) if resp.status().is_server_error() => Err(InstallErrorKind::Transient),
            Ok(_) => Err(InstallErrorKind::Permanent),
            Err(_) => Err(InstallErrorKind::Transient),
        }
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }
}

/// Build the WireMock-shaped admin-API rule body for `descriptor`.
fn to_admin_rule(descriptor: &MockRuleDescriptor) -> Value {
    let mut query_parameters = serde_json::Map::new();
    for (key, values) in &descriptor.r#match.query {
        let matcher = match values.as_slice() {
            [single] => json!({ "equalTo": single }),
            many => json!({ "or": many.iter().map(|v| json!({ "equalTo": v })).collect::<Vec<_>>() }),
        };
        query_parameters.insert(key.clone(), matcher);
    }

    let mut request = json!({
        "method": descriptor.r#match.method,
        "urlPath": descriptor.r#match.path,
        "queryParameters": query_parameters,
    });

    let body_patterns: Option<Value> = match &descriptor.r#match.body_predicate {
        BodyPredicate::EqualToJson { value } => Some(json!([{ "equalToJson": value }])),
        BodyPredicate::EqualTo { value } => Some(json!([{ "equalTo": value }])),
        BodyPredicate::Any => None,
    };
    if let Some(patterns) = body_patterns {
        request["bodyPatterns"] = patterns;
    }

    json!({
        "id": descriptor.fingerprint,
        "request": request,
        "response": {
            "status": descriptor.response.status,
            "headers": descriptor.response.headers,
            "body": String::from_utf8_lossy(&descriptor.response.body),
        },
        "metadata": {
            "observedAt": descriptor.metadata.observed_at,
            "sourceLabels": descriptor.metadata.source_labels,
            "sanitizationReport": descriptor.metadata.sanitization_report,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DescriptorMetadata, MatchBlock, ResponseBlock};
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn descriptor() -> MockRuleDescriptor {
        MockRuleDescriptor {
            fingerprint: "abc123".to_string(),
            r#match: MatchBlock {
                method: "GET".to_string(),
                path: "/search".to_string(),
                query: BTreeMap::from([("a".to_string(), vec!["1".to_string()])]),
                body_predicate: BodyPredicate::Any,
            },
            response: ResponseBlock { status: 200, headers: BTreeMap::new(), body: b"ok".to_vec() },
            metadata: DescriptorMetadata {
                observed_at: Utc::now(),
                source_labels: BTreeMap::new(),
                sanitization_report: BTreeMap::new(),
            },
        }
    }

    #[test]
    fn admin_rule_carries_fingerprint_as_id() {
        let rule = to_admin_rule(&descriptor());
        assert_eq!(rule["id"], json!("abc123"));
        assert_eq!(rule["request"]["method"], json!("GET"));
    }

    #[test]
    fn any_body_predicate_omits_body_patterns() {
        let rule = to_admin_rule(&descriptor());
        assert!(rule.get("bodyPatterns").is_none() || rule["request"].get("bodyPatterns").is_none());
    }
}
