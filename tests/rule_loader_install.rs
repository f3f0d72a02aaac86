//! Exercises the Rule Loader's install path against a real local HTTP server
//! (via `wiremock`) standing in for the mock server's admin API: upsert
//! success, not-found-falls-back-to-create, transient-failure classification
//! (which the worker pool retries), and permanent-failure classification
//! (which the worker pool dead-letters without retry).

use std::collections::BTreeMap;

use chrono::Utc;
use meshcap::error::InstallErrorKind;
use meshcap::rule_loader::MockServerClient;
use meshcap::types::{BodyPredicate, DescriptorMetadata, MatchBlock, MockRuleDescriptor, ResponseBlock};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn descriptor(fingerprint: &str) -> MockRuleDescriptor {
    MockRuleDescriptor {
        fingerprint: fingerprint.to_string(),
        r#match: MatchBlock {
            method: "GET".to_string(),
            path: "/billing/invoices".to_string(),
            query: BTreeMap::from([("account".to_string(), vec!["123".to_string()])]),
            body_predicate: BodyPredicate::Any,
        },
        response: ResponseBlock {
            status: 200,
            headers: BTreeMap::from([("content-type".to_string(), vec!["application/json".to_string()])]),
            body: br#"{"total":"[REDACTED]"}"#.to_vec(),
        },
        metadata: DescriptorMetadata {
            observed_at: Utc::now(),
            source_labels: BTreeMap::new(),
            sanitization_report: BTreeMap::new(),
        },
    }
}

#[tokio::test]
async fn install_succeeds_on_upsert() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/__admin/mappings/fp-upsert"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = MockServerClient::new(server.uri(), std::time::Duration::from_secs(5), None);
    let result = client.install(&descriptor("fp-upsert")).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn install_falls_back_to_create_on_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/__admin/mappings/fp-create"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/__admin/mappings"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let client = MockServerClient::new(server.uri(), std::time::Duration::from_secs(5), None);
    let result = client.install(&descriptor("fp-create")).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn conflict_is_treated_as_success() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/__admin/mappings/fp-conflict"))
        .respond_with(ResponseTemplate::new(409))
        .mount(&server)
        .await;

    let client = MockServerClient::new(server.uri(), std::time::Duration::from_secs(5), None);
    let result = client.install(&descriptor("fp-conflict")).await;
    assert!(result.is_ok());
}

/// A worker retrying this descriptor would succeed on a later attempt, since
/// the failure is classified transient rather than permanent.
#[tokio::test]
async fn server_error_is_classified_transient_and_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/__admin/mappings/fp-transient"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = MockServerClient::new(server.uri(), std::time::Duration::from_secs(5), None);
    let result = client.install(&descriptor("fp-transient")).await;
    assert_eq!(result.unwrap_err(), InstallErrorKind::Transient);
}

/// A worker would dead-letter this descriptor immediately rather than retry,
/// since the mock server has rejected the rule shape outright.
#[tokio::test]
async fn client_error_is_classified_permanent_and_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/__admin/mappings/fp-permanent"))
        .respond_with(ResponseTemplate::new(422))
        .mount(&server)
        .await;

    let client = MockServerClient::new(server.uri(), std::time::Duration::from_secs(5), None);
    let result = client.install(&descriptor("fp-permanent")).await;
    assert_eq!(result.unwrap_err(), InstallErrorKind::Permanent);
}

#[tokio::test]
async fn bearer_token_is_sent_when_configured() {
    use wiremock::matchers::header;

    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/__admin/mappings/fp-auth"))
        .and(header("authorization", "Bearer s3cr3t-token"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = MockServerClient::new(
        server.uri(),
        std::time::Duration::from_secs(5),
        Some(secrecy::SecretString::new("s3cr3t-token".to_string())),
    );
    let result = client.install(&descriptor("fp-auth")).await;
    assert!(result.is_ok());
}
