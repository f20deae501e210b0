//! Contract Test: End-to-End Request Handling
//!
//! Constraints verified:
//! - A signed token plus path override creates the record and answers 200
//! - Every request error maps to 400, every backend failure to 500
//! - Claims are never used when the token does not verify
//! - A slow provider call is cut off by the update deadline

mod common;

use common::{FakeBackend, FakeOperator};
use fcddns_core::{
    Claims, DdnsRequest, DdnsService, DnsRecord, InvocationContext, OperatorRegistry,
    RecordOperator, TokenCodec,
};
use std::sync::Arc;
use std::time::Duration;

const SECRET: &str = "s3cret";

fn service_with(domain: &str, operator: Arc<dyn RecordOperator>) -> DdnsService {
    let mut registry = OperatorRegistry::new();
    registry.set(domain, operator);
    DdnsService::new(TokenCodec::new(SECRET), Arc::new(registry))
}

fn token(claims: &Claims) -> String {
    TokenCodec::new(SECRET).sign(claims).expect("signing succeeds")
}

#[tokio::test]
async fn signed_request_creates_record() {
    let (operator, backend) = common::operator("fake");
    let service = service_with("example.com", operator);

    let token = token(&Claims::new("example.com", "home"));
    let request = DdnsRequest::new(format!("/ddns/v1/{token}/203.0.113.7"));

    let response = service.handle(&InvocationContext::new(), &request).await;

    assert_eq!(response.status_code, 200, "body: {}", response.body);
    assert_eq!(response.body, "ok");

    let records = backend.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "home.example.com");
    assert_eq!(records[0].value, "203.0.113.7");
}

#[tokio::test]
async fn repeated_request_is_idempotent() {
    let (operator, backend) = common::operator("fake");
    let service = service_with("example.com", operator);

    let token = token(&Claims::new("example.com", "home").with_ip("198.51.100.1"));
    let request = DdnsRequest::new(format!("/ddns/v1/{token}"));

    for _ in 0..3 {
        let response = service.handle(&InvocationContext::new(), &request).await;
        assert_eq!(response.status_code, 200);
    }

    assert_eq!(backend.create_calls(), 1);
    assert_eq!(backend.update_calls(), 0);
}

#[tokio::test]
async fn client_ip_is_the_last_resort() {
    let (operator, backend) = common::operator("fake");
    let service = service_with("example.com", operator);

    let token = token(&Claims::new("example.com", "home"));
    let request = DdnsRequest::new(format!("/ddns/v1/{token}")).with_client_ip("192.0.2.44");

    let response = service.handle(&InvocationContext::new(), &request).await;

    assert_eq!(response.status_code, 200);
    assert_eq!(backend.records()[0].value, "192.0.2.44");
}

#[tokio::test]
async fn request_errors_are_400() {
    let (operator, backend) = common::operator("fake");
    let service = service_with("example.com", operator);
    let ctx = InvocationContext::new();

    let valid = token(&Claims::new("example.com", "home"));
    let forged = TokenCodec::new("other-secret")
        .sign(&Claims::new("example.com", "home"))
        .unwrap();
    let no_host = token(&Claims::new("example.com", ""));
    let unknown_domain = token(&Claims::new("example.org", "home"));

    let cases = [
        ("/ddns/v2/whatever".to_string(), "invalid path"),
        ("/ddns/v1/".to_string(), "invalid path"),
        ("/ddns/v1/not-a-token/1.1.1.1".to_string(), "failed to parse token"),
        (format!("/ddns/v1/{forged}/1.1.1.1"), "failed to parse token"),
        (format!("/ddns/v1/{no_host}/1.1.1.1"), "invalid claims"),
        (format!("/ddns/v1/{valid}"), "client ip not found"),
        (format!("/ddns/v1/{unknown_domain}/1.1.1.1"), "operator not found for domain: example.org"),
    ];

    for (path, expected) in cases {
        let response = service.handle(&ctx, &DdnsRequest::new(path.clone())).await;
        assert_eq!(response.status_code, 400, "{path}: {}", response.body);
        assert!(
            response.body.contains(expected),
            "{path}: body {:?} should contain {expected:?}",
            response.body
        );
    }

    assert_eq!(backend.list_calls(), 0, "no request may reach the backend");
}

#[tokio::test]
async fn ambiguous_records_answer_400_without_mutation() {
    let backend = Arc::new(FakeBackend::with_records(vec![
        DnsRecord::a("rec-1", "home.example.com", "1.1.1.1"),
        DnsRecord::a("rec-2", "home.example.com", "1.1.1.2"),
    ]));
    let service = service_with(
        "example.com",
        Arc::new(FakeOperator::new("fake", Arc::clone(&backend))),
    );

    let token = token(&Claims::new("example.com", "home"));
    let request = DdnsRequest::new(format!("/ddns/v1/{token}/2.2.2.2"));
    let response = service.handle(&InvocationContext::new(), &request).await;

    assert_eq!(response.status_code, 400);
    assert!(response.body.contains("multiple A records found for home.example.com"));
    assert_eq!(backend.mutations(), 0);
}

#[tokio::test]
async fn backend_failure_answers_500() {
    let mut backend = FakeBackend::with_records(vec![DnsRecord::a(
        "rec-1",
        "home.example.com",
        "1.1.1.1",
    )]);
    backend.fail_update = Some("HTTP 502".to_string());
    let backend = Arc::new(backend);

    let service = service_with(
        "example.com",
        Arc::new(FakeOperator::new("fake", Arc::clone(&backend))),
    );

    let token = token(&Claims::new("example.com", "home"));
    let request = DdnsRequest::new(format!("/ddns/v1/{token}/2.2.2.2"));
    let response = service.handle(&InvocationContext::new(), &request).await;

    assert_eq!(response.status_code, 500);
    assert_eq!(
        response.body,
        "failed to update A record for home.example.com: HTTP 502"
    );
}

#[tokio::test(start_paused = true)]
async fn slow_provider_is_cut_off() {
    let backend = Arc::new(FakeBackend::new());
    let mut operator = FakeOperator::new("slow", Arc::clone(&backend));
    operator.delay = Some(Duration::from_secs(60));

    let service = service_with("example.com", Arc::new(operator))
        .with_update_timeout(Duration::from_secs(5));

    let token = token(&Claims::new("example.com", "home"));
    let request = DdnsRequest::new(format!("/ddns/v1/{token}/2.2.2.2"));
    let response = service.handle(&InvocationContext::new(), &request).await;

    assert_eq!(response.status_code, 500);
    assert!(response.body.contains("timed out"));
    assert_eq!(backend.list_calls(), 0);
}

#[tokio::test]
async fn wildcard_operator_serves_unlisted_domains() {
    let (exact, exact_backend) = common::operator("exact");
    let (fallback, fallback_backend) = common::operator("fallback");

    let mut registry = OperatorRegistry::new();
    registry.set("example.com", exact);
    registry.set("*", fallback);
    let service = DdnsService::new(TokenCodec::new(SECRET), Arc::new(registry));

    let token = token(&Claims::new("example.net", "nas"));
    let request = DdnsRequest::new(format!("/ddns/v1/{token}/192.0.2.9"));
    let response = service.handle(&InvocationContext::new(), &request).await;

    assert_eq!(response.status_code, 200);
    assert_eq!(exact_backend.records().len(), 0);
    assert_eq!(fallback_backend.records()[0].name, "nas.example.net");
}
