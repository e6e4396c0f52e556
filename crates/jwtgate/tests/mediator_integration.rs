//! Mediator behavior seen by a request pipeline
//!
//! Tests cover:
//! - Pipeline properties for valid, expired and unprocessable tokens
//! - Algorithm allow-list enforcement before any network activity

mod common;

use common::{
    CountingFetcher, K1_PEM, MockJwksServer, current_timestamp, http_mediator, k1_jwk, sign,
    token_with_alg,
};
use jwtgate::config::{KeySourceConfig, ValidationConfig};
use jwtgate::jwt::{KeyResolver, KeySource, TokenVerifier};
use jwtgate::mediator::{ERROR_MESSAGE, HTTP_SC, Mediator};
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_valid_then_expired_token() {
    let mock_server = MockJwksServer::start().await;
    mock_server.mock_jwks(vec![k1_jwk()]).await;
    let mediator = http_mediator();
    let now = current_timestamp();

    let valid = sign(&json!({"sub": "user123", "exp": now + 3600}), Some("k1"), K1_PEM);
    let result = mediator.mediate(&valid, &mock_server.jwks_endpoint).await;
    assert!(result.passed);
    assert!(result.properties().is_empty());
    assert_eq!(result.claims.as_ref().and_then(|c| c.sub()), Some("user123"));

    let expired = sign(&json!({"sub": "user123", "exp": now - 3600}), Some("k1"), K1_PEM);
    let result = mediator.mediate(&expired, &mock_server.jwks_endpoint).await;
    assert!(!result.passed);

    let properties = result.properties();
    assert_eq!(properties[ERROR_MESSAGE], "Access token has expired!");
    assert_eq!(properties[HTTP_SC], "401");
}

#[tokio::test]
async fn test_garbage_token_gets_generic_message() {
    let mock_server = MockJwksServer::start().await;
    mock_server.mock_jwks(vec![k1_jwk()]).await;

    let (outcome, result) = http_mediator()
        .validate("not-a-jwt", &mock_server.jwks_endpoint)
        .await;

    assert!(!outcome.is_valid());
    assert!(!result.passed);
    let properties = result.properties();
    assert_eq!(properties[ERROR_MESSAGE], "Failed to process the access token.");
    assert_eq!(properties[HTTP_SC], "401");
    assert_eq!(mock_server.jwks_requests().await, 0);
}

#[tokio::test]
async fn test_jwks_outage_gets_generic_message() {
    let mock_server = MockJwksServer::start().await;
    mock_server.mock_status(500).await;

    let token = sign(
        &json!({"sub": "user123", "exp": current_timestamp() + 3600}),
        Some("k1"),
        K1_PEM,
    );
    let result = http_mediator()
        .mediate(&token, &mock_server.jwks_endpoint)
        .await;

    assert!(!result.passed);
    assert_eq!(
        result.error_message,
        Some("Failed to process the access token.")
    );
    assert_eq!(result.http_status, Some(401));
}

proptest! {
    #[test]
    fn prop_disallowed_algorithms_never_fetch(
        alg in prop_oneof![
            Just("none".to_string()),
            "(HS|ES|PS)(256|384|512)",
            Just("EdDSA".to_string()),
            "[A-Za-z0-9]{1,12}".prop_filter("allowed", |a| a != "RS256"),
        ],
        exp_offset in -100_000i64..100_000,
    ) {
        let fetcher = Arc::new(CountingFetcher::new(vec![k1_jwk()]));
        let source = Arc::new(KeySource::with_fetcher(fetcher.clone(), KeySourceConfig::default()));
        let verifier = TokenVerifier::new(KeyResolver::new(source), ValidationConfig::default()).unwrap();
        let mediator = Mediator::new(Arc::new(verifier));

        let token = token_with_alg(&alg, "k1", current_timestamp() + exp_offset);
        let result = tokio_test::block_on(mediator.mediate(&token, "https://auth.example.com/jwks"));

        prop_assert!(!result.passed);
        prop_assert_eq!(result.error_message, Some("Failed to process the access token."));
        prop_assert_eq!(fetcher.calls(), 0);
    }
}
