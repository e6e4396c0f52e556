//! Common test utilities for integration tests
//!
//! Shared infrastructure: a wiremock JWKS endpoint, the fixture keys and
//! helpers to sign tokens with them.

#![allow(dead_code)]

use async_trait::async_trait;
use jwtgate::config::{KeySourceConfig, ValidationConfig};
use jwtgate::error::FetchError;
use jwtgate::jwt::{KeyFetcher, KeyResolver, KeySet, KeySource, TokenVerifier};
use jwtgate::mediator::Mediator;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

pub const K1_PEM: &str = include_str!("../fixtures/k1.pem");
pub const K2_PEM: &str = include_str!("../fixtures/k2.pem");
pub const K1_JWK: &str = include_str!("../fixtures/k1.jwk.json");
pub const K2_JWK: &str = include_str!("../fixtures/k2.jwk.json");

/// Public JWK of fixture key `k1`
pub fn k1_jwk() -> Value {
    serde_json::from_str(K1_JWK).expect("Invalid k1 JWK fixture")
}

/// Public JWK of fixture key `k2`
pub fn k2_jwk() -> Value {
    serde_json::from_str(K2_JWK).expect("Invalid k2 JWK fixture")
}

/// Mock authorization server publishing a JWKS document
pub struct MockJwksServer {
    pub server: MockServer,
    pub jwks_endpoint: String,
}

impl MockJwksServer {
    /// Start a new mock server
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let jwks_endpoint = format!("{}/jwks", server.uri());

        Self {
            server,
            jwks_endpoint,
        }
    }

    /// Serve `keys` on every request
    pub async fn mock_jwks(&self, keys: Vec<Value>) {
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": keys })))
            .mount(&self.server)
            .await;
    }

    /// Serve `keys` for the next `times` requests only
    ///
    /// Mount this before the longer-lived mock that should take over.
    pub async fn mock_jwks_times(&self, keys: Vec<Value>, times: u64) {
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": keys })))
            .up_to_n_times(times)
            .mount(&self.server)
            .await;
    }

    /// Serve `keys` and fail the test unless exactly `times` requests arrive
    pub async fn mock_jwks_expect(&self, keys: Vec<Value>, times: u64) {
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": keys })))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Answer every request with `status`
    pub async fn mock_status(&self, status: u16) {
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Answer every request with a non-JSON body
    pub async fn mock_garbage(&self) {
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not a jwks</html>"))
            .mount(&self.server)
            .await;
    }

    /// Number of JWKS requests received so far
    pub async fn jwks_requests(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }
}

/// Sign `claims` with the RSA PEM `private_key` as RS256
pub fn sign(claims: &Value, kid: Option<&str>, private_key: &str) -> String {
    use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};

    let mut header = Header::new(Algorithm::RS256);
    header.typ = Some("JWT".to_string());
    header.kid = kid.map(str::to_string);

    let key = EncodingKey::from_rsa_pem(private_key.as_bytes()).expect("Invalid RSA key");
    encode(&header, claims, &key).expect("Failed to encode test JWT")
}

/// Build an unsigned token with an arbitrary header `alg`
pub fn token_with_alg(alg: &str, kid: &str, exp: i64) -> String {
    use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};

    format!(
        "{}.{}.{}",
        URL_SAFE_NO_PAD.encode(json!({"alg": alg, "kid": kid, "typ": "JWT"}).to_string()),
        URL_SAFE_NO_PAD.encode(json!({"sub": "user123", "exp": exp}).to_string()),
        URL_SAFE_NO_PAD.encode(b"signature")
    )
}

/// Get current Unix timestamp
pub fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_secs() as i64
}

/// Verifier with default configuration fetching over HTTP
pub fn http_verifier() -> TokenVerifier {
    let source = Arc::new(KeySource::new(KeySourceConfig::default()).expect("HTTP client"));
    TokenVerifier::new(KeyResolver::new(source), ValidationConfig::default())
        .expect("Default config is valid")
}

/// Mediator with default configuration fetching over HTTP
pub fn http_mediator() -> Mediator {
    Mediator::new(Arc::new(http_verifier()))
}

/// Fetcher counting its calls and serving a fixed key set
#[derive(Debug)]
pub struct CountingFetcher {
    keys: KeySet,
    calls: AtomicUsize,
}

impl CountingFetcher {
    pub fn new(keys: Vec<Value>) -> Self {
        let body = json!({ "keys": keys }).to_string();
        Self {
            keys: KeySet::from_slice(body.as_bytes()).expect("Invalid key set"),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyFetcher for CountingFetcher {
    async fn fetch(&self, _url: &str) -> Result<KeySet, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.keys.clone())
    }
}
