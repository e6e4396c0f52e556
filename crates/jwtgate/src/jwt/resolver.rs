//! Verification key selection
//!
//! Picks the one key in a JWKS that may verify a given token:
//!
//! 1. Keys marked `"use": "enc"` and symmetric keys are never candidates
//! 2. A key that declares `alg` must declare exactly the header algorithm
//! 3. The key type must fit the algorithm family (RSA for RS*/PS*, P-256 for
//!    ES256, P-384 for ES384, Ed25519 for EdDSA)
//! 4. If the header has a `kid`, only keys with that `kid` remain
//!
//! Exactly one remaining key is selected. None triggers a single forced
//! refresh of the key set (the key may have just been rotated in); several
//! are reported as ambiguous rather than guessing.

use jsonwebtoken::Algorithm;
use jsonwebtoken::jwk::{AlgorithmParameters, EllipticCurve, Jwk, KeyAlgorithm, PublicKeyUse};
use std::sync::Arc;
use tracing::{debug, warn};

use super::TokenHeader;
use super::jwks::{KeySet, KeySource};
use crate::error::KeyResolutionError;

/// Selects verification keys from a [`KeySource`]
#[derive(Debug, Clone)]
pub struct KeyResolver {
    source: Arc<KeySource>,
}

impl KeyResolver {
    /// Create a resolver over a shared key source
    pub fn new(source: Arc<KeySource>) -> Self {
        Self { source }
    }

    /// The underlying key source
    pub fn source(&self) -> &Arc<KeySource> {
        &self.source
    }

    /// Resolve the verification key for `header` from the JWKS at `url`
    ///
    /// The cached key set is consulted first. On a miss the set is refreshed
    /// once and consulted again; a key set fetched by this very call counts
    /// as that refresh.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The key set cannot be fetched
    /// - No key matches, after the refresh
    /// - More than one key matches
    pub async fn resolve(&self, url: &str, header: &TokenHeader) -> Result<Jwk, KeyResolutionError> {
        let (keys, fresh) = self.source.keys(url).await?;

        match select(&keys, header) {
            Err(KeyResolutionError::NoMatchingKey { .. }) if !fresh => {
                debug!(
                    jwks_uri = %url,
                    key_id = ?header.kid,
                    "No matching key in cached JWKS, refreshing"
                );
                let keys = self.source.refresh(url).await?;
                select(&keys, header).inspect_err(|e| {
                    warn!(jwks_uri = %url, error = %e, "No matching key after JWKS refresh");
                })
            }
            result => result,
        }
    }
}

/// Pick the single key in `keys` usable for `header`
fn select(keys: &KeySet, header: &TokenHeader) -> Result<Jwk, KeyResolutionError> {
    let no_match = || KeyResolutionError::NoMatchingKey {
        kid: header.kid.clone(),
        algorithm: header.alg.clone(),
    };

    let algorithm = header.algorithm().ok_or_else(no_match)?;

    let mut matches = keys
        .keys()
        .iter()
        .filter(|jwk| is_candidate(jwk, algorithm))
        .filter(|jwk| match &header.kid {
            Some(kid) => jwk.common.key_id.as_deref() == Some(kid.as_str()),
            None => true,
        });

    let Some(first) = matches.next() else {
        return Err(no_match());
    };

    let others = matches.count();
    if others > 0 {
        return Err(KeyResolutionError::AmbiguousKey {
            kid: header.kid.clone(),
            algorithm: header.alg.clone(),
            count: others + 1,
        });
    }

    Ok(first.clone())
}

fn is_candidate(jwk: &Jwk, algorithm: Algorithm) -> bool {
    if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
        return false;
    }

    if let Some(declared) = &jwk.common.key_algorithm
        && declared_algorithm(declared) != Some(algorithm)
    {
        return false;
    }

    key_type_fits(&jwk.algorithm, algorithm)
}

/// Map a JWK `alg` to a JWS algorithm; encryption algorithms map to `None`
fn declared_algorithm(declared: &KeyAlgorithm) -> Option<Algorithm> {
    serde_json::to_value(declared)
        .ok()
        .and_then(|name| serde_json::from_value(name).ok())
}

fn key_type_fits(params: &AlgorithmParameters, algorithm: Algorithm) -> bool {
    match params {
        AlgorithmParameters::RSA(_) => matches!(
            algorithm,
            Algorithm::RS256
                | Algorithm::RS384
                | Algorithm::RS512
                | Algorithm::PS256
                | Algorithm::PS384
                | Algorithm::PS512
        ),
        AlgorithmParameters::EllipticCurve(ec) => matches!(
            (&ec.curve, algorithm),
            (EllipticCurve::P256, Algorithm::ES256) | (EllipticCurve::P384, Algorithm::ES384)
        ),
        AlgorithmParameters::OctetKeyPair(okp) => {
            matches!((&okp.curve, algorithm), (EllipticCurve::Ed25519, Algorithm::EdDSA))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeySourceConfig;
    use crate::error::FetchError;
    use crate::jwt::jwks::tests::{ScriptedFetcher, key_set, rsa_jwk};
    use serde_json::json;

    const URL: &str = "https://auth.example.com/jwks";

    fn header(alg: &str, kid: Option<&str>) -> TokenHeader {
        TokenHeader {
            alg: alg.to_string(),
            kid: kid.map(str::to_string),
            typ: Some("JWT".to_string()),
            crit: None,
        }
    }

    fn resolver(fetcher: Arc<ScriptedFetcher>) -> KeyResolver {
        KeyResolver::new(Arc::new(KeySource::with_fetcher(
            fetcher,
            KeySourceConfig::default(),
        )))
    }

    #[test]
    fn test_select_by_kid() {
        let keys = key_set(&["k1", "k2"]);
        let jwk = select(&keys, &header("RS256", Some("k2"))).unwrap();
        assert_eq!(jwk.common.key_id.as_deref(), Some("k2"));
    }

    #[test]
    fn test_select_without_kid_single_match() {
        let keys = KeySet::new(vec![rsa_jwk(Some("k1"), Some("RS256")), rsa_jwk(Some("k2"), Some("PS256"))]);
        let jwk = select(&keys, &header("PS256", None)).unwrap();
        assert_eq!(jwk.common.key_id.as_deref(), Some("k2"));
    }

    #[test]
    fn test_select_without_kid_is_ambiguous() {
        let keys = key_set(&["k1", "k2"]);
        assert_eq!(
            select(&keys, &header("RS256", None)).unwrap_err(),
            KeyResolutionError::AmbiguousKey {
                kid: None,
                algorithm: "RS256".to_string(),
                count: 2,
            }
        );
    }

    #[test]
    fn test_duplicate_kid_is_ambiguous() {
        let keys = key_set(&["k1", "k1"]);
        assert!(matches!(
            select(&keys, &header("RS256", Some("k1"))),
            Err(KeyResolutionError::AmbiguousKey { count: 2, .. })
        ));
    }

    #[test]
    fn test_declared_algorithm_must_match_header() {
        let keys = KeySet::new(vec![rsa_jwk(Some("k1"), Some("RS512"))]);
        assert!(matches!(
            select(&keys, &header("RS256", Some("k1"))),
            Err(KeyResolutionError::NoMatchingKey { .. })
        ));
    }

    #[test]
    fn test_undeclared_algorithm_uses_key_type() {
        let keys = KeySet::new(vec![rsa_jwk(Some("k1"), None)]);
        assert!(select(&keys, &header("RS256", Some("k1"))).is_ok());
        assert!(select(&keys, &header("ES256", Some("k1"))).is_err());
    }

    #[test]
    fn test_encryption_keys_are_skipped() {
        let mut jwk = rsa_jwk(Some("k1"), None);
        jwk.common.public_key_use = Some(PublicKeyUse::Encryption);
        let keys = KeySet::new(vec![jwk]);
        assert!(select(&keys, &header("RS256", Some("k1"))).is_err());
    }

    #[test]
    fn test_symmetric_keys_are_never_candidates() {
        let oct: Jwk = serde_json::from_value(json!({
            "kty": "oct",
            "kid": "k1",
            "k": "c2VjcmV0LXNlY3JldC1zZWNyZXQtc2VjcmV0"
        }))
        .unwrap();
        let keys = KeySet::new(vec![oct]);
        assert!(select(&keys, &header("RS256", Some("k1"))).is_err());
        assert!(select(&keys, &header("HS256", Some("k1"))).is_err());
    }

    #[tokio::test]
    async fn test_resolve_from_warm_cache() {
        let fetcher = Arc::new(ScriptedFetcher::new().then(Ok(key_set(&["k1"]))));
        let resolver = resolver(fetcher.clone());

        resolver.resolve(URL, &header("RS256", Some("k1"))).await.unwrap();
        resolver.resolve(URL, &header("RS256", Some("k1"))).await.unwrap();
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_rotated_key_found_after_one_refresh() {
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .then(Ok(key_set(&["k1"])))
                .then(Ok(key_set(&["k1", "k2"]))),
        );
        let resolver = resolver(fetcher.clone());

        resolver.resolve(URL, &header("RS256", Some("k1"))).await.unwrap();
        let jwk = resolver.resolve(URL, &header("RS256", Some("k2"))).await.unwrap();

        assert_eq!(jwk.common.key_id.as_deref(), Some("k2"));
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_unknown_kid_fails_after_exactly_one_refresh() {
        let fetcher = Arc::new(ScriptedFetcher::new().then(Ok(key_set(&["k1"]))));
        let resolver = resolver(fetcher.clone());

        resolver.resolve(URL, &header("RS256", Some("k1"))).await.unwrap();
        let err = resolver
            .resolve(URL, &header("RS256", Some("k9")))
            .await
            .unwrap_err();

        assert!(matches!(err, KeyResolutionError::NoMatchingKey { kid: Some(ref kid), .. } if kid == "k9"));
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_cold_fetch_counts_as_the_refresh() {
        let fetcher = Arc::new(ScriptedFetcher::new().then(Ok(key_set(&["k1"]))));
        let resolver = resolver(fetcher.clone());

        assert!(resolver.resolve(URL, &header("RS256", Some("k9"))).await.is_err());
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_ambiguity_does_not_refresh() {
        let fetcher = Arc::new(ScriptedFetcher::new().then(Ok(key_set(&["k1", "k2"]))));
        let resolver = resolver(fetcher.clone());

        resolver.resolve(URL, &header("RS256", Some("k1"))).await.unwrap();
        assert!(matches!(
            resolver.resolve(URL, &header("RS256", None)).await,
            Err(KeyResolutionError::AmbiguousKey { .. })
        ));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates() {
        let fetcher = Arc::new(ScriptedFetcher::new().then(Err(FetchError::Status(500))));
        let resolver = resolver(fetcher);

        assert_eq!(
            resolver.resolve(URL, &header("RS256", Some("k1"))).await.unwrap_err(),
            KeyResolutionError::Fetch(FetchError::Status(500))
        );
    }
}
