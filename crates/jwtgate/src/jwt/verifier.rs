//! Token verification
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. Structure (three base64url segments, JSON header and object payload)
//! 2. Algorithm allow-list, before any key lookup
//! 3. Key resolution against the JWKS
//! 4. Signature
//! 5. `exp` presence
//! 6. `exp` against now, with clock skew (then `nbf`, when enabled)
//! 7. `aud`, when enabled
//!
//! Every failure becomes [`ValidationOutcome::Invalid`]; nothing escapes as an
//! error. "Now" is read once per call.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::jwk::Jwk;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use std::sync::Arc;
use tracing::{debug, warn};

use super::resolver::KeyResolver;
use super::{Claims, Token};
use crate::clock::{Clock, SystemClock};
use crate::config::ValidationConfig;
use crate::error::{ConfigResult, InvalidReason};
use crate::outcome::ValidationOutcome;

/// JWT verifier backed by a JWKS
///
/// # Example
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use jwtgate::config::{KeySourceConfig, ValidationConfig};
/// # use jwtgate::jwt::{KeyResolver, KeySource, TokenVerifier};
/// # tokio_test::block_on(async {
/// let source = Arc::new(KeySource::new(KeySourceConfig::default())?);
/// let verifier = TokenVerifier::new(KeyResolver::new(source), ValidationConfig::default())?;
///
/// let outcome = verifier
///     .verify("eyJ0eXAi...", "https://auth.example.com/.well-known/jwks.json")
///     .await;
/// if outcome.is_valid() {
///     println!("subject: {:?}", outcome.claims().and_then(|c| c.sub()));
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    resolver: KeyResolver,
    config: ValidationConfig,
    clock: Arc<dyn Clock>,
}

impl TokenVerifier {
    /// Create a verifier with a validated configuration
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationConfig::validate`] error for unusable settings.
    pub fn new(resolver: KeyResolver, config: ValidationConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            resolver,
            config,
            clock: Arc::new(SystemClock),
        })
    }

    /// Use `clock` as the source of "now"
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The configuration used by [`verify`](Self::verify)
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// The key resolver
    pub fn resolver(&self) -> &KeyResolver {
        &self.resolver
    }

    /// Verify `token` against the keys published at `jwks_url`
    pub async fn verify(&self, token: &str, jwks_url: &str) -> ValidationOutcome {
        self.verify_with_config(token, jwks_url, &self.config).await
    }

    /// Verify `token` under an explicit configuration
    ///
    /// An invalid `config` rejects every token with
    /// [`InvalidReason::ProcessingError`].
    pub async fn verify_with_config(
        &self,
        token: &str,
        jwks_url: &str,
        config: &ValidationConfig,
    ) -> ValidationOutcome {
        let now = self.clock.now();

        match self.check(token, jwks_url, config, now).await {
            Ok(claims) => {
                debug!(
                    jwks_uri = %jwks_url,
                    subject = ?claims.sub(),
                    "JWT validation successful"
                );
                ValidationOutcome::Valid { claims }
            }
            Err(reason) => {
                warn!(
                    jwks_uri = %jwks_url,
                    reason = %reason,
                    expired = reason.is_expired(),
                    "JWT validation failed"
                );
                ValidationOutcome::invalid(reason)
            }
        }
    }

    async fn check(
        &self,
        raw: &str,
        jwks_url: &str,
        config: &ValidationConfig,
        now: i64,
    ) -> Result<Claims, InvalidReason> {
        config
            .validate()
            .map_err(|e| InvalidReason::ProcessingError(e.to_string()))?;

        let token = Token::parse(raw)?;

        let algorithm = token
            .header
            .algorithm()
            .filter(|alg| config.allows(*alg))
            .ok_or_else(|| InvalidReason::DisallowedAlgorithm(token.header.alg.clone()))?;

        let jwk = self.resolver.resolve(jwks_url, &token.header).await?;

        let claims = verify_signature(&token, &jwk, algorithm)?;

        check_time_claims(&claims, config, now)?;
        check_audience(&claims, config)?;

        Ok(claims)
    }
}

/// Verify the signature and return the now-trusted claims
///
/// `jsonwebtoken` is used for the cryptography only; its own claim checks are
/// disabled so that time is judged against the injected clock.
fn verify_signature(token: &Token<'_>, jwk: &Jwk, algorithm: Algorithm) -> Result<Claims, InvalidReason> {
    let key = DecodingKey::from_jwk(jwk).map_err(|e| {
        warn!(key_id = ?jwk.common.key_id, error = %e, "Failed to create decoding key from JWK");
        InvalidReason::ProcessingError(format!("unusable JWK: {e}"))
    })?;

    let mut validation = Validation::new(algorithm);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    validation.leeway = 0;

    decode::<Claims>(token.as_str(), &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => {
                debug!(key_id = ?jwk.common.key_id, "Signature verification failed");
                InvalidReason::SignatureMismatch
            }
            _ => {
                warn!(key_id = ?jwk.common.key_id, error = %e, "Token could not be verified");
                InvalidReason::ProcessingError(e.to_string())
            }
        })
}

fn check_time_claims(claims: &Claims, config: &ValidationConfig, now: i64) -> Result<(), InvalidReason> {
    let skew = i64::try_from(config.allowed_clock_skew_seconds).unwrap_or(i64::MAX);

    match claims.exp()? {
        None if config.require_expiration => return Err(InvalidReason::MissingExpiration),
        Some(exp) if now > exp.saturating_add(skew) => {
            return Err(InvalidReason::Expired { exp, now });
        }
        _ => {}
    }

    if config.validate_not_before
        && let Some(nbf) = claims.nbf()?
        && now.saturating_add(skew) < nbf
    {
        return Err(InvalidReason::NotYetValid { nbf, now });
    }

    Ok(())
}

fn check_audience(claims: &Claims, config: &ValidationConfig) -> Result<(), InvalidReason> {
    if config.skip_audience_validation {
        return Ok(());
    }

    let Some(expected) = config.expected_audience.as_deref() else {
        return Err(InvalidReason::ProcessingError(
            "audience validation enabled without an expected audience".to_string(),
        ));
    };

    if claims.audiences().contains(&expected) {
        Ok(())
    } else {
        Err(InvalidReason::AudienceMismatch {
            expected: expected.to_string(),
        })
    }
}
