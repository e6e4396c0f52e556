//! Pipeline adapter
//!
//! Bridges a request pipeline and the [`TokenVerifier`]: the pipeline hands
//! over the access token and JWKS URL, and gets back a pass/fail flag plus the
//! properties it should set on failure.
//!
//! | Outcome | `ERROR_MESSAGE` | `HTTP_SC` |
//! |---------|-----------------|-----------|
//! | Valid | - | - |
//! | Expired | `Access token has expired!` | `401` |
//! | Any other failure | `Failed to process the access token.` | `401` |
//!
//! Reason details are logged, never returned to the caller.

use futures_util::FutureExt;
use serde::Serialize;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::error::InvalidReason;
use crate::jwt::{Claims, TokenVerifier};
use crate::outcome::ValidationOutcome;

/// Property carrying the caller-facing error message
pub const ERROR_MESSAGE: &str = "ERROR_MESSAGE";
/// Property carrying the HTTP status code
pub const HTTP_SC: &str = "HTTP_SC";
/// Message for expired tokens
pub const EXPIRED_MESSAGE: &str = "Access token has expired!";
/// Message for every other failure
pub const PROCESSING_FAILED_MESSAGE: &str = "Failed to process the access token.";
/// Status for every rejected token
pub const UNAUTHORIZED: u16 = 401;

/// What the pipeline should do with a request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediationResult {
    /// Whether the token passed
    pub passed: bool,
    /// Status to answer with when the token failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    /// Caller-facing message when the token failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<&'static str>,
    /// Verified claims when the token passed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claims: Option<Claims>,
}

impl MediationResult {
    fn pass(claims: Claims) -> Self {
        Self {
            passed: true,
            http_status: None,
            error_message: None,
            claims: Some(claims),
        }
    }

    pub(crate) fn fail(expired: bool) -> Self {
        Self {
            passed: false,
            http_status: Some(UNAUTHORIZED),
            error_message: Some(if expired {
                EXPIRED_MESSAGE
            } else {
                PROCESSING_FAILED_MESSAGE
            }),
            claims: None,
        }
    }

    /// Pipeline properties to set (`ERROR_MESSAGE`, `HTTP_SC`)
    pub fn properties(&self) -> HashMap<&'static str, String> {
        let mut properties = HashMap::new();
        if let Some(message) = self.error_message {
            properties.insert(ERROR_MESSAGE, message.to_string());
        }
        if let Some(status) = self.http_status {
            properties.insert(HTTP_SC, status.to_string());
        }
        properties
    }
}

impl From<&ValidationOutcome> for MediationResult {
    fn from(outcome: &ValidationOutcome) -> Self {
        match outcome {
            ValidationOutcome::Valid { claims } => Self::pass(claims.clone()),
            ValidationOutcome::Invalid { expired, .. } => Self::fail(*expired),
        }
    }
}

/// Token gate for a request pipeline
///
/// # Example
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use jwtgate::config::{KeySourceConfig, ValidationConfig};
/// # use jwtgate::jwt::{KeyResolver, KeySource, TokenVerifier};
/// # use jwtgate::mediator::Mediator;
/// # tokio_test::block_on(async {
/// let source = Arc::new(KeySource::new(KeySourceConfig::default())?);
/// let verifier = TokenVerifier::new(KeyResolver::new(source), ValidationConfig::default())?;
/// let mediator = Mediator::new(Arc::new(verifier));
///
/// let result = mediator
///     .mediate("eyJ0eXAi...", "https://auth.example.com/.well-known/jwks.json")
///     .await;
/// for (name, value) in result.properties() {
///     println!("{name} = {value}");
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct Mediator {
    verifier: Arc<TokenVerifier>,
}

impl Mediator {
    /// Create a mediator around a shared verifier
    pub fn new(verifier: Arc<TokenVerifier>) -> Self {
        Self { verifier }
    }

    /// The underlying verifier
    pub fn verifier(&self) -> &Arc<TokenVerifier> {
        &self.verifier
    }

    /// Validate `token` against `jwks_url` and translate the outcome
    ///
    /// A panic inside verification is contained and reported as a failure.
    pub async fn mediate(&self, token: &str, jwks_url: &str) -> MediationResult {
        self.validate(token, jwks_url).await.1
    }

    /// Like [`mediate`](Self::mediate), also returning the full outcome
    pub async fn validate(&self, token: &str, jwks_url: &str) -> (ValidationOutcome, MediationResult) {
        debug!(jwks_uri = %jwks_url, "Started: token mediation");

        let outcome = match AssertUnwindSafe(self.verifier.verify(token, jwks_url))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(jwks_uri = %jwks_url, detail = %detail, "Error occurred while processing the token");
                ValidationOutcome::invalid(InvalidReason::ProcessingError(detail))
            }
        };

        if let ValidationOutcome::Invalid { reason, expired } = &outcome {
            info!(reason = %reason, expired = *expired, "Invalid JWT");
        }

        let result = MediationResult::from(&outcome);
        debug!(jwks_uri = %jwks_url, passed = result.passed, "End: token mediation");
        (outcome, result)
    }
}
