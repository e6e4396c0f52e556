//! Error taxonomy for token validation
//!
//! Errors are layered the same way the verification pipeline is:
//!
//! - [`FetchError`] - retrieving or parsing a JWKS document
//! - [`KeyResolutionError`] - selecting a verification key (wraps [`FetchError`])
//! - [`InvalidReason`] - why a token was rejected (wraps [`KeyResolutionError`])
//! - [`ConfigError`] - rejected configuration
//!
//! Underlying library errors are flattened to strings so that outcomes stay
//! `Clone` and comparable.

use thiserror::Error;

/// Failure to retrieve a JWKS document
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// URL could not be parsed
    #[error("Invalid JWKS URL '{url}': {message}")]
    InvalidUrl {
        /// The offending URL
        url: String,
        /// Parser message
        message: String,
    },

    /// URL does not use HTTPS (plain HTTP is only accepted for loopback hosts)
    #[error("JWKS endpoint must use HTTPS: {0}")]
    InsecureUrl(String),

    /// Transport-level failure (connect, TLS, timeout)
    #[error("JWKS fetch failed: {0}")]
    Http(String),

    /// Endpoint answered with a non-success status
    #[error("JWKS endpoint returned status {0}")]
    Status(u16),

    /// Body exceeds the configured size limit
    #[error("JWKS response exceeds {limit} bytes")]
    ResponseTooLarge {
        /// Configured limit in bytes
        limit: usize,
    },

    /// Body was not a JWKS document
    #[error("Invalid JWKS format: {0}")]
    Parse(String),
}

/// Failure to select a verification key for a token
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyResolutionError {
    /// The key set could not be fetched
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// No key matched the token header, even after a refresh
    #[error("No key matching kid {kid:?} and algorithm {algorithm}")]
    NoMatchingKey {
        /// Key id from the token header, if any
        kid: Option<String>,
        /// Algorithm from the token header
        algorithm: String,
    },

    /// Several keys matched equally well
    #[error("{count} keys match kid {kid:?} and algorithm {algorithm}")]
    AmbiguousKey {
        /// Key id from the token header, if any
        kid: Option<String>,
        /// Algorithm from the token header
        algorithm: String,
        /// Number of matching keys
        count: usize,
    },
}

/// Why a token was rejected
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidReason {
    /// Token is not a well-formed compact JWS
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// Header algorithm is not in the allow-list
    #[error("Algorithm '{0}' is not allowed")]
    DisallowedAlgorithm(String),

    /// No usable verification key
    #[error("Key resolution failed: {0}")]
    KeyResolutionFailed(#[from] KeyResolutionError),

    /// Signature does not verify under the resolved key
    #[error("Signature verification failed")]
    SignatureMismatch,

    /// Token carries no `exp` claim
    #[error("Token has no expiration time")]
    MissingExpiration,

    /// `exp` plus clock skew is in the past
    #[error("Token expired at {exp} (now {now})")]
    Expired {
        /// The `exp` claim
        exp: i64,
        /// Validation time
        now: i64,
    },

    /// `nbf` minus clock skew is in the future
    #[error("Token not valid before {nbf} (now {now})")]
    NotYetValid {
        /// The `nbf` claim
        nbf: i64,
        /// Validation time
        now: i64,
    },

    /// `aud` does not name the expected audience
    #[error("Token audience does not include '{expected}'")]
    AudienceMismatch {
        /// The configured audience
        expected: String,
    },

    /// Anything not otherwise categorized
    #[error("Token processing failed: {0}")]
    ProcessingError(String),
}

impl InvalidReason {
    /// Whether this reason is an expiration
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Expired { .. })
    }
}

impl From<FetchError> for InvalidReason {
    fn from(err: FetchError) -> Self {
        Self::KeyResolutionFailed(KeyResolutionError::Fetch(err))
    }
}

/// Rejected configuration
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The algorithm allow-list is empty
    #[error("At least one algorithm must be allowed")]
    NoAlgorithms,

    /// A symmetric algorithm was allowed
    #[error("Algorithm {0} is symmetric; only public-key algorithms can be verified against a JWKS")]
    SymmetricAlgorithm(String),

    /// Audience validation is on without an expected audience
    #[error("Audience validation requires an expected audience")]
    MissingAudience,
}

/// Result alias for configuration checks
pub type ConfigResult<T> = Result<T, ConfigError>;
