//! Configuration types for token validation and key retrieval

use std::time::Duration;

use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Token validation policy
///
/// Defaults mirror a permissive single-issuer gateway: RS256 only, `exp`
/// required, 30 seconds of clock skew, no audience check and no `nbf` check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ValidationConfig {
    /// Reject tokens without an `exp` claim
    pub require_expiration: bool,
    /// Tolerance, in seconds, applied when comparing time claims to now
    pub allowed_clock_skew_seconds: u64,
    /// Algorithms a token header may declare
    pub allowed_algorithms: Vec<Algorithm>,
    /// Skip checking the `aud` claim
    pub skip_audience_validation: bool,
    /// Audience that `aud` must contain when audience validation is on
    pub expected_audience: Option<String>,
    /// Reject tokens whose `nbf` lies in the future
    pub validate_not_before: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            require_expiration: true,
            allowed_clock_skew_seconds: 30,
            allowed_algorithms: vec![Algorithm::RS256],
            skip_audience_validation: true,
            expected_audience: None,
            validate_not_before: false,
        }
    }
}

impl ValidationConfig {
    /// Set the clock skew tolerance
    #[must_use]
    pub fn with_clock_skew(mut self, seconds: u64) -> Self {
        self.allowed_clock_skew_seconds = seconds;
        self
    }

    /// Replace the algorithm allow-list
    ///
    /// # Security Warning
    ///
    /// Only public-key algorithms are accepted by [`validate`](Self::validate).
    #[must_use]
    pub fn with_algorithms(mut self, algorithms: Vec<Algorithm>) -> Self {
        self.allowed_algorithms = algorithms;
        self
    }

    /// Require or waive the `exp` claim
    #[must_use]
    pub fn require_expiration(mut self, required: bool) -> Self {
        self.require_expiration = required;
        self
    }

    /// Enable audience validation against `audience`
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.expected_audience = Some(audience.into());
        self.skip_audience_validation = false;
        self
    }

    /// Enable or disable the `nbf` check
    #[must_use]
    pub fn validate_not_before(mut self, enabled: bool) -> Self {
        self.validate_not_before = enabled;
        self
    }

    /// Whether `algorithm` is in the allow-list
    pub fn allows(&self, algorithm: Algorithm) -> bool {
        self.allowed_algorithms.contains(&algorithm)
    }

    /// Check the configuration is usable
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The allow-list is empty
    /// - The allow-list contains an HMAC algorithm
    /// - Audience validation is enabled without an expected audience
    pub fn validate(&self) -> ConfigResult<()> {
        if self.allowed_algorithms.is_empty() {
            return Err(ConfigError::NoAlgorithms);
        }

        if let Some(alg) = self
            .allowed_algorithms
            .iter()
            .find(|alg| matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512))
        {
            return Err(ConfigError::SymmetricAlgorithm(format!("{alg:?}")));
        }

        if !self.skip_audience_validation && self.expected_audience.is_none() {
            return Err(ConfigError::MissingAudience);
        }

        Ok(())
    }
}

/// Key retrieval and caching settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct KeySourceConfig {
    /// Network timeout for a single JWKS fetch
    pub fetch_timeout: Duration,
    /// Age after which a cached key set is refetched (`None` = never)
    pub cache_ttl: Option<Duration>,
    /// Minimum time between two forced refreshes of the same URL
    pub min_refresh_interval: Duration,
    /// Accept plain HTTP for loopback hosts
    pub allow_loopback_http: bool,
    /// Largest JWKS body accepted, in bytes
    pub max_response_size: usize,
}

/// Default cap on a JWKS body
pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 256 * 1024;

impl Default for KeySourceConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            cache_ttl: None,
            min_refresh_interval: Duration::ZERO,
            allow_loopback_http: true,
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
        }
    }
}

impl KeySourceConfig {
    /// Set the per-fetch network timeout
    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Expire cached key sets after `ttl`
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Rate limit forced refreshes
    #[must_use]
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// Cap the size of a JWKS body
    #[must_use]
    pub fn with_max_response_size(mut self, bytes: usize) -> Self {
        self.max_response_size = bytes;
        self
    }
}
