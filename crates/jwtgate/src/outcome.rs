//! Result of validating one token

use crate::error::InvalidReason;
use crate::jwt::Claims;

/// Pass/fail decision for a token
///
/// `expired` is carried separately from the reason because it selects a
/// different caller-facing message.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    /// Signature and claims check out
    Valid {
        /// The verified claims
        claims: Claims,
    },
    /// Token rejected
    Invalid {
        /// Why the token was rejected
        reason: InvalidReason,
        /// Whether the rejection is an expiration
        expired: bool,
    },
}

impl ValidationOutcome {
    /// Build an `Invalid` outcome, deriving the `expired` flag from `reason`
    pub fn invalid(reason: InvalidReason) -> Self {
        let expired = reason.is_expired();
        Self::Invalid { reason, expired }
    }

    /// Whether the token passed
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    /// Whether the token was rejected for being expired
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Invalid { expired: true, .. })
    }

    /// Verified claims of a valid token
    pub fn claims(&self) -> Option<&Claims> {
        match self {
            Self::Valid { claims } => Some(claims),
            Self::Invalid { .. } => None,
        }
    }

    /// Rejection reason of an invalid token
    pub fn reason(&self) -> Option<&InvalidReason> {
        match self {
            Self::Valid { .. } => None,
            Self::Invalid { reason, .. } => Some(reason),
        }
    }

    /// Convert into a `Result`
    ///
    /// # Errors
    ///
    /// Returns the rejection reason of an invalid token.
    pub fn into_result(self) -> Result<Claims, InvalidReason> {
        match self {
            Self::Valid { claims } => Ok(claims),
            Self::Invalid { reason, .. } => Err(reason),
        }
    }
}

impl From<Result<Claims, InvalidReason>> for ValidationOutcome {
    fn from(result: Result<Claims, InvalidReason>) -> Self {
        match result {
            Ok(claims) => Self::Valid { claims },
            Err(reason) => Self::invalid(reason),
        }
    }
}
