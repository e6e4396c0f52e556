//! JWT infrastructure - key retrieval, key selection and token verification
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │            TokenVerifier             │
//! │  - structural parsing                │
//! │  - algorithm allow-list              │
//! │  - signature + exp/nbf/aud checks    │
//! └──────────────────┬───────────────────┘
//!                    │
//!          ┌─────────┴─────────┐
//!          │    KeyResolver    │  kid / alg selection, one refresh on miss
//!          └─────────┬─────────┘
//!                    │
//!          ┌─────────┴─────────┐
//!          │     KeySource     │  per-URL JWKS cache, HTTP fetch
//!          └───────────────────┘
//! ```
//!
//! # Modules
//!
//! - `jwks` - JWKS fetching and caching
//! - `resolver` - verification key selection
//! - `verifier` - token verification

pub mod jwks;
pub mod resolver;
pub mod verifier;

// Re-export commonly used types
pub use jwks::{HttpKeyFetcher, KeyFetcher, KeySet, KeySource};
pub use resolver::KeyResolver;
pub use verifier::TokenVerifier;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

use crate::error::InvalidReason;

/// JOSE header of a compact JWS
///
/// `alg` is kept as the raw string so that unknown or unsupported names
/// (including `none`) are rejected by the allow-list rather than the parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    /// Signature algorithm name
    pub alg: String,
    /// Key ID hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Media type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    /// Extensions the recipient must understand (RFC 7515 section 4.1.11)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crit: Option<Vec<String>>,
}

impl TokenHeader {
    /// The declared algorithm, if it is one we know
    pub fn algorithm(&self) -> Option<Algorithm> {
        Algorithm::from_str(&self.alg).ok()
    }
}

/// JWT claims set per RFC 7519
///
/// A plain JSON object. Registered time claims are read through the typed
/// accessors, which accept integer or fractional NumericDate values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    /// Look up a claim by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Whether the claim is present
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Subject (sub)
    pub fn sub(&self) -> Option<&str> {
        self.0.get("sub").and_then(Value::as_str)
    }

    /// Expiration time (exp)
    ///
    /// # Errors
    ///
    /// Returns [`InvalidReason::MalformedToken`] if the claim is not a number.
    pub fn exp(&self) -> Result<Option<i64>, InvalidReason> {
        self.numeric_date("exp")
    }

    /// Not before (nbf)
    ///
    /// # Errors
    ///
    /// Returns [`InvalidReason::MalformedToken`] if the claim is not a number.
    pub fn nbf(&self) -> Result<Option<i64>, InvalidReason> {
        self.numeric_date("nbf")
    }

    /// Issued at (iat)
    ///
    /// # Errors
    ///
    /// Returns [`InvalidReason::MalformedToken`] if the claim is not a number.
    pub fn iat(&self) -> Result<Option<i64>, InvalidReason> {
        self.numeric_date("iat")
    }

    /// Audiences (aud), whether given as a string or an array
    pub fn audiences(&self) -> Vec<&str> {
        match self.0.get("aud") {
            Some(Value::String(aud)) => vec![aud.as_str()],
            Some(Value::Array(values)) => values.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Borrow the underlying JSON object
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Take the underlying JSON object
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    fn numeric_date(&self, name: &str) -> Result<Option<i64>, InvalidReason> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.floor() as i64))
                .map(Some)
                .ok_or_else(|| {
                    InvalidReason::MalformedToken(format!("claim '{name}' is out of range"))
                }),
            Some(_) => Err(InvalidReason::MalformedToken(format!(
                "claim '{name}' is not a NumericDate"
            ))),
        }
    }
}

impl From<Map<String, Value>> for Claims {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Structurally parsed compact JWS
///
/// Nothing in here is trusted: the claims are only exposed to callers after
/// [`TokenVerifier`] has checked the signature.
#[derive(Debug, Clone)]
pub struct Token<'a> {
    /// Decoded header
    pub header: TokenHeader,
    /// Decoded, unverified claims
    pub claims: Claims,
    raw: &'a str,
}

impl<'a> Token<'a> {
    /// Split and decode `header.payload.signature`
    ///
    /// # Errors
    ///
    /// Returns [`InvalidReason::MalformedToken`] if the token does not have
    /// exactly three base64url segments, the header is not a JOSE header or
    /// carries `crit`, the
    /// payload is not a JSON object, or a registered time claim is not numeric.
    pub fn parse(raw: &'a str) -> Result<Self, InvalidReason> {
        let mut segments = raw.split('.');
        let (Some(header), Some(payload), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(malformed("expected three dot-separated segments"));
        };

        if signature.is_empty() {
            return Err(malformed("signature segment is empty"));
        }
        URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|e| malformed(format!("signature is not base64url: {e}")))?;

        let header_bytes = URL_SAFE_NO_PAD
            .decode(header)
            .map_err(|e| malformed(format!("header is not base64url: {e}")))?;
        let header: TokenHeader = serde_json::from_slice(&header_bytes)
            .map_err(|e| malformed(format!("invalid header: {e}")))?;
        // No header extensions are supported, and an empty list is invalid
        if let Some(crit) = &header.crit {
            return Err(malformed(format!(
                "unsupported critical header extensions: {crit:?}"
            )));
        }

        let payload_bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| malformed(format!("payload is not base64url: {e}")))?;
        let claims: Claims = serde_json::from_slice(&payload_bytes)
            .map_err(|e| malformed(format!("payload is not a JSON object: {e}")))?;

        claims.exp()?;
        claims.nbf()?;
        claims.iat()?;

        Ok(Self {
            header,
            claims,
            raw,
        })
    }

    /// The compact serialization as received
    pub fn as_str(&self) -> &'a str {
        self.raw
    }
}

fn malformed(message: impl Into<String>) -> InvalidReason {
    InvalidReason::MalformedToken(message.into())
}
