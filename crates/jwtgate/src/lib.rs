//! # jwtgate - JWKS-backed Bearer Token Validation
//!
//! Validates RS256-signed access tokens against keys published at a JWKS URL
//! and turns the result into a pass/fail decision for a request pipeline.
//!
//! ## Key Features
//!
//! - **Per-URL key cache** - one HTTP fetch per JWKS URL, shared by every request
//! - **Rotation handling** - exactly one refresh when a token names an unknown key
//! - **Algorithm allow-list** - checked before any network activity
//! - **Clock skew tolerance** - 30 seconds by default
//! - **Fail closed** - every error, panic included, ends as a rejection
//! - **Tower middleware** - optional `Layer` for `http` services
//!
//! ## Architecture
//!
//! - [`jwt`] - token parsing, key retrieval, key selection, verification
//! - [`outcome`] - the [`ValidationOutcome`] of one verification
//! - [`mediator`] - translates outcomes into pipeline properties
//! - [`config`] - validation and key source configuration
//! - [`error`] - failure reasons
//! - [`clock`] - time source used for expiry checks
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use jwtgate::{KeyResolver, KeySource, KeySourceConfig, Mediator, TokenVerifier, ValidationConfig};
//!
//! # tokio_test::block_on(async {
//! let source = Arc::new(KeySource::new(KeySourceConfig::default())?);
//! let verifier = TokenVerifier::new(KeyResolver::new(source), ValidationConfig::default())?;
//! let mediator = Mediator::new(Arc::new(verifier));
//!
//! let result = mediator
//!     .mediate("eyJ0eXAi...", "https://auth.example.com/.well-known/jwks.json")
//!     .await;
//! if !result.passed {
//!     println!("{:?}", result.properties());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```
//!
//! ## Feature Flags
//!
//! - `middleware` (default) - Tower `Layer`/`Service` for `http` requests
//! - `tower` - alias for `middleware`

pub mod clock;
pub mod config;
pub mod error;
pub mod jwt;
pub mod mediator;
pub mod outcome;

#[cfg(feature = "middleware")]
pub mod tower;

#[doc(inline)]
pub use clock::{Clock, SystemClock};

#[doc(inline)]
pub use config::{KeySourceConfig, ValidationConfig};

#[doc(inline)]
pub use error::{ConfigError, FetchError, InvalidReason, KeyResolutionError};

#[doc(inline)]
pub use jwt::{Claims, KeyResolver, KeySet, KeySource, TokenHeader, TokenVerifier};

#[doc(inline)]
pub use mediator::{MediationResult, Mediator};

#[doc(inline)]
pub use outcome::ValidationOutcome;

// Re-export the algorithm type used by ValidationConfig
pub use jsonwebtoken::Algorithm;
