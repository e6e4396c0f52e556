//! # Tower Middleware Integration
//!
//! Puts the [`Mediator`](crate::mediator::Mediator) in front of any
//! `http::Request` service:
//!
//! - [`JwtAuthLayer`] - a Tower Layer wrapping services with token validation
//! - [`JwtAuthService`] - extracts the bearer token and validates it
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tower::ServiceBuilder;
//! use jwtgate::tower::{JwtAuthLayer, JwtLayerConfig};
//!
//! let service = ServiceBuilder::new()
//!     .layer(JwtAuthLayer::new(mediator, JwtLayerConfig::new(jwks_url)))
//!     .service(my_inner_service);
//! ```
//!
//! ## Request Extensions
//!
//! On success the verified [`Claims`](crate::jwt::Claims) are inserted into
//! the request's extensions:
//!
//! ```rust,ignore
//! if let Some(claims) = req.extensions().get::<Claims>() {
//!     println!("Authenticated subject: {:?}", claims.sub());
//! }
//! ```
//!
//! On failure the inner service is not called. The response is a `401` whose
//! body is the caller-facing message, with the
//! [`MediationResult`](crate::mediator::MediationResult) in its extensions.

mod layer;
mod service;

pub use layer::JwtAuthLayer;
pub use service::{JwtAuthFuture, JwtAuthService};

/// Configuration for the JWT auth layer
#[derive(Debug, Clone)]
pub struct JwtLayerConfig {
    /// JWKS URL tokens are validated against
    pub jwks_url: String,
    /// Header name to extract the token from (default: "Authorization")
    pub auth_header: String,
    /// Request paths that bypass validation (e.g., "/health")
    pub bypass_paths: Vec<String>,
}

impl JwtLayerConfig {
    /// Create a config validating against `jwks_url`
    pub fn new(jwks_url: impl Into<String>) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            auth_header: "Authorization".to_string(),
            bypass_paths: Vec::new(),
        }
    }

    /// Add a path to the bypass list
    #[must_use]
    pub fn bypass_path(mut self, path: impl Into<String>) -> Self {
        self.bypass_paths.push(path.into());
        self
    }

    /// Set the authorization header name
    #[must_use]
    pub fn auth_header(mut self, header: impl Into<String>) -> Self {
        self.auth_header = header.into();
        self
    }

    /// Check if a path should bypass validation
    #[must_use]
    pub fn should_bypass(&self, path: &str) -> bool {
        self.bypass_paths.iter().any(|p| p == path)
    }
}
