//! Tower Layer implementation for JWT validation

use std::sync::Arc;
use tower::Layer;

use crate::mediator::Mediator;

use super::JwtLayerConfig;
use super::service::JwtAuthService;

/// Tower Layer that adds bearer token validation to services
///
/// This layer wraps inner services with [`JwtAuthService`].
#[derive(Debug, Clone)]
pub struct JwtAuthLayer {
    mediator: Arc<Mediator>,
    config: JwtLayerConfig,
}

impl JwtAuthLayer {
    /// Create a new layer
    pub fn new(mediator: Mediator, config: JwtLayerConfig) -> Self {
        Self::from_arc(Arc::new(mediator), config)
    }

    /// Create a new layer from an Arc'd mediator
    pub fn from_arc(mediator: Arc<Mediator>, config: JwtLayerConfig) -> Self {
        Self { mediator, config }
    }

    /// Add a path to bypass validation
    #[must_use]
    pub fn bypass_path(mut self, path: impl Into<String>) -> Self {
        self.config.bypass_paths.push(path.into());
        self
    }
}

impl<S> Layer<S> for JwtAuthLayer {
    type Service = JwtAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        JwtAuthService::new(inner, Arc::clone(&self.mediator), self.config.clone())
    }
}
