//! Tower Service implementation for JWT validation
//!
//! The flow for each request:
//! 1. Bypass paths go straight to the inner service
//! 2. The bearer token is taken from the configured header
//! 3. The [`Mediator`] validates it against the configured JWKS URL
//! 4. On success the claims are inserted into the request extensions and the
//!    inner service is called; otherwise a `401` is returned directly

use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use http::header::{HeaderValue, WWW_AUTHENTICATE};
use http::{HeaderMap, StatusCode};
use tower_service::Service;
use tracing::debug;

use crate::mediator::{MediationResult, Mediator, PROCESSING_FAILED_MESSAGE};

use super::JwtLayerConfig;

/// Tower Service that validates bearer tokens
#[derive(Debug, Clone)]
pub struct JwtAuthService<S> {
    inner: S,
    mediator: Arc<Mediator>,
    config: JwtLayerConfig,
}

impl<S> JwtAuthService<S> {
    /// Create a new auth service
    pub fn new(inner: S, mediator: Arc<Mediator>, config: JwtLayerConfig) -> Self {
        Self {
            inner,
            mediator,
            config,
        }
    }

    /// Get a reference to the inner service
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Get a mutable reference to the inner service
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

/// Extract a bearer token from `headers`
///
/// The scheme is matched case-insensitively.
fn extract_token(headers: &HeaderMap, header_name: &str) -> Option<String> {
    let value = headers.get(header_name)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();

    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

fn reject<ResBody>(result: MediationResult) -> http::Response<ResBody>
where
    ResBody: From<&'static str>,
{
    let message = result.error_message.unwrap_or(PROCESSING_FAILED_MESSAGE);
    let status = result
        .http_status
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::UNAUTHORIZED);

    let mut response = http::Response::new(ResBody::from(message));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    response.extensions_mut().insert(result);
    response
}

/// Future type for auth service responses
pub type JwtAuthFuture<T, E> = BoxFuture<'static, Result<T, E>>;

impl<S, B, ResBody> Service<http::Request<B>> for JwtAuthService<S>
where
    S: Service<http::Request<B>, Response = http::Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Send + 'static,
    B: Send + 'static,
    ResBody: From<&'static str> + Send + 'static,
{
    type Response = http::Response<ResBody>;
    type Error = S::Error;
    type Future = JwtAuthFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: http::Request<B>) -> Self::Future {
        // The clone may not be ready; keep the one that was polled
        let inner = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, inner);

        if self.config.should_bypass(req.uri().path()) {
            return Box::pin(async move { inner.call(req).await });
        }

        let token = extract_token(req.headers(), &self.config.auth_header);
        let mediator = Arc::clone(&self.mediator);
        let jwks_url = self.config.jwks_url.clone();

        Box::pin(async move {
            let result = match token {
                Some(token) => mediator.mediate(&token, &jwks_url).await,
                None => {
                    debug!(path = %req.uri().path(), "No bearer token provided");
                    MediationResult::fail(false)
                }
            };

            if !result.passed {
                return Ok(reject(result));
            }

            if let Some(claims) = result.claims {
                req.extensions_mut().insert(claims);
            }
            inner.call(req).await
        })
    }
}
