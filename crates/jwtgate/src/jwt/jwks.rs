//! JWKS (JSON Web Key Set) fetching and caching
//!
//! Signing keys change rarely, so each JWKS URL is fetched once and the
//! resulting [`KeySet`] is reused until a token names a key that is not in
//! it. At that point the resolver forces a [`KeySource::refresh`].
//!
//! - **Snapshot cache**: one immutable `Arc<KeySet>` per URL, replaced
//!   wholesale on refresh (last writer wins)
//! - **No expiry by default**: an optional TTL can be configured
//! - **Rate limiting**: optional minimum interval between forced refreshes
//! - **HTTPS only**: plain HTTP is accepted for loopback hosts, redirects
//!   are not followed and bodies are size capped
//!
//! Network access goes through the [`KeyFetcher`] trait so the cache can be
//! exercised without a server.

use async_trait::async_trait;
use dashmap::DashMap;
use jsonwebtoken::jwk::Jwk;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::{Host, Url};

use crate::clock::{Clock, SystemClock};
use crate::config::KeySourceConfig;
use crate::error::FetchError;

/// Keys published by one JWKS document
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    keys: Vec<Jwk>,
}

impl KeySet {
    /// Build a key set from already parsed keys
    pub fn new(keys: Vec<Jwk>) -> Self {
        Self { keys }
    }

    /// Parse a JWKS document
    ///
    /// Individual entries that cannot be parsed (unsupported key types or
    /// curves, missing parameters) are skipped so that one exotic key does not
    /// disable every other key in the set.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Parse`] if the body is not JSON or has no `keys`
    /// array.
    pub fn from_slice(body: &[u8]) -> Result<Self, FetchError> {
        let document: Value =
            serde_json::from_slice(body).map_err(|e| FetchError::Parse(e.to_string()))?;

        let entries = document
            .get("keys")
            .and_then(Value::as_array)
            .ok_or_else(|| FetchError::Parse("missing \"keys\" array".to_string()))?;

        let mut keys = Vec::with_capacity(entries.len());
        for entry in entries {
            match serde_json::from_value::<Jwk>(entry.clone()) {
                Ok(jwk) => keys.push(jwk),
                Err(e) => {
                    let kid = entry.get("kid").and_then(serde_json::Value::as_str);
                    warn!(
                        key_id = ?kid,
                        error = %e,
                        "Skipping unusable JWK"
                    );
                }
            }
        }

        Ok(Self { keys })
    }

    /// All keys in document order
    pub fn keys(&self) -> &[Jwk] {
        &self.keys
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set holds no keys
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Whether any key carries `kid`
    pub fn contains_kid(&self, kid: &str) -> bool {
        self.keys
            .iter()
            .any(|jwk| jwk.common.key_id.as_deref() == Some(kid))
    }
}

/// Retrieves a JWKS document
#[async_trait]
pub trait KeyFetcher: Send + Sync + std::fmt::Debug {
    /// Fetch and parse the key set published at `url`
    async fn fetch(&self, url: &str) -> Result<KeySet, FetchError>;
}

/// [`KeyFetcher`] over HTTPS
#[derive(Debug, Clone)]
pub struct HttpKeyFetcher {
    client: reqwest::Client,
    allow_loopback_http: bool,
    max_response_size: usize,
}

impl HttpKeyFetcher {
    /// Create a fetcher honoring the timeout and scheme policy of `config`
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &KeySourceConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            // A redirect could lead to a URL the scheme policy refuses
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| FetchError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self::with_client(client, config))
    }

    /// Use a preconfigured client (proxies, custom roots)
    ///
    /// Only the scheme policy and size limit of `config` apply. The client
    /// should not follow redirects, since only the requested URL is checked.
    pub fn with_client(client: reqwest::Client, config: &KeySourceConfig) -> Self {
        Self {
            client,
            allow_loopback_http: config.allow_loopback_http,
            max_response_size: config.max_response_size,
        }
    }

    fn check_url(&self, url: &str) -> Result<(), FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        match parsed.scheme() {
            "https" => Ok(()),
            "http" if self.allow_loopback_http && is_loopback(&parsed) => Ok(()),
            _ => Err(FetchError::InsecureUrl(url.to_string())),
        }
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

#[async_trait]
impl KeyFetcher for HttpKeyFetcher {
    async fn fetch(&self, url: &str) -> Result<KeySet, FetchError> {
        self.check_url(url)?;

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                error!(jwks_uri = %url, error = %e, "Failed to fetch JWKS");
                FetchError::Http(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(jwks_uri = %url, status = %status, "JWKS endpoint returned error status");
            return Err(FetchError::Status(status.as_u16()));
        }

        let too_large = FetchError::ResponseTooLarge {
            limit: self.max_response_size,
        };
        if let Some(length) = response.content_length()
            && length > self.max_response_size as u64
        {
            error!(jwks_uri = %url, content_length = length, "JWKS response too large");
            return Err(too_large);
        }

        let body = response.bytes().await.map_err(|e| {
            error!(jwks_uri = %url, error = %e, "Failed to read JWKS body");
            FetchError::Http(e.to_string())
        })?;

        if body.len() > self.max_response_size {
            error!(jwks_uri = %url, body_len = body.len(), "JWKS response too large");
            return Err(too_large);
        }

        KeySet::from_slice(&body).inspect_err(|e| {
            error!(jwks_uri = %url, error = %e, "Failed to parse JWKS JSON");
        })
    }
}

/// Whole seconds, rounded up and saturated to `i64`
fn whole_seconds(duration: Duration) -> i64 {
    let secs = duration
        .as_secs()
        .saturating_add(u64::from(duration.subsec_nanos() > 0));
    i64::try_from(secs).unwrap_or(i64::MAX)
}

#[derive(Debug, Clone)]
struct CachedKeySet {
    keys: Arc<KeySet>,
    fetched_at: i64,
}

/// Per-URL JWKS cache
///
/// # Example
///
/// ```rust,no_run
/// # use jwtgate::config::KeySourceConfig;
/// # use jwtgate::jwt::KeySource;
/// # tokio_test::block_on(async {
/// let source = KeySource::new(KeySourceConfig::default())?;
///
/// // First call fetches, later calls are served from the cache
/// let (keys, fresh) = source.keys("https://auth.example.com/.well-known/jwks.json").await?;
/// assert!(fresh);
/// println!("{} keys", keys.len());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # });
/// ```
#[derive(Debug)]
pub struct KeySource {
    fetcher: Arc<dyn KeyFetcher>,
    cache: DashMap<String, CachedKeySet>,
    config: KeySourceConfig,
    clock: Arc<dyn Clock>,
}

impl KeySource {
    /// Create a key source fetching over HTTPS
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the HTTP client cannot be built.
    pub fn new(config: KeySourceConfig) -> Result<Self, FetchError> {
        let fetcher = HttpKeyFetcher::new(&config)?;
        Ok(Self::with_fetcher(Arc::new(fetcher), config))
    }

    /// Create a key source around a custom fetcher
    pub fn with_fetcher(fetcher: Arc<dyn KeyFetcher>, config: KeySourceConfig) -> Self {
        Self {
            fetcher,
            cache: DashMap::new(),
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Use `clock` for fetch timestamps (TTL and refresh rate limiting)
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Retrieve the key set at `url` without touching the cache
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The URL is invalid or not HTTPS
    /// - The endpoint is unreachable or times out
    /// - The endpoint answers with a non-success status
    /// - The body is not a JWKS document
    pub async fn fetch(&self, url: &str) -> Result<KeySet, FetchError> {
        info!(jwks_uri = %url, "Fetching JWKS from endpoint");
        let keys = self.fetcher.fetch(url).await?;
        info!(jwks_uri = %url, key_count = keys.len(), "Successfully fetched JWKS");
        Ok(keys)
    }

    /// The cached key set for `url`, if present and not past its TTL
    pub fn cached(&self, url: &str) -> Option<Arc<KeySet>> {
        let entry = self.cache.get(url).map(|entry| entry.value().clone())?;

        if let Some(ttl) = self.config.cache_ttl
            && self.clock.now().saturating_sub(entry.fetched_at) >= whole_seconds(ttl)
        {
            debug!(jwks_uri = %url, "Cached JWKS past TTL");
            return None;
        }

        Some(entry.keys)
    }

    /// Re-fetch `url` and replace its cache entry
    ///
    /// When a minimum refresh interval is configured and the cached entry is
    /// younger than it, the cached entry is returned instead.
    ///
    /// # Errors
    ///
    /// Propagates [`fetch`](Self::fetch) errors; the previous entry is kept.
    pub async fn refresh(&self, url: &str) -> Result<Arc<KeySet>, FetchError> {
        self.refresh_entry(url).await.map(|(keys, _)| keys)
    }

    /// [`refresh`](Self::refresh), also reporting whether a fetch happened
    async fn refresh_entry(&self, url: &str) -> Result<(Arc<KeySet>, bool), FetchError> {
        let interval = self.config.min_refresh_interval;
        if !interval.is_zero()
            && let Some(entry) = self.cache.get(url).map(|entry| entry.value().clone())
        {
            let age = self.clock.now().saturating_sub(entry.fetched_at);
            if age < whole_seconds(interval) {
                warn!(
                    jwks_uri = %url,
                    age_secs = age,
                    "JWKS refresh rate limited, using cache"
                );
                return Ok((entry.keys, false));
            }
        }

        let keys = Arc::new(self.fetch(url).await?);
        self.cache.insert(
            url.to_string(),
            CachedKeySet {
                keys: Arc::clone(&keys),
                fetched_at: self.clock.now(),
            },
        );

        Ok((keys, true))
    }

    /// Cached key set for `url`, fetching it when absent
    ///
    /// The flag is `true` when the set was fetched by this call.
    ///
    /// # Errors
    ///
    /// Propagates [`fetch`](Self::fetch) errors on a cache miss.
    pub async fn keys(&self, url: &str) -> Result<(Arc<KeySet>, bool), FetchError> {
        if let Some(keys) = self.cached(url) {
            debug!(jwks_uri = %url, "Using cached JWKS");
            return Ok((keys, false));
        }

        self.refresh_entry(url).await
    }

    /// Drop the cached key set for `url`
    pub fn clear(&self, url: &str) {
        self.cache.remove(url);
        debug!(jwks_uri = %url, "JWKS cache cleared");
    }

    /// Drop every cached key set
    pub fn clear_all(&self) {
        self.cache.clear();
    }
}
