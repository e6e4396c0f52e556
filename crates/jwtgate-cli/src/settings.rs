//! Layered settings: defaults, an optional config file, then `JWTGATE_*`
//! environment variables
//!
//! ```toml
//! jwks_url = "https://auth.example.com/.well-known/jwks.json"
//!
//! [validation]
//! allowed_clock_skew_seconds = 60
//! allowed_algorithms = ["RS256", "PS256"]
//!
//! [key_source]
//! fetch_timeout_secs = 5
//! cache_ttl_secs = 3600
//! max_response_bytes = 65536
//!
//! [logging]
//! level = "info"
//! json = true
//! ```
//!
//! Nested keys are addressed with `__` in the environment, e.g.
//! `JWTGATE_VALIDATION__ALLOWED_CLOCK_SKEW_SECONDS=60`.

use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat, Map};
use jwtgate::{KeySourceConfig, ValidationConfig};
use serde::Deserialize;

use crate::error::{CliError, CliResult};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "JWTGATE";

/// Everything the CLI reads from files and the environment
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// JWKS URL used when `--jwks-url` is absent
    pub jwks_url: Option<String>,
    pub validation: ValidationConfig,
    pub key_source: KeySourceSettings,
    pub logging: LoggingSettings,
}

/// Key retrieval settings, in whole seconds
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KeySourceSettings {
    pub fetch_timeout_secs: u64,
    pub cache_ttl_secs: Option<u64>,
    pub min_refresh_interval_secs: u64,
    pub allow_loopback_http: bool,
    pub max_response_bytes: usize,
}

impl Default for KeySourceSettings {
    fn default() -> Self {
        let defaults = KeySourceConfig::default();
        Self {
            fetch_timeout_secs: defaults.fetch_timeout.as_secs(),
            cache_ttl_secs: defaults.cache_ttl.map(|ttl| ttl.as_secs()),
            min_refresh_interval_secs: defaults.min_refresh_interval.as_secs(),
            allow_loopback_http: defaults.allow_loopback_http,
            max_response_bytes: defaults.max_response_size,
        }
    }
}

impl From<&KeySourceSettings> for KeySourceConfig {
    fn from(settings: &KeySourceSettings) -> Self {
        let mut config = KeySourceConfig::default()
            .with_fetch_timeout(Duration::from_secs(settings.fetch_timeout_secs))
            .with_min_refresh_interval(Duration::from_secs(settings.min_refresh_interval_secs))
            .with_max_response_size(settings.max_response_bytes);
        if let Some(ttl) = settings.cache_ttl_secs {
            config = config.with_cache_ttl(Duration::from_secs(ttl));
        }
        config.allow_loopback_http = settings.allow_loopback_http;
        config
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}

impl Settings {
    /// Load settings from `path` (TOML, YAML or JSON) and the process
    /// environment
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The file doesn't exist or its extension is not supported
    /// - The file or an environment variable holds an invalid value
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`load`](Self::load) with an explicit environment (`None` reads
    /// the process environment)
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<Map<String, String>>,
    ) -> CliResult<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(CliError::ConfigNotFound(path.to_path_buf()));
            }

            let format = match path.extension().and_then(|s| s.to_str()) {
                Some("toml") => FileFormat::Toml,
                Some("yaml") | Some("yml") => FileFormat::Yaml,
                Some("json") => FileFormat::Json,
                _ => return Err(CliError::UnsupportedConfigFormat(path.to_path_buf())),
            };

            builder = builder.add_source(File::from(path).format(format));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("validation.allowed_algorithms")
                    .source(env),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
