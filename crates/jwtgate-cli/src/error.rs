//! Error types for CLI operations

use std::path::PathBuf;
use thiserror::Error;

/// CLI-specific errors
///
/// Token rejections are not errors; they are reported through the printed
/// result and the exit code.
#[derive(Error, Debug)]
pub enum CliError {
    /// Config file does not exist
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    /// Config file extension not recognized
    #[error("Unsupported configuration file format: {0} (use .toml, .yaml, .yml or .json)")]
    UnsupportedConfigFormat(PathBuf),

    /// Config file or environment holds an invalid value
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    /// Validation settings rejected by the verifier
    #[error("Invalid validation settings: {0}")]
    InvalidSettings(#[from] jwtgate::ConfigError),

    /// The key source could not be created
    #[error("Key source error: {0}")]
    KeySource(#[from] jwtgate::FetchError),

    /// No JWKS URL on the command line or in the settings
    #[error("No JWKS URL given (use --jwks-url, JWTGATE_JWKS_URL or `jwks_url` in the config file)")]
    MissingJwksUrl,

    /// The token argument was empty
    #[error("No token given")]
    MissingToken,

    /// Logging could not be initialized
    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    /// JSON output error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Hints printed after the error message
    pub fn suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::MissingJwksUrl => vec![
                "Pass --jwks-url https://issuer.example.com/.well-known/jwks.json",
            ],
            Self::MissingToken => vec!["Pass --token <JWT> or --token - to read it from stdin"],
            Self::InvalidSettings(_) => vec![
                "Allow at least one asymmetric algorithm (e.g. RS256)",
                "Set an expected audience when audience validation is enabled",
            ],
            Self::ConfigNotFound(_) | Self::UnsupportedConfigFormat(_) => {
                vec!["Check the path given with --config"]
            }
            _ => vec![],
        }
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
