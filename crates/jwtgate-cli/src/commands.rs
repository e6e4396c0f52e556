//! Command implementations

use std::io::Read;
use std::sync::Arc;

use jwtgate::{
    KeyResolver, KeySource, KeySourceConfig, MediationResult, Mediator, TokenVerifier,
    ValidationConfig,
};
use serde::Serialize;
use tracing::debug;

use crate::cli::ValidateArgs;
use crate::error::{CliError, CliResult};
use crate::settings::Settings;

/// Printed result of `jwtgate validate`
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    #[serde(flatten)]
    pub result: MediationResult,
    /// Rejection reason, with `--explain`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Report {
    /// Render as JSON
    pub fn to_json(&self, compact: bool) -> CliResult<String> {
        Ok(if compact {
            serde_json::to_string(self)?
        } else {
            serde_json::to_string_pretty(self)?
        })
    }
}

/// Command-line overrides applied on top of the configured policy
pub fn validation_config(settings: &Settings, args: &ValidateArgs) -> ValidationConfig {
    let mut config = settings.validation.clone();
    if let Some(skew) = args.clock_skew {
        config = config.with_clock_skew(skew);
    }
    if !args.algorithms.is_empty() {
        config = config.with_algorithms(args.algorithms.clone());
    }
    if let Some(audience) = &args.audience {
        config = config.with_audience(audience.clone());
    }
    if args.validate_nbf {
        config = config.validate_not_before(true);
    }
    config
}

fn read_token(arg: &str, mut stdin: impl Read) -> CliResult<String> {
    let token = if arg == "-" {
        let mut buffer = String::new();
        stdin.read_to_string(&mut buffer)?;
        buffer
    } else {
        arg.to_string()
    };

    let token = token.trim();
    if token.is_empty() {
        return Err(CliError::MissingToken);
    }
    Ok(token.to_string())
}

/// Validate one token
///
/// # Errors
///
/// Returns error if the settings are unusable or no token or JWKS URL was
/// given. A rejected token is not an error.
pub async fn validate(settings: &Settings, args: &ValidateArgs) -> CliResult<Report> {
    let token = read_token(&args.token, std::io::stdin())?;
    let jwks_url = args
        .jwks_url
        .clone()
        .or_else(|| settings.jwks_url.clone())
        .ok_or(CliError::MissingJwksUrl)?;

    let config = validation_config(settings, args);
    debug!(jwks_uri = %jwks_url, ?config, "Validating token");

    let source = Arc::new(KeySource::new(KeySourceConfig::from(&settings.key_source))?);
    let verifier = TokenVerifier::new(KeyResolver::new(source), config)?;
    let mediator = Mediator::new(Arc::new(verifier));

    let (outcome, result) = mediator.validate(&token, &jwks_url).await;

    Ok(Report {
        result,
        reason: args
            .explain
            .then(|| outcome.reason().map(ToString::to_string))
            .flatten(),
    })
}
