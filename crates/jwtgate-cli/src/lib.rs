//! # jwtgate CLI
//!
//! Command-line front end for the `jwtgate` validator. Useful for checking a
//! token against an issuer by hand, or from scripts via the exit status.
//!
//! ## Usage
//!
//! ```bash
//! # Validate a token
//! jwtgate validate --jwks-url https://auth.example.com/.well-known/jwks.json \
//!   --token eyJ0eXAi...
//!
//! # Read the token from stdin and show why it was rejected
//! echo "$TOKEN" | jwtgate validate --jwks-url "$JWKS" --token - --explain
//!
//! # Policy from a file, overridable with JWTGATE_* variables
//! jwtgate --config jwtgate.toml validate --token "$TOKEN"
//! ```

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod settings;

pub use cli::{Cli, Commands, ValidateArgs};
pub use error::{CliError, CliResult};
pub use settings::Settings;

/// Run a parsed command line
///
/// Returns whether the token passed.
///
/// # Errors
///
/// Returns error for configuration, logging or I/O failures.
pub async fn run(cli: Cli) -> CliResult<bool> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        settings.logging.level = level;
    }
    if cli.json_logs {
        settings.logging.json = true;
    }
    logging::init(&settings.logging)?;

    match cli.command {
        Commands::Validate(args) => {
            let report = commands::validate(&settings, &args).await?;
            println!("{}", report.to_json(args.compact)?);
            Ok(report.result.passed)
        }
    }
}
