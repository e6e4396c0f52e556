//! CLI argument parsing

use clap::{Args, Parser, Subcommand};
use jwtgate::Algorithm;
use std::path::PathBuf;
use std::str::FromStr;

/// Main CLI application structure
#[derive(Parser, Debug)]
#[command(
    name = "jwtgate",
    version,
    about = "Validate bearer tokens against a JWKS endpoint",
    long_about = "jwtgate checks an access token the way the gateway does: algorithm \
                  allow-list, signature against the keys published at a JWKS URL, \
                  expiry with clock skew and, when configured, audience.\n\n\
                  Exit status: 0 when the token passes, 1 when it is rejected, \
                  2 on usage or configuration errors."
)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (TOML, YAML or JSON)
    #[arg(long, short = 'c', global = true, env = "JWTGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log filter, overrides the config file (RUST_LOG wins over both)
    #[arg(long, global = true, env = "JWTGATE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub json_logs: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate one token and print the result as JSON
    Validate(ValidateArgs),
}

/// Arguments for `jwtgate validate`
#[derive(Args, Debug, Clone, Default)]
pub struct ValidateArgs {
    /// JWKS URL the token's signing key is published at
    #[arg(long, env = "JWTGATE_JWKS_URL")]
    pub jwks_url: Option<String>,

    /// The token, or `-` to read it from stdin
    #[arg(long, short = 't', env = "JWTGATE_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Clock skew tolerance in seconds
    #[arg(long)]
    pub clock_skew: Option<u64>,

    /// Require this value in the `aud` claim
    #[arg(long)]
    pub audience: Option<String>,

    /// Allowed algorithm (repeatable), replaces the configured list
    #[arg(long = "algorithm", short = 'a', value_parser = parse_algorithm)]
    pub algorithms: Vec<Algorithm>,

    /// Reject tokens whose `nbf` lies in the future
    #[arg(long)]
    pub validate_nbf: bool,

    /// Include the rejection reason in the output
    #[arg(long)]
    pub explain: bool,

    /// Print compact JSON
    #[arg(long)]
    pub compact: bool,
}

fn parse_algorithm(value: &str) -> Result<Algorithm, String> {
    Algorithm::from_str(value).map_err(|_| format!("unknown algorithm: {value}"))
}
