use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use jwtgate_cli::{Cli, CliError};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match jwtgate_cli::run(cli).await.context("jwtgate failed") {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {e:#}");
            if let Some(cli_error) = e.downcast_ref::<CliError>() {
                for suggestion in cli_error.suggestions() {
                    eprintln!("  hint: {suggestion}");
                }
            }
            ExitCode::from(2)
        }
    }
}
