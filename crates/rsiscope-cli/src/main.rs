use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use rsiscope_cli::cli::Cli;
use rsiscope_cli::error::CliError;
use rsiscope_cli::{commands, exit_status, output};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

async fn run() -> Result<ExitCode, CliError> {
    let cli = Cli::parse();

    let envelope = commands::run(&cli).await?;
    output::render(&envelope, cli.format, cli.pretty)?;

    Ok(ExitCode::from(exit_status(&envelope, cli.strict)?))
}
