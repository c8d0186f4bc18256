// boardpad CLI entry point.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod exit_code;
mod output;

use context::CliContext;
use exit_code::ExitCode;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "boardpad", about = "Local board documents with autosave and share links")]
struct Cli {
    /// Read settings from this file instead of ~/.boardpad/config.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use this database instead of the configured storage path.
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    #[command(subcommand)]
    command: commands::Command,
}

fn main() -> process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = match CliContext::load(cli.config.as_deref(), cli.storage) {
        Ok(ctx) => ctx,
        Err(err) => {
            output::print_anyhow_error(OutputFormat::detect(false), &err);
            return ExitCode::from_error(&err).into();
        }
    };

    match commands::run(cli.command, &ctx) {
        Ok(()) => ExitCode::Success.into(),
        Err(err) => {
            debug!(error = %format!("{err:#}"), "command failed");
            ExitCode::from_error(&err).into()
        }
    }
}
