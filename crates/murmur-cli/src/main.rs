//! # Murmur CLI
//!
//! Operator commands against a running Murmur agent.
//!
//! ```text
//! murmur status                      # print the node's status
//! murmur status alive                # exit 1 unless the status is "alive"
//! murmur status alive maintenance    # alive -> maintenance, then gossip it
//! ```

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod client;
mod commands;

/// Murmur - gossip cluster membership
#[derive(Parser, Debug)]
#[command(name = "murmur")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn", env = "LOG_LEVEL")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Query, check, or conditionally change the node's status.
    #[command(long_about = commands::status::LONG_ABOUT)]
    Status(commands::status::StatusArgs),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help and --version are not failures
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if let Err(e) = init_logging(&cli.log_level) {
        eprintln!("Error initializing logging: {e:#}");
        return ExitCode::FAILURE;
    }

    let outcome = match &cli.command {
        Commands::Status(args) => {
            commands::status::run(args, &client::HttpConnector::default()).await
        }
    };

    outcome.emit()
}

/// Initialize logging to stderr so stdout only carries command output
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()?;

    Ok(())
}
