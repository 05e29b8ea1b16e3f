//! `murmur status` - Query, check, or compare-and-set the node's status.
//!
//! The number of positional arguments picks the mode:
//!
//! | args | mode | RPC |
//! |------|------|-----|
//! | 0 | query | `status()` |
//! | 1 | check | `status()`, compared locally |
//! | 2 | compare-and-set | `update_status(expected, new)` |
//!
//! Anything more is a usage error and no connection is made.

use clap::{Args, CommandFactory};

use murmur_common::constants::DEFAULT_RPC_ADDR;
use murmur_common::{MurmurError, statuses_match};

use super::Outcome;
use crate::client::{Connect, ControlClient};

pub const LONG_ABOUT: &str = "\
Query, check, or conditionally change the status string this node gossips to its peers.

Without arguments, print the node's current status. A node almost always sees itself as
alive, so this is not what the rest of the cluster thinks of it.

With one argument (the expected status), act as a test: exit 1 and print the actual status
unless it matches the expected one. Matching ignores case.

With two arguments (the expected and new status), ask the node to switch to the new status
and broadcast it, but only if its current status matches the expected one. The node does
the comparison, so concurrent updates cannot be lost. Nodes start out \"alive\".";

const TOO_MANY_ARGS: &str =
    "Too many command line arguments. Only an expectedStatus and newStatus may be specified.";

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Control-plane address of the Murmur agent.
    #[arg(long, default_value = DEFAULT_RPC_ADDR, env = "MURMUR_RPC_ADDR")]
    pub rpc_addr: String,

    /// [expectedStatus [newStatus]]
    #[arg(value_name = "STATUS")]
    pub statuses: Vec<String>,
}

/// What this invocation does, chosen once from the argument count
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Query,
    Check { expected: String },
    CompareAndSet { expected: String, new: String },
}

impl Mode {
    pub fn from_args(args: &[String]) -> Result<Self, MurmurError> {
        match args {
            [] => Ok(Self::Query),
            [expected] => Ok(Self::Check {
                expected: expected.clone(),
            }),
            [expected, new] => Ok(Self::CompareAndSet {
                expected: expected.clone(),
                new: new.clone(),
            }),
            _ => Err(MurmurError::Usage(TOO_MANY_ARGS.to_string())),
        }
    }
}

/// Validate arguments, connect, and run the selected mode.
///
/// The client lives only inside this call and is released on every path.
pub async fn run<K: Connect>(args: &StatusArgs, connector: &K) -> Outcome {
    let mode = match Mode::from_args(&args.statuses) {
        Ok(mode) => mode,
        Err(e) => return Outcome::failure(format!("{e}\n\n{}", help_text())),
    };

    let client = match connector.connect(&args.rpc_addr).await {
        Ok(client) => client,
        Err(e) => {
            tracing::debug!(rpc_addr = %args.rpc_addr, error = %e, "Agent connection failed");
            return Outcome::failure(format!("Error connecting to murmur agent: {e}"));
        }
    };

    execute(&mode, &client).await
}

/// Run one mode against an established client
pub async fn execute<C: ControlClient + ?Sized>(mode: &Mode, client: &C) -> Outcome {
    match mode {
        Mode::Query => query(client).await,
        Mode::Check { expected } => check(client, expected).await,
        Mode::CompareAndSet { expected, new } => compare_and_set(client, expected, new).await,
    }
}

async fn query<C: ControlClient + ?Sized>(client: &C) -> Outcome {
    match client.status().await {
        Ok(status) => Outcome::success(status),
        Err(e) => Outcome::failure(format!("Error getting status: {e}")),
    }
}

// A mismatch and an RPC failure both exit 1; only the missing "Error" line
// tells them apart.
async fn check<C: ControlClient + ?Sized>(client: &C, expected: &str) -> Outcome {
    match client.status().await {
        Ok(status) if statuses_match(&status, expected) => Outcome::silent_success(),
        Ok(status) => {
            tracing::debug!(expected = %expected, actual = %status, "Status check failed");
            Outcome::rejected(status)
        }
        Err(e) => Outcome::failure(format!("Error getting status: {e}")),
    }
}

async fn compare_and_set<C: ControlClient + ?Sized>(
    client: &C,
    expected: &str,
    new: &str,
) -> Outcome {
    match client.update_status(expected, new).await {
        Ok(()) => Outcome::success(format!("Status updated to {new:?}, broadcasting to peers")),
        Err(e) => Outcome::failure(format!("Error updating status: {e}")),
    }
}

/// Full help of the `status` subcommand, shown after usage errors
fn help_text() -> String {
    let mut cli = crate::Cli::command();
    cli.build();
    cli.find_subcommand_mut("status")
        .map(|cmd| cmd.render_long_help().to_string())
        .unwrap_or_default()
}
