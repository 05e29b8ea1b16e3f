//! CLI subcommands and the outcome type they report through.

use std::process::ExitCode;

pub mod status;

/// What a command wants shown to the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    /// Nothing to print
    Silent,
    /// Informational line for stdout
    Output(String),
    /// Diagnostic for stderr
    Error(String),
}

/// Result of one command invocation: a report plus the process exit code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub report: Report,
    pub code: u8,
}

impl Outcome {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            report: Report::Output(output.into()),
            code: 0,
        }
    }

    pub fn silent_success() -> Self {
        Self {
            report: Report::Silent,
            code: 0,
        }
    }

    /// Non-zero exit that still prints to stdout (e.g. a failed check)
    pub fn rejected(output: impl Into<String>) -> Self {
        Self {
            report: Report::Output(output.into()),
            code: 1,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            report: Report::Error(message.into()),
            code: 1,
        }
    }

    /// Print the report and hand back the exit code
    pub fn emit(self) -> ExitCode {
        match self.report {
            Report::Silent => {}
            Report::Output(text) => println!("{text}"),
            Report::Error(text) => eprintln!("{text}"),
        }
        ExitCode::from(self.code)
    }
}
