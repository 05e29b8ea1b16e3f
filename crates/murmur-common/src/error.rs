//! Common error types for Murmur components.

use thiserror::Error;

/// Common errors across Murmur components
#[derive(Debug, Error)]
pub enum MurmurError {
    /// Bad command line usage
    #[error("{0}")]
    Usage(String),

    /// Control-plane client could not be established
    #[error("{0}")]
    Connection(String),

    /// Transport failure or remote error surfaced by the agent
    #[error("{0}")]
    Rpc(String),

    /// Compare-and-set rejected: the node's status is not the expected one
    #[error("current status is {current:?}, expected {expected:?}")]
    StatusMismatch { expected: String, current: String },

    /// Status token refused by the agent
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MurmurError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Usage(_) => 400,
            Self::Connection(_) => 503,
            Self::Rpc(_) => 502,
            Self::StatusMismatch { .. } => 409,
            Self::InvalidStatus(_) => 400,
            Self::Config(_) => 500,
        }
    }

    /// Current status carried by a mismatch, if any
    pub fn current_status(&self) -> Option<&str> {
        match self {
            Self::StatusMismatch { current, .. } => Some(current),
            _ => None,
        }
    }
}
