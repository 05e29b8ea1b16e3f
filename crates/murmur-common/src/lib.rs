//! # Murmur Common
//!
//! Shared types and utilities used across Murmur components.
//!
//! ## Modules
//! - `types` - Status tokens and control-plane wire types
//! - `error` - Common error types
//! - `constants` - Default addresses, routes, and gossip timings

pub mod constants;
pub mod error;
pub mod types;

pub use error::MurmurError;
pub use types::*;
