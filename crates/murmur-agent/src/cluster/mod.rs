//! Cluster coordination.
//!
//! Implements the status gossip protocol (UDP) that spreads each node's
//! status to its peers and tracks what the peers report back.

mod gossip;

pub use gossip::{GossipConfig, GossipService};
