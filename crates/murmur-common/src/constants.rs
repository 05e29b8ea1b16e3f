//! Shared constants for Murmur components.

/// Status every node reports on startup
pub const DEFAULT_STATUS: &str = "alive";

/// Default control-plane (RPC) address of the local agent
pub const DEFAULT_RPC_ADDR: &str = "127.0.0.1:7373";

/// Default UDP bind address for gossip
pub const DEFAULT_GOSSIP_ADDR: &str = "0.0.0.0:7946";

/// Gossip broadcast interval (seconds)
pub const GOSSIP_INTERVAL_SECS: u64 = 5;

/// Peer is marked unhealthy after this much silence (seconds)
pub const PEER_TIMEOUT_SECS: u64 = 30;

/// Fraction of unhealthy peers at which a node considers itself isolated
pub const ISOLATION_THRESHOLD: f32 = 0.5;

/// Largest gossip datagram we accept
pub const MAX_GOSSIP_PACKET: usize = 1024;

/// Control-plane HTTP routes
pub mod routes {
    /// Liveness probe, also used as the client's connection handshake
    pub const HEALTH: &str = "/health";

    /// GET: current status, POST: compare-and-set
    pub const STATUS: &str = "/v1/status";

    /// GET: this node's view of cluster members
    pub const MEMBERS: &str = "/v1/members";
}
