//! Status Gossip Protocol (UDP)
//!
//! Each node sends a small JSON packet carrying its status to every known
//! peer on a fixed interval, and immediately after its status changes.
//! Receivers keep the newest packet per node, ordered by the sender's epoch
//! (process start) and then its incarnation, so
//! the cluster converges on the latest status of every member.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::{RwLock, watch};

use murmur_common::MemberInfo;
use murmur_common::constants::{
    DEFAULT_GOSSIP_ADDR, GOSSIP_INTERVAL_SECS, ISOLATION_THRESHOLD, MAX_GOSSIP_PACKET,
    PEER_TIMEOUT_SECS,
};

use crate::state::NodeStatus;

/// Gossip protocol configuration
#[derive(Clone, Debug, Deserialize)]
pub struct GossipConfig {
    /// Local bind address (e.g., "10.100.0.1:7946")
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Peer addresses to broadcast to
    #[serde(default)]
    pub peers: Vec<String>,
    /// Broadcast interval in seconds
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    /// Peer timeout in seconds (mark as unhealthy after this)
    #[serde(default = "default_peer_timeout")]
    pub peer_timeout_secs: u64,
    /// Node counts as isolated once this fraction of peers is unreachable
    #[serde(default = "default_isolation_threshold")]
    pub isolation_threshold: f32,
}

fn default_bind_addr() -> String { DEFAULT_GOSSIP_ADDR.to_string() }
fn default_interval() -> u64 { GOSSIP_INTERVAL_SECS }
fn default_peer_timeout() -> u64 { PEER_TIMEOUT_SECS }
fn default_isolation_threshold() -> f32 { ISOLATION_THRESHOLD }

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            peers: vec![],
            interval_secs: default_interval(),
            peer_timeout_secs: default_peer_timeout(),
            isolation_threshold: default_isolation_threshold(),
        }
    }
}

/// Gossip packet broadcast to peers
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GossipPacket {
    /// Unique node identifier
    pub node_id: String,
    /// Operator-assigned status token
    pub status: String,
    /// Sender's process start (ms); a restart begins a new epoch
    pub epoch: u64,
    /// Bumped on every accepted status change within an epoch
    pub incarnation: u64,
    /// Unix timestamp
    pub timestamp: i64,
    /// Software version
    pub version: String,
}

impl GossipPacket {
    /// Create a new gossip packet with current state
    pub fn new(node_id: String, local: &NodeStatus) -> Self {
        Self {
            node_id,
            status: local.status.clone(),
            epoch: local.epoch,
            incarnation: local.incarnation,
            timestamp: chrono::Utc::now().timestamp(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Order of updates from one node: newer process first, then newer change
    fn version_key(&self) -> (u64, u64) {
        (self.epoch, self.incarnation)
    }
}

/// What we know about a peer
#[derive(Clone, Debug)]
pub struct PeerState {
    /// Last accepted gossip packet
    pub last_packet: GossipPacket,
    /// Last seen timestamp
    pub last_seen: Instant,
    /// Unix time we received the last packet, by our clock
    pub last_heard: i64,
    /// Is this node considered healthy?
    pub is_healthy: bool,
}

impl PeerState {
    pub fn to_member(&self) -> MemberInfo {
        MemberInfo {
            node_id: self.last_packet.node_id.clone(),
            status: self.last_packet.status.clone(),
            incarnation: self.last_packet.incarnation,
            healthy: self.is_healthy,
            last_seen: self.last_heard,
        }
    }
}

/// Gossip service for cluster status propagation
pub struct GossipService {
    /// Configuration
    config: GossipConfig,
    /// Our node ID
    node_id: String,
    /// Known peer states
    peers: Arc<RwLock<HashMap<String, PeerState>>>,
    /// Are we isolated from the cluster?
    isolated: Arc<RwLock<bool>>,
}

impl GossipService {
    /// Create a new gossip service
    pub fn new(config: GossipConfig, node_id: String) -> Self {
        Self {
            config,
            node_id,
            peers: Arc::new(RwLock::new(HashMap::new())),
            isolated: Arc::new(RwLock::new(false)),
        }
    }

    /// Get our node ID
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Check if we're isolated from the cluster
    pub async fn is_isolated(&self) -> bool {
        *self.isolated.read().await
    }

    /// Known peers, sorted by node ID
    pub async fn members(&self) -> Vec<MemberInfo> {
        let peers = self.peers.read().await;
        let mut members: Vec<_> = peers.values().map(PeerState::to_member).collect();
        members.sort_by(|a, b| a.node_id.cmp(&b.node_id));
        members
    }

    /// Run the gossip broadcaster.
    ///
    /// Sends on every tick, and right away whenever `local` changes.
    pub async fn run_broadcaster(
        &self,
        mut local: watch::Receiver<NodeStatus>,
        mut shutdown: tokio::sync::broadcast::Receiver<()>,
    ) -> Result<()> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .context("Failed to bind gossip sender socket")?;

        let interval = Duration::from_secs(self.config.interval_secs);

        tracing::info!(
            peers = ?self.config.peers,
            interval = ?interval,
            "Gossip broadcaster started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                changed = local.changed() => {
                    if changed.is_err() {
                        tracing::info!("Status channel closed, gossip broadcaster stopping");
                        break;
                    }
                    tracing::debug!("Local status changed, broadcasting now");
                }
                _ = shutdown.recv() => {
                    tracing::info!("Gossip broadcaster shutting down");
                    break;
                }
            }

            let packet = GossipPacket::new(self.node_id.clone(), &local.borrow_and_update());
            self.broadcast(&socket, &packet).await;
        }

        Ok(())
    }

    async fn broadcast(&self, socket: &UdpSocket, packet: &GossipPacket) {
        let bytes = match serde_json::to_vec(packet) {
            Ok(b) => b,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize gossip packet");
                return;
            }
        };

        for peer in &self.config.peers {
            if let Err(e) = socket.send_to(&bytes, peer).await {
                tracing::warn!(peer = %peer, error = %e, "Failed to send gossip");
            }
        }
    }

    /// Run the gossip receiver
    pub async fn run_receiver(
        &self,
        shutdown: tokio::sync::broadcast::Receiver<()>,
    ) -> Result<()> {
        let socket = UdpSocket::bind(&self.config.bind_addr)
            .await
            .context("Failed to bind gossip receiver socket")?;

        self.receive_loop(socket, shutdown).await;

        Ok(())
    }

    async fn receive_loop(
        &self,
        socket: UdpSocket,
        mut shutdown: tokio::sync::broadcast::Receiver<()>,
    ) {
        let mut buf = vec![0u8; MAX_GOSSIP_PACKET];
        let timeout = Duration::from_secs(self.config.peer_timeout_secs);

        // Created once so a steady stream of packets cannot starve the sweep
        let mut sweep = tokio::time::interval(Duration::from_secs(1));
        sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(
            addr = ?socket.local_addr().ok(),
            "Gossip receiver started"
        );

        loop {
            tokio::select! {
                result = socket.recv_from(&mut buf) => {
                    match result {
                        Ok((len, addr)) => {
                            self.handle_packet(&buf[..len], addr).await;
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Gossip receive error");
                        }
                    }
                }
                _ = sweep.tick() => {
                    // Periodic cleanup and isolation check
                    self.check_peer_health(timeout).await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Gossip receiver shutting down");
                    break;
                }
            }
        }
    }

    /// Handle an incoming gossip packet
    async fn handle_packet(&self, data: &[u8], addr: SocketAddr) {
        let packet: GossipPacket = match serde_json::from_slice(data) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(addr = %addr, error = %e, "Invalid gossip packet");
                return;
            }
        };

        // Don't process our own packets
        if packet.node_id == self.node_id {
            return;
        }

        let mut peers = self.peers.write().await;

        if let Some(known) = peers.get(&packet.node_id) {
            if packet.version_key() < known.last_packet.version_key() {
                tracing::debug!(
                    node = %packet.node_id,
                    stale = ?packet.version_key(),
                    known = ?known.last_packet.version_key(),
                    "Dropping stale gossip"
                );
                return;
            }
            if known.last_packet.status != packet.status {
                tracing::info!(
                    node = %packet.node_id,
                    from = %known.last_packet.status,
                    to = %packet.status,
                    "Peer status changed"
                );
            }
        } else {
            tracing::info!(node = %packet.node_id, status = %packet.status, addr = %addr, "New peer");
        }

        peers.insert(
            packet.node_id.clone(),
            PeerState {
                last_packet: packet,
                last_seen: Instant::now(),
                last_heard: chrono::Utc::now().timestamp(),
                is_healthy: true,
            },
        );
    }

    /// Check peer health and isolation status
    async fn check_peer_health(&self, timeout: Duration) {
        let mut peers = self.peers.write().await;
        let total_peers = peers.len();
        let mut unhealthy_count = 0;

        for health in peers.values_mut() {
            if health.last_seen.elapsed() > timeout {
                if health.is_healthy {
                    tracing::warn!(
                        node = %health.last_packet.node_id,
                        "Peer marked unhealthy (timeout)"
                    );
                }
                health.is_healthy = false;
                unhealthy_count += 1;
            }
        }

        drop(peers);

        // Check isolation
        if total_peers > 0 {
            let unhealthy_ratio = unhealthy_count as f32 / total_peers as f32;
            let isolated = unhealthy_ratio >= self.config.isolation_threshold;

            let mut is_isolated = self.isolated.write().await;
            if isolated != *is_isolated {
                if isolated {
                    tracing::error!(
                        unhealthy = unhealthy_count,
                        total = total_peers,
                        "Node is ISOLATED from cluster"
                    );
                } else {
                    tracing::info!("Node reconnected to cluster");
                }
                *is_isolated = isolated;
            }
        }
    }
}
