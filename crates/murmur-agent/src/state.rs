//! Application state and shared resources.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

use crate::cluster::GossipService;
use crate::config::AppConfig;
use murmur_common::{MemberInfo, MembersResponse, MurmurError, statuses_match};

/// This node's status as it is gossiped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStatus {
    pub status: String,
    /// Process start in Unix ms, so peers can tell a restart from stale gossip
    pub epoch: u64,
    /// Bumped on every accepted transition so peers can order updates
    pub incarnation: u64,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Node identifier for clustering
    pub node_id: String,

    /// Local status; the gossip broadcaster subscribes to it
    status: Arc<watch::Sender<NodeStatus>>,

    /// Peer tracking and status propagation
    pub gossip: Arc<GossipService>,

    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(config: AppConfig) -> Self {
        let node_id = config.node_id.clone();
        let (status, _) = watch::channel(NodeStatus {
            status: config.initial_status,
            epoch: chrono::Utc::now().timestamp_millis().max(0) as u64,
            incarnation: 0,
        });
        let gossip = Arc::new(GossipService::new(config.gossip, node_id.clone()));

        Self {
            node_id,
            status: Arc::new(status),
            gossip,
            started_at: Instant::now(),
        }
    }

    /// Current local status
    pub fn status(&self) -> NodeStatus {
        self.status.borrow().clone()
    }

    /// Receiver that wakes on every accepted status change
    pub fn subscribe(&self) -> watch::Receiver<NodeStatus> {
        self.status.subscribe()
    }

    /// Compare-and-set the local status.
    ///
    /// The comparison and the write happen under the channel's lock, so two
    /// concurrent updates expecting the same status cannot both succeed.
    pub fn update_status(&self, expected: &str, new: &str) -> Result<NodeStatus, MurmurError> {
        if new.trim().is_empty() {
            return Err(MurmurError::InvalidStatus("status must not be empty".to_string()));
        }

        let mut outcome = Err(String::new());
        self.status.send_if_modified(|current| {
            if statuses_match(&current.status, expected) {
                current.status = new.to_string();
                current.incarnation += 1;
                outcome = Ok(current.clone());
                true
            } else {
                outcome = Err(current.status.clone());
                false
            }
        });

        let result = outcome.map_err(|current| MurmurError::StatusMismatch {
            expected: expected.to_string(),
            current,
        });

        match &result {
            Ok(updated) => tracing::info!(
                status = %updated.status,
                incarnation = updated.incarnation,
                "Status updated"
            ),
            Err(e) => tracing::info!(expected = %expected, error = %e, "Status update rejected"),
        }

        result
    }

    /// This node plus every peer it has heard from
    pub async fn members(&self) -> MembersResponse {
        let local = self.status();
        MembersResponse {
            local: MemberInfo {
                node_id: self.node_id.clone(),
                status: local.status,
                incarnation: local.incarnation,
                healthy: true,
                last_seen: chrono::Utc::now().timestamp(),
            },
            peers: self.gossip.members().await,
            isolated: self.gossip.is_isolated().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppState {
        AppState::new(AppConfig {
            node_id: "node-a".to_string(),
            ..AppConfig::default()
        })
    }

    #[test]
    fn test_starts_alive() {
        let state = state();
        let status = state.status();
        assert_eq!(status.status, "alive");
        assert_eq!(status.incarnation, 0);
        assert!(status.epoch > 0);
    }

    #[test]
    fn test_update_matches_case_insensitively() {
        let state = state();
        let mut rx = state.subscribe();

        let updated = state.update_status("ALIVE", "degraded").unwrap();

        assert_eq!(updated.status, "degraded");
        assert_eq!(updated.incarnation, 1);
        assert_eq!(state.status(), updated);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().status, "degraded");
    }

    #[test]
    fn test_mismatch_leaves_status_untouched() {
        let state = state();
        let rx = state.subscribe();

        let err = state.update_status("dead", "alive").unwrap_err();

        match err {
            MurmurError::StatusMismatch { expected, current } => {
                assert_eq!(expected, "dead");
                assert_eq!(current, "alive");
            }
            other => panic!("expected mismatch, got {other:?}"),
        }
        assert_eq!(state.status().incarnation, 0);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_only_one_of_two_racing_updates_wins() {
        let state = state();

        let first = state.update_status("alive", "leaving");
        let second = state.update_status("alive", "maintenance");

        assert!(first.is_ok());
        assert!(matches!(second, Err(MurmurError::StatusMismatch { .. })));
        assert_eq!(state.status().status, "leaving");
    }

    #[test]
    fn test_empty_status_rejected() {
        let state = state();

        assert!(matches!(
            state.update_status("alive", " "),
            Err(MurmurError::InvalidStatus(_))
        ));
        assert_eq!(state.status().status, "alive");
    }

    #[tokio::test]
    async fn test_members_includes_self() {
        let state = state();
        state.update_status("alive", "draining").unwrap();

        let members = state.members().await;

        assert_eq!(members.local.node_id, "node-a");
        assert_eq!(members.local.status, "draining");
        assert!(members.peers.is_empty());
        assert!(!members.isolated);
    }
}
