//! Configuration management for the agent.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use murmur_common::MurmurError;
use murmur_common::constants::{DEFAULT_RPC_ADDR, DEFAULT_STATUS};

use crate::cluster::GossipConfig;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Control-plane HTTP listen address
    #[serde(default = "default_rpc_addr")]
    pub rpc_addr: String,

    /// This node's unique ID (auto-generated if not set)
    #[serde(default = "generate_node_id")]
    pub node_id: String,

    /// Status reported until an operator changes it
    #[serde(default = "default_status")]
    pub initial_status: String,

    /// Gossip configuration
    #[serde(default)]
    pub gossip: GossipConfig,
}

// Default value functions
fn default_rpc_addr() -> String { DEFAULT_RPC_ADDR.to_string() }
fn default_status() -> String { DEFAULT_STATUS.to_string() }

fn generate_node_id() -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    format!("node-{:08x}", rng.random::<u32>())
}

impl AppConfig {
    /// Load configuration from file and `MURMUR__*` environment, with CLI overrides
    pub fn load(config_path: &str, args: &super::Args) -> Result<Self> {
        let mut builder = config::Config::builder();

        if Path::new(config_path).exists() {
            builder = builder.add_source(config::File::with_name(config_path));
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
        }

        let mut config: Self = builder
            .add_source(
                config::Environment::with_prefix("MURMUR")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("gossip.peers"),
            )
            .build()
            .context("Failed to load config")?
            .try_deserialize()
            .context("Failed to parse config")?;

        // Apply CLI overrides
        if let Some(ref rpc_addr) = args.rpc_addr {
            config.rpc_addr = rpc_addr.clone();
        }
        if let Some(ref gossip_addr) = args.gossip_addr {
            config.gossip.bind_addr = gossip_addr.clone();
        }
        if !args.peers.is_empty() {
            config.gossip.peers = args.peers.clone();
        }
        if let Some(ref node_id) = args.node_id {
            config.node_id = node_id.clone();
        }

        config.validate()?;

        Ok(config)
    }

    /// Reject settings the agent cannot run with
    pub fn validate(&self) -> Result<(), MurmurError> {
        if self.initial_status.trim().is_empty() {
            return Err(MurmurError::Config("initial_status must not be empty".to_string()));
        }
        if self.node_id.is_empty() {
            return Err(MurmurError::Config("node_id must not be empty".to_string()));
        }
        if self.gossip.interval_secs == 0 {
            return Err(MurmurError::Config("gossip.interval_secs must be at least 1".to_string()));
        }
        if self.gossip.peer_timeout_secs == 0 {
            return Err(MurmurError::Config(
                "gossip.peer_timeout_secs must be at least 1".to_string(),
            ));
        }
        let threshold = self.gossip.isolation_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(MurmurError::Config(format!(
                "gossip.isolation_threshold must be in (0, 1], got {threshold}"
            )));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rpc_addr: default_rpc_addr(),
            node_id: generate_node_id(),
            initial_status: default_status(),
            gossip: GossipConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_common::constants::{DEFAULT_GOSSIP_ADDR, GOSSIP_INTERVAL_SECS};

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.rpc_addr, "127.0.0.1:7373");
        assert_eq!(config.initial_status, "alive");
        assert!(config.node_id.starts_with("node-"));
        assert_eq!(config.gossip.bind_addr, DEFAULT_GOSSIP_ADDR);
        assert!(config.gossip.peers.is_empty());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                node_id = "node-a"

                [gossip]
                peers = ["10.0.0.2:7946"]
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.node_id, "node-a");
        assert_eq!(config.rpc_addr, DEFAULT_RPC_ADDR);
        assert_eq!(config.gossip.peers, vec!["10.0.0.2:7946".to_string()]);
        assert_eq!(config.gossip.interval_secs, GOSSIP_INTERVAL_SECS);
    }

    #[test]
    fn test_blank_initial_status_rejected() {
        let config = AppConfig {
            initial_status: "  ".to_string(),
            ..AppConfig::default()
        };

        assert!(matches!(config.validate(), Err(MurmurError::Config(_))));
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_gossip_settings_validated() {
        let with_gossip = |interval_secs: u64, peer_timeout_secs: u64, isolation_threshold: f32| AppConfig {
            gossip: GossipConfig {
                interval_secs,
                peer_timeout_secs,
                isolation_threshold,
                ..GossipConfig::default()
            },
            ..AppConfig::default()
        };

        for bad in [
            with_gossip(0, 30, 0.5),
            with_gossip(5, 0, 0.5),
            with_gossip(5, 30, 0.0),
            with_gossip(5, 30, 1.5),
            with_gossip(5, 30, f32::NAN),
        ] {
            assert!(matches!(bad.validate(), Err(MurmurError::Config(_))));
        }
        assert!(with_gossip(1, 1, 1.0).validate().is_ok());
    }
}
