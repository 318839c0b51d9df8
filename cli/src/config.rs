// Configuration management for the AetherMesh CLI
//
// Cross-platform config stored in:
// - macOS: ~/Library/Application Support/aethermesh/config.json
// - Linux: ~/.config/aethermesh/config.json
// - Windows: %APPDATA%\aethermesh\config.json

use aethermesh_core::{MacAddress, NodeConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// This node's mesh address
    pub address: MacAddress,

    /// UDP socket the emulated radio listens on
    pub bind: SocketAddr,

    /// Nodes in radio range
    #[serde(default)]
    pub neighbors: Vec<Neighbor>,

    /// Scheduler and forwarding settings
    #[serde(default)]
    pub node: NodeConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Neighbor {
    pub address: MacAddress,
    pub socket: SocketAddr,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: generate_address(),
            bind: SocketAddr::from(([0, 0, 0, 0], 47800)),
            neighbors: Vec::new(),
            node: NodeConfig::default(),
        }
    }
}

/// Locally administered unicast address, unique enough for a test mesh
fn generate_address() -> MacAddress {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();

    let mut hasher = blake3::Hasher::new();
    hasher.update(&nanos.to_le_bytes());
    hasher.update(&std::process::id().to_le_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 6];
    bytes.copy_from_slice(&digest.as_bytes()[..6]);
    bytes[0] = (bytes[0] & 0xFE) | 0x02;
    MacAddress(bytes)
}

impl Config {
    /// Get the config directory path (cross-platform)
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?
            .join("aethermesh");

        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;

        Ok(config_dir)
    }

    /// Get the config file path
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Load config from the platform config file, creating it on first use
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file()?)
    }

    /// Save config to the platform config file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path).context("Failed to read config file")?;
            let config: Config =
                serde_json::from_str(&contents).context("Failed to parse config file")?;
            Ok(config)
        } else {
            // First run: pin a fresh address so it survives restarts
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents).context("Failed to write config file")?;
        Ok(())
    }

    /// Add or update a neighbor
    pub fn add_neighbor(&mut self, address: MacAddress, socket: SocketAddr) {
        match self.neighbors.iter_mut().find(|n| n.address == address) {
            Some(existing) => existing.socket = socket,
            None => self.neighbors.push(Neighbor { address, socket }),
        }
    }

    /// Remove a neighbor; returns false if it was not configured
    pub fn remove_neighbor(&mut self, address: &MacAddress) -> bool {
        let before = self.neighbors.len();
        self.neighbors.retain(|n| &n.address != address);
        self.neighbors.len() != before
    }

    /// Set a config value
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "address" => {
                self.address = value.parse().context("Invalid MAC address")?;
            }
            "bind" => {
                self.bind = value.parse().context("Invalid socket address")?;
            }
            "intake_tick_ms" => {
                self.node.intake_tick_ms = value.parse().context("Invalid number")?;
            }
            "advertise_interval_ms" => {
                self.node.advertise_interval_ms = value.parse().context("Invalid number")?;
            }
            "default_ttl" => {
                self.node.default_ttl = value.parse().context("Invalid TTL (0-255)")?;
            }
            "dedup_capacity" => {
                self.node.dedup_capacity = value.parse().context("Invalid number")?;
            }
            "verify_checksums" => {
                self.node.verify_checksums = value.parse().context("Invalid boolean value")?;
            }
            "console" => {
                self.node.console = value.parse().context("Invalid boolean value")?;
            }
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
        Ok(())
    }

    /// Get a config value
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "address" => Some(self.address.to_string()),
            "bind" => Some(self.bind.to_string()),
            "intake_tick_ms" => Some(self.node.intake_tick_ms.to_string()),
            "advertise_interval_ms" => Some(self.node.advertise_interval_ms.to_string()),
            "default_ttl" => Some(self.node.default_ttl.to_string()),
            "dedup_capacity" => Some(self.node.dedup_capacity.to_string()),
            "verify_checksums" => Some(self.node.verify_checksums.to_string()),
            "console" => Some(self.node.console.to_string()),
            _ => None,
        }
    }

    /// List all config values
    pub fn list(&self) -> Vec<(String, String)> {
        [
            "address",
            "bind",
            "intake_tick_ms",
            "advertise_interval_ms",
            "default_ttl",
            "dedup_capacity",
            "verify_checksums",
            "console",
        ]
        .iter()
        .filter_map(|key| self.get(key).map(|value| (key.to_string(), value)))
        .chain(std::iter::once((
            "neighbors".to_string(),
            self.neighbors.len().to_string(),
        )))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.bind.to_string(), "0.0.0.0:47800");
        assert!(config.neighbors.is_empty());
        // Locally administered, unicast
        assert_eq!(config.address.0[0] & 0x03, 0x02);
        assert!(!config.address.is_broadcast());
    }

    #[test]
    fn test_first_load_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let first = Config::load_from(&path).unwrap();
        assert!(path.exists());

        let second = Config::load_from(&path).unwrap();
        assert_eq!(first.address, second.address);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.set("address", "aa:bb:cc:dd:ee:01").unwrap();
        config.set("verify_checksums", "true").unwrap();
        config.add_neighbor(
            "aabbccddee02".parse().unwrap(),
            "127.0.0.1:47801".parse().unwrap(),
        );
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.get("address").as_deref(), Some("aabbccddee01"));
        assert!(loaded.node.verify_checksums);
        assert_eq!(loaded.neighbors, config.neighbors);
    }

    #[test]
    fn test_missing_node_section_uses_defaults() {
        let json = r#"{"address": "020000000001", "bind": "127.0.0.1:9000"}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.node, NodeConfig::default());
        assert!(config.neighbors.is_empty());
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut config = Config::default();
        assert!(config.set("address", "not-a-mac").is_err());
        assert!(config.set("default_ttl", "300").is_err());
        assert!(config.set("listen_port", "1").is_err());
    }

    #[test]
    fn test_neighbor_add_update_remove() {
        let mut config = Config::default();
        let peer: MacAddress = "020000000002".parse().unwrap();

        config.add_neighbor(peer, "127.0.0.1:1".parse().unwrap());
        config.add_neighbor(peer, "127.0.0.1:2".parse().unwrap());
        assert_eq!(config.neighbors.len(), 1);
        assert_eq!(config.neighbors[0].socket.port(), 2);

        assert!(config.remove_neighbor(&peer));
        assert!(!config.remove_neighbor(&peer));
    }

    #[test]
    fn test_list_includes_neighbor_count() {
        let config = Config::default();
        let list = config.list();
        assert_eq!(list.len(), 9);
        assert_eq!(list.last().map(|(k, v)| (k.as_str(), v.as_str())), Some(("neighbors", "0")));
    }
}
