//! fedroute Configuration System
//!
//! Loads configuration from YAML files with a cascading priority system:
//! 1. `./fedroute.yaml` (current directory - highest priority)
//! 2. `~/.config/fedroute/fedroute.yaml` (user config directory)
//! 3. `/etc/fedroute/fedroute.yaml` (system - lowest priority)
//!
//! Values from higher priority files override those from lower priority files.
//!
//! # YAML Structure
//!
//! ```yaml
//! node:
//!   bind_addr: "0.0.0.0"
//!   ports:
//!     gateway: 43780
//!     peer: 43781
//!   handshake_timeout_ms: 1000
//! seeds:
//!   credentials: "credentials.bin"
//!   peers: "peers.bin"
//! ```

mod node;
mod seed;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use node::{DEFAULT_GATEWAY_PORT, DEFAULT_PEER_PORT, NodeConfig, PortsConfig};
pub use seed::SeedConfig;

/// Default config filename.
const CONFIG_FILENAME: &str = "fedroute.yaml";

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseYaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Node configuration (`node.*`).
    #[serde(default)]
    pub node: NodeConfig,

    /// Seed file locations (`seeds.*`).
    #[serde(default)]
    pub seeds: SeedConfig,
}

impl Config {
    /// Create a new empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `fedroute.yaml` found on [`Config::search_paths`].
    ///
    /// Also returns the files that were read, for the startup log.
    pub fn load() -> Result<(Self, Vec<PathBuf>), ConfigError> {
        Self::load_from_paths(&Self::search_paths())
    }

    /// Merge the files in `paths` that exist, later files winning.
    pub fn load_from_paths(paths: &[PathBuf]) -> Result<(Self, Vec<PathBuf>), ConfigError> {
        let mut config = Config::default();
        let mut loaded = Vec::new();

        for path in paths.iter().filter(|p| p.exists()) {
            config.merge(Self::load_file(path)?);
            loaded.push(path.clone());
        }

        Ok((config, loaded))
    }

    /// Parse one YAML file. Unknown keys under `node` or `seeds` are errors.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;

        serde_yaml::from_str(&contents).map_err(|source| ConfigError::ParseYaml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `/etc/fedroute`, then the user config dir, then the working
    /// directory.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![Path::new("/etc/fedroute").join(CONFIG_FILENAME)];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("fedroute").join(CONFIG_FILENAME));
        }
        paths.push(PathBuf::from(CONFIG_FILENAME));
        paths
    }

    /// Merge another configuration into this one.
    ///
    /// Values from `other` override values in `self` when present.
    pub fn merge(&mut self, other: Config) {
        self.node.merge(other.node);
        self.seeds.merge(other.seeds);
    }

    /// Serialize this configuration to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::new();
        assert_eq!(config.node.gateway_addr().port(), 43780);
        assert_eq!(config.node.peer_addr().port(), 43781);
        assert_eq!(config.node.bind_addr(), IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.node.handshake_timeout(), Duration::from_secs(1));
        assert_eq!(config.node.query_timeout(), Duration::from_secs(2));
        assert_eq!(config.node.tick_interval(), Duration::from_secs(5));
        assert_eq!(config.node.max_frame_size(), 4096);
        assert!(config.node.auto_link());
        assert_eq!(config.seeds.credentials(), Path::new("credentials.bin"));
        assert!(!config.seeds.required());
    }

    #[test]
    fn test_parse_yaml_empty() {
        let config: Config = serde_yaml::from_str("").unwrap();
        assert!(config.node.bind_addr.is_none());
        assert!(config.seeds.peers.is_none());
    }

    #[test]
    fn test_parse_yaml_full() {
        let yaml = r#"
node:
  bind_addr: "127.0.0.1"
  ports:
    gateway: 5000
    peer: 5001
  handshake_timeout_ms: 250
  query_timeout_ms: 100
  tick_interval_secs: 1
  max_frame_size: 8192
  auto_link: false
seeds:
  credentials: "/var/lib/fedroute/credentials.bin"
  peers: "/var/lib/fedroute/peers.bin"
  required: true
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.node.gateway_addr(), "127.0.0.1:5000".parse().unwrap());
        assert_eq!(config.node.peer_addr(), "127.0.0.1:5001".parse().unwrap());
        assert_eq!(config.node.handshake_timeout(), Duration::from_millis(250));
        assert_eq!(config.node.query_timeout(), Duration::from_millis(100));
        assert_eq!(config.node.max_frame_size(), 8192);
        assert!(!config.node.auto_link());
        assert_eq!(
            config.seeds.credentials(),
            Path::new("/var/lib/fedroute/credentials.bin")
        );
        assert!(config.seeds.required());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = r#"
node:
  listen_backlog: 128
"#;
        assert!(serde_yaml::from_str::<Config>(yaml).is_err());
    }

    #[test]
    fn test_merge_configs() {
        let mut base = Config::new();
        base.node.ports.gateway = Some(1000);
        base.node.ports.peer = Some(1001);
        base.seeds.required = Some(true);

        let mut override_config = Config::new();
        override_config.node.ports.gateway = Some(2000);

        base.merge(override_config);
        assert_eq!(base.node.ports.gateway(), 2000);
        assert_eq!(base.node.ports.peer(), 1001);
        assert!(base.seeds.required());
    }

    #[test]
    fn test_load_from_paths_merges() {
        let temp_dir = TempDir::new().unwrap();
        let low_priority = temp_dir.path().join("low.yaml");
        let high_priority = temp_dir.path().join("high.yaml");

        fs::write(
            &low_priority,
            r#"
node:
  ports:
    gateway: 1000
    peer: 1001
"#,
        )
        .unwrap();
        fs::write(
            &high_priority,
            r#"
node:
  ports:
    peer: 2001
"#,
        )
        .unwrap();

        let paths = vec![low_priority, high_priority];
        let (config, loaded) = Config::load_from_paths(&paths).unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(config.node.ports.gateway(), 1000);
        assert_eq!(config.node.ports.peer(), 2001);
    }

    #[test]
    fn test_load_skips_missing_files() {
        let temp_dir = TempDir::new().unwrap();
        let existing = temp_dir.path().join("exists.yaml");
        let missing = temp_dir.path().join("missing.yaml");
        fs::write(&existing, "seeds:\n  required: true\n").unwrap();

        let paths = vec![missing, existing.clone()];
        let (config, loaded) = Config::load_from_paths(&paths).unwrap();

        assert_eq!(loaded, vec![existing]);
        assert!(config.seeds.required());
    }

    #[test]
    fn test_load_file_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.yaml");
        fs::write(&path, "node: [not, a, map]").unwrap();

        assert!(matches!(
            Config::load_file(&path),
            Err(ConfigError::ParseYaml { .. })
        ));
    }

    #[test]
    fn test_search_paths_includes_expected() {
        let paths = Config::search_paths();

        assert!(paths.iter().any(|p| p.ends_with("fedroute.yaml")));
        assert!(paths
            .iter()
            .any(|p| p.starts_with("/etc/fedroute") && p.ends_with("fedroute.yaml")));
    }

    #[test]
    fn test_to_yaml_omits_unset() {
        let mut config = Config::new();
        config.node.ports.gateway = Some(6000);

        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("gateway: 6000"));
        assert!(!yaml.contains("bind_addr"));
        assert!(!yaml.contains("required"));
    }
}
