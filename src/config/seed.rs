//! Seed file locations (`seeds.*`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_CREDENTIALS_PATH: &str = "credentials.bin";
const DEFAULT_PEERS_PATH: &str = "peers.bin";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedConfig {
    /// Credential seed file (`seeds.credentials`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<PathBuf>,

    /// Peer seed file (`seeds.peers`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peers: Option<PathBuf>,

    /// Fail startup when a seed file is missing (`seeds.required`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

impl SeedConfig {
    pub fn credentials(&self) -> &Path {
        self.credentials
            .as_deref()
            .unwrap_or(Path::new(DEFAULT_CREDENTIALS_PATH))
    }

    pub fn peers(&self) -> &Path {
        self.peers
            .as_deref()
            .unwrap_or(Path::new(DEFAULT_PEERS_PATH))
    }

    pub fn required(&self) -> bool {
        self.required.unwrap_or(false)
    }

    pub(super) fn merge(&mut self, other: SeedConfig) {
        if other.credentials.is_some() {
            self.credentials = other.credentials;
        }
        if other.peers.is_some() {
            self.peers = other.peers;
        }
        if other.required.is_some() {
            self.required = other.required;
        }
    }
}
