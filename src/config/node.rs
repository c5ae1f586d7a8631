//! Node configuration (`node.*`).
//!
//! Listener addresses, timeouts and framing limits. Every field is optional
//! so that layered config files only override what they set; accessors
//! supply the defaults.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Default bind address for both listeners.
const DEFAULT_BIND_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// Default gateway listener port.
pub const DEFAULT_GATEWAY_PORT: u16 = 43780;

/// Default peer listener port.
pub const DEFAULT_PEER_PORT: u16 = 43781;

const DEFAULT_HANDSHAKE_TIMEOUT_MS: u64 = 1000;
const DEFAULT_QUERY_TIMEOUT_MS: u64 = 2000;
const DEFAULT_TICK_INTERVAL_SECS: u64 = 5;

/// Default largest frame read in one go.
const DEFAULT_MAX_FRAME_SIZE: usize = 4096;

/// Listener ports (`node.ports.*`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PortsConfig {
    /// Gateway listener port (`node.ports.gateway`). Defaults to 43780.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<u16>,

    /// Peer listener port (`node.ports.peer`). Defaults to 43781.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer: Option<u16>,
}

impl PortsConfig {
    pub fn gateway(&self) -> u16 {
        self.gateway.unwrap_or(DEFAULT_GATEWAY_PORT)
    }

    pub fn peer(&self) -> u16 {
        self.peer.unwrap_or(DEFAULT_PEER_PORT)
    }

    fn merge(&mut self, other: PortsConfig) {
        if other.gateway.is_some() {
            self.gateway = other.gateway;
        }
        if other.peer.is_some() {
            self.peer = other.peer;
        }
    }
}

/// Node configuration (`node.*`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    /// Address both listeners bind to (`node.bind_addr`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_addr: Option<IpAddr>,

    /// Listener ports (`node.ports`).
    #[serde(default)]
    pub ports: PortsConfig,

    /// Handshake read timeout in milliseconds (`node.handshake_timeout_ms`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handshake_timeout_ms: Option<u64>,

    /// How long DATA waits on a mesh query (`node.query_timeout_ms`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_timeout_ms: Option<u64>,

    /// Processor tick period in seconds (`node.tick_interval_secs`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tick_interval_secs: Option<u64>,

    /// Largest frame read per socket read (`node.max_frame_size`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_frame_size: Option<usize>,

    /// Dial known peers that have no link on each tick (`node.auto_link`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_link: Option<bool>,
}

impl NodeConfig {
    pub fn bind_addr(&self) -> IpAddr {
        self.bind_addr.unwrap_or(DEFAULT_BIND_ADDR)
    }

    /// Socket address of the gateway listener.
    pub fn gateway_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr(), self.ports.gateway())
    }

    /// Socket address of the peer listener.
    pub fn peer_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr(), self.ports.peer())
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(
            self.handshake_timeout_ms
                .unwrap_or(DEFAULT_HANDSHAKE_TIMEOUT_MS),
        )
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms.unwrap_or(DEFAULT_QUERY_TIMEOUT_MS))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(
            self.tick_interval_secs
                .unwrap_or(DEFAULT_TICK_INTERVAL_SECS)
                .max(1),
        )
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size.unwrap_or(DEFAULT_MAX_FRAME_SIZE).max(1)
    }

    pub fn auto_link(&self) -> bool {
        self.auto_link.unwrap_or(true)
    }

    pub(super) fn merge(&mut self, other: NodeConfig) {
        if other.bind_addr.is_some() {
            self.bind_addr = other.bind_addr;
        }
        self.ports.merge(other.ports);
        if other.handshake_timeout_ms.is_some() {
            self.handshake_timeout_ms = other.handshake_timeout_ms;
        }
        if other.query_timeout_ms.is_some() {
            self.query_timeout_ms = other.query_timeout_ms;
        }
        if other.tick_interval_secs.is_some() {
            self.tick_interval_secs = other.tick_interval_secs;
        }
        if other.max_frame_size.is_some() {
            self.max_frame_size = other.max_frame_size;
        }
        if other.auto_link.is_some() {
            self.auto_link = other.auto_link;
        }
    }
}
