//! fedroute Node Entity
//!
//! Top-level structure representing a running daemon. The Node owns the
//! listeners, the background processor, and the shared [`Router`] that
//! every connection task works through.

mod connection;
mod lifecycle;
mod processor;
#[cfg(test)]
mod tests;

use crate::config::{Config, ConfigError};
use crate::engine::{EngineRegistry, v1::V1Engine};
use crate::handshake::{HandshakeError, NegotiatedVersion};
use crate::link::PeerId;
use crate::router::Router;
use crate::seed::SeedError;
use crate::transport::TransportError;
use connection::Context;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Exit code when no protocol engine is registered.
pub const EXIT_NO_ENGINES: i32 = 1;

/// Exit code for any other startup or runtime failure.
pub const EXIT_FAILURE: i32 = 2;

/// Errors related to node operations.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("node not started")]
    NotStarted,

    #[error("node already started")]
    AlreadyStarted,

    #[error("no protocol engines registered")]
    NoEngines,

    #[error("no protocol engine for {0}")]
    NoEngineForVersion(NegotiatedVersion),

    #[error("peer {0} is not in the mesh table")]
    UnknownPeer(Ipv4Addr),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("seed error: {0}")]
    Seed(#[from] SeedError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("handshake error: {0}")]
    Handshake(#[from] HandshakeError),
}

impl NodeError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            NodeError::NoEngines => EXIT_NO_ENGINES,
            _ => EXIT_FAILURE,
        }
    }
}

/// Node operational state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeState {
    /// Created but not started.
    Created,
    /// Starting up (loading seeds, binding listeners).
    Starting,
    /// Fully operational.
    Running,
    /// Shutting down.
    Stopping,
    /// Stopped.
    Stopped,
}

impl NodeState {
    /// Check if node is operational.
    pub fn is_operational(&self) -> bool {
        matches!(self, NodeState::Running)
    }

    /// Check if node can be started.
    pub fn can_start(&self) -> bool {
        matches!(self, NodeState::Created | NodeState::Stopped)
    }

    /// Check if node can be stopped.
    pub fn can_stop(&self) -> bool {
        matches!(self, NodeState::Running)
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeState::Created => "created",
            NodeState::Starting => "starting",
            NodeState::Running => "running",
            NodeState::Stopping => "stopping",
            NodeState::Stopped => "stopped",
        };
        write!(f, "{}", s)
    }
}

/// A fedroute daemon instance.
pub struct Node {
    config: Config,
    state: NodeState,
    router: Router,
    engines: Arc<EngineRegistry>,

    // === Runtime (present while running) ===
    /// Shared with every task spawned by the node.
    context: Option<Context>,
    /// Liveness flag; cleared to stop accept loops and the processor.
    alive: Option<watch::Sender<bool>>,
    /// Resolves once every connection task has dropped its context.
    drain_rx: Option<mpsc::Receiver<()>>,
    accept_tasks: Vec<JoinHandle<()>>,
    processor: Option<JoinHandle<()>>,
    gateway_addr: Option<SocketAddr>,
    peer_addr: Option<SocketAddr>,
}

impl Node {
    /// Create a node running the built-in protocol engines.
    pub fn new(config: Config) -> Self {
        let router = Router::new();
        let mut engines = EngineRegistry::new();
        engines.register(Arc::new(
            V1Engine::new(router.clone()).with_query_timeout(config.node.query_timeout()),
        ));
        Self::with_engines(config, router, engines)
    }

    /// Create a node with an explicit engine set.
    ///
    /// The engines must have been built over `router`.
    pub fn with_engines(config: Config, router: Router, engines: EngineRegistry) -> Self {
        Self {
            config,
            state: NodeState::Created,
            router,
            engines: Arc::new(engines),
            context: None,
            alive: None,
            drain_rx: None,
            accept_tasks: Vec::new(),
            processor: None,
            gateway_addr: None,
            peer_addr: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn engines(&self) -> &EngineRegistry {
        &self.engines
    }

    /// Bound gateway listener address (only valid while running).
    pub fn gateway_addr(&self) -> Option<SocketAddr> {
        self.gateway_addr
    }

    /// Bound peer listener address (only valid while running).
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// Reuse an open link to `ip` or dial its peer port from the mesh table.
    pub async fn link(&self, ip: Ipv4Addr) -> Result<PeerId, NodeError> {
        let context = self.context.as_ref().ok_or(NodeError::NotStarted)?;
        connection::link(context, ip).await
    }

    /// Close a peer link.
    pub fn unlink(&self, peer: PeerId) -> bool {
        self.router.unlink(peer)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("state", &self.state)
            .field("gateway_addr", &self.gateway_addr)
            .field("peer_addr", &self.peer_addr)
            .field("engines", &self.engines)
            .finish()
    }
}
