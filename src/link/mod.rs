//! Live Connections
//!
//! Two connection roles share one transport model:
//! 1. **GatewayLink** - a local client that claims an address
//! 2. **PeerLink** - a federation connection to another daemon
//!
//! Each link is owned by its connection task. Everything else reaches it
//! through a cloneable [`LinkHandle`], which enqueues outbound frames on the
//! task's channel; the task is the only writer to the socket.

mod gateway;
mod peer;

pub use gateway::{GatewayLink, GatewayState};
pub use peer::{PeerLink, PeerState};

use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier of a gateway connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GatewayId(u64);

impl GatewayId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for GatewayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gateway:{}", self.0)
    }
}

/// Identifier of a peer link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeerId(u64);

impl PeerId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer:{}", self.0)
    }
}

/// Which side opened the connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkDirection {
    /// Accepted on one of our listeners.
    Inbound,
    /// Dialed by us.
    Outbound,
}

impl fmt::Display for LinkDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LinkDirection::Inbound => "inbound",
            LinkDirection::Outbound => "outbound",
        };
        write!(f, "{}", s)
    }
}

// ============================================================================
// Outbound Channel
// ============================================================================

/// Work item for a connection task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outbound {
    /// Write one frame to the socket.
    Frame(Vec<u8>),
    /// Run the engine's forced-teardown entry point for this link.
    Kill,
    /// Stop the task and release the socket.
    Close,
}

/// The link's task has exited; nothing more can be sent.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("link closed")]
pub struct LinkClosed;

/// Receiving end, drained by the connection task.
pub type LinkRx = mpsc::UnboundedReceiver<Outbound>;

/// Cloneable sending end of a link's outbound channel.
#[derive(Clone, Debug)]
pub struct LinkHandle {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl LinkHandle {
    /// Create a handle and the receiver its connection task will drain.
    pub fn channel() -> (Self, LinkRx) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue a frame for the socket.
    pub fn send(&self, frame: Vec<u8>) -> Result<(), LinkClosed> {
        self.tx.send(Outbound::Frame(frame)).map_err(|_| LinkClosed)
    }

    /// Ask the connection task to run forced teardown.
    pub fn kill(&self) -> Result<(), LinkClosed> {
        self.tx.send(Outbound::Kill).map_err(|_| LinkClosed)
    }

    /// Ask the connection task to stop after the frames queued so far.
    pub fn close(&self) -> Result<(), LinkClosed> {
        self.tx.send(Outbound::Close).map_err(|_| LinkClosed)
    }

    /// Check if the connection task has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_preserves_order() {
        let (handle, mut rx) = LinkHandle::channel();
        handle.send(vec![1]).unwrap();
        handle.kill().unwrap();
        handle.close().unwrap();

        assert_eq!(rx.try_recv().unwrap(), Outbound::Frame(vec![1]));
        assert_eq!(rx.try_recv().unwrap(), Outbound::Kill);
        assert_eq!(rx.try_recv().unwrap(), Outbound::Close);
    }

    #[test]
    fn test_send_after_task_exit() {
        let (handle, rx) = LinkHandle::channel();
        drop(rx);
        assert!(handle.is_closed());
        assert_eq!(handle.send(vec![0]), Err(LinkClosed));
    }

    #[test]
    fn test_id_display() {
        assert_eq!(GatewayId::new(3).to_string(), "gateway:3");
        assert_eq!(PeerId::new(9).to_string(), "peer:9");
    }
}
