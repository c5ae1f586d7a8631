//! Transport Layer
//!
//! TCP listeners and dialing for the two connection roles. The transport
//! only hands out connected streams; framing and the handshake happen in
//! the connection tasks.

pub mod tcp;

pub use tcp::{TcpTransport, connect};

use std::fmt;
use std::net::SocketAddr;
use thiserror::Error;

/// Which listener a connection arrived on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Local clients claiming addresses.
    Gateway,
    /// Other daemons in the mesh.
    Peer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Gateway => "gateway",
            Role::Peer => "peer",
        };
        write!(f, "{}", s)
    }
}

/// Errors from the transport layer.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to bind {role} listener on {addr}: {source}")]
    Bind {
        role: Role,
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("connect to {0} timed out")]
    Timeout(SocketAddr),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
