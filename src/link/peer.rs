//! Peer link state.

use super::{LinkDirection, LinkHandle, PeerId};
use crate::handshake::NegotiatedVersion;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use tracing::debug;

/// Peer link lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeerState {
    /// Accepted, greeting not yet sent.
    Unestablished,
    /// Greetings exchanged; commands flow.
    Established,
}

impl fmt::Display for PeerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PeerState::Unestablished => "unestablished",
            PeerState::Established => "established",
        };
        write!(f, "{}", s)
    }
}

/// One live connection to a federation peer.
#[derive(Debug)]
pub struct PeerLink {
    id: PeerId,
    remote: SocketAddr,
    direction: LinkDirection,
    version: NegotiatedVersion,
    state: PeerState,
    handle: LinkHandle,
}

impl PeerLink {
    /// A link accepted on our peer listener. Starts Unestablished.
    pub fn inbound(
        id: PeerId,
        remote: SocketAddr,
        version: NegotiatedVersion,
        handle: LinkHandle,
    ) -> Self {
        Self {
            id,
            remote,
            direction: LinkDirection::Inbound,
            version,
            state: PeerState::Unestablished,
            handle,
        }
    }

    /// A link we dialed. The remote greeting has already been read during
    /// the handshake, so it starts Established.
    pub fn outbound(
        id: PeerId,
        remote: SocketAddr,
        version: NegotiatedVersion,
        handle: LinkHandle,
    ) -> Self {
        Self {
            id,
            remote,
            direction: LinkDirection::Outbound,
            version,
            state: PeerState::Established,
            handle,
        }
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    /// IPv4 address of the remote, if it has one.
    pub fn remote_ip(&self) -> Option<Ipv4Addr> {
        match self.remote {
            SocketAddr::V4(v4) => Some(*v4.ip()),
            SocketAddr::V6(v6) => v6.ip().to_ipv4_mapped(),
        }
    }

    pub fn direction(&self) -> LinkDirection {
        self.direction
    }

    pub fn version(&self) -> NegotiatedVersion {
        self.version
    }

    pub fn state(&self) -> PeerState {
        self.state
    }

    pub fn handle(&self) -> &LinkHandle {
        &self.handle
    }

    pub fn mark_established(&mut self) {
        self.state = PeerState::Established;
    }

    /// Queue a frame to this peer.
    pub fn send(&self, frame: Vec<u8>) {
        if self.handle.send(frame).is_err() {
            debug!(peer = %self.id, "Dropped frame for closed peer link");
        }
    }

    /// Ask the connection task to stop after queued frames are written.
    pub fn close(&self) {
        let _ = self.handle.close();
    }
}
