//! Gateway connection state.

use super::{GatewayId, LinkHandle};
use crate::handshake::NegotiatedVersion;
use crate::protocol::{Address, StateCode};
use std::fmt;
use std::net::SocketAddr;
use tracing::debug;

/// Gateway connection lifecycle.
///
/// ```text
/// Unauthenticated -> Connected -> Registered -> Closed
///                        \______________________/
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GatewayState {
    /// Handshake done, greeting not yet sent.
    Unauthenticated,
    /// Greeted, no address claimed.
    Connected,
    /// Holds an address.
    Registered,
    /// Terminal.
    Closed,
}

impl GatewayState {
    /// The code reported in a STATUS reply.
    pub fn state_code(&self) -> StateCode {
        match self {
            GatewayState::Unauthenticated => StateCode::Failure,
            GatewayState::Connected => StateCode::Connected,
            GatewayState::Registered => StateCode::Assigned,
            GatewayState::Closed => StateCode::Closed,
        }
    }
}

impl fmt::Display for GatewayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GatewayState::Unauthenticated => "unauthenticated",
            GatewayState::Connected => "connected",
            GatewayState::Registered => "registered",
            GatewayState::Closed => "closed",
        };
        write!(f, "{}", s)
    }
}

/// One live local client connection.
#[derive(Debug)]
pub struct GatewayLink {
    id: GatewayId,
    remote: SocketAddr,
    version: NegotiatedVersion,
    state: GatewayState,
    /// Claimed address, present only while Registered.
    address: Option<Address>,
    handle: LinkHandle,
}

impl GatewayLink {
    pub fn new(
        id: GatewayId,
        remote: SocketAddr,
        version: NegotiatedVersion,
        handle: LinkHandle,
    ) -> Self {
        Self {
            id,
            remote,
            version,
            state: GatewayState::Unauthenticated,
            address: None,
            handle,
        }
    }

    pub fn id(&self) -> GatewayId {
        self.id
    }

    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    pub fn version(&self) -> NegotiatedVersion {
        self.version
    }

    pub fn state(&self) -> GatewayState {
        self.state
    }

    pub fn handle(&self) -> &LinkHandle {
        &self.handle
    }

    /// The claimed address, if Registered.
    pub fn address(&self) -> Option<Address> {
        self.address
    }

    /// Move from Unauthenticated to Connected.
    pub fn mark_connected(&mut self) {
        self.state = GatewayState::Connected;
    }

    /// Record a successful registration.
    pub fn mark_registered(&mut self, address: Address) {
        self.address = Some(address);
        self.state = GatewayState::Registered;
    }

    /// Enter Closed, returning the address that was held, if any.
    ///
    /// Returns `Some` at most once per link, which is what keeps the
    /// release path from running twice.
    pub fn mark_closed(&mut self) -> Option<Address> {
        self.state = GatewayState::Closed;
        self.address.take()
    }

    /// Queue a frame to this gateway.
    pub fn send(&self, frame: Vec<u8>) {
        if self.handle.send(frame).is_err() {
            debug!(gateway = %self.id, "Dropped frame for closed gateway link");
        }
    }

    /// Ask the connection task to stop after queued frames are written.
    pub fn close(&self) {
        let _ = self.handle.close();
    }
}
