//! Wire Protocol
//!
//! Fixed-layout binary messages for both connection roles. Every message is
//! a single command byte followed by a command-specific payload. The only
//! variable-length field is the trailing payload of DATA and ROUTE, which
//! runs to the end of the received frame.
//!
//! ## Gateway role (local clients)
//!
//! | Code | Request    | Payload                          |
//! |------|------------|----------------------------------|
//! | 0x01 | REGISTER   | address:4, credential:20         |
//! | 0x02 | DATA       | target:4, payload                |
//! | 0x03 | STATUS     | none                             |
//! | 0x04 | CLOSE      | none                             |
//!
//! Daemon replies are STATE frames `[0x00][state][reason?]`, relayed DATA
//! frames, or a bare CLOSE.
//!
//! ## Peer role (federated daemons)
//!
//! See [`PeerMessage`] for the nine peer commands.
//!
//! All multi-byte integers are big-endian.

mod address;
mod error;
mod gateway;
mod peer;
mod reader;

pub use address::{Address, Credential, PortPair, ADDRESS_SIZE, CREDENTIAL_SIZE, PORT_PAIR_SIZE};
pub use error::ProtocolError;
pub use gateway::{FailureReason, GatewayCommand, GatewayReply, GatewayRequest, StateCode};
pub use peer::{PeerCommand, PeerMessage};
pub use reader::{WireReader, IPV4_SIZE};

use std::fmt;

/// A protocol version triple as advertised in greetings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProtocolVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl ProtocolVersion {
    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Encode as `[major][minor][patch]`.
    pub fn to_bytes(&self) -> [u8; 3] {
        [self.major, self.minor, self.patch]
    }

    pub fn from_bytes(bytes: [u8; 3]) -> Self {
        Self::new(bytes[0], bytes[1], bytes[2])
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
