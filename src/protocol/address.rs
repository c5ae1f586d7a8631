//! Fixed-size wire values: addresses, credentials, port pairs.

use super::ProtocolError;
use std::fmt;

/// Encoded size of an [`Address`].
pub const ADDRESS_SIZE: usize = 4;

/// Encoded size of a [`Credential`].
pub const CREDENTIAL_SIZE: usize = 20;

/// Encoded size of a [`PortPair`].
pub const PORT_PAIR_SIZE: usize = 4;

/// Hierarchical routable address: a domain and a node within it.
///
/// Wire format: `[domain:2 BE][node:2 BE]`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address {
    pub domain: u16,
    pub node: u16,
}

impl Address {
    pub const fn new(domain: u16, node: u16) -> Self {
        Self { domain, node }
    }

    pub fn from_bytes(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self {
            domain: u16::from_be_bytes([bytes[0], bytes[1]]),
            node: u16::from_be_bytes([bytes[2], bytes[3]]),
        }
    }

    pub fn to_bytes(&self) -> [u8; ADDRESS_SIZE] {
        let d = self.domain.to_be_bytes();
        let n = self.node.to_be_bytes();
        [d[0], d[1], n[0], n[1]]
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({}-{})", self.domain, self.node)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.domain, self.node)
    }
}

/// 20-byte opaque registration token bound to one [`Address`].
///
/// Compared byte for byte; it is not derived from any secret.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Credential([u8; CREDENTIAL_SIZE]);

impl Credential {
    pub fn from_bytes(bytes: [u8; CREDENTIAL_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice that must be exactly 20 bytes.
    pub fn from_slice(slice: &[u8]) -> Result<Self, ProtocolError> {
        let bytes: [u8; CREDENTIAL_SIZE] =
            slice
                .try_into()
                .map_err(|_| ProtocolError::MalformedCredential {
                    expected: CREDENTIAL_SIZE,
                    got: slice.len(),
                })?;
        Ok(Self(bytes))
    }

    /// Create from an operator-supplied token, zero-padding short input.
    ///
    /// Input longer than 20 bytes is rejected.
    pub fn padded(token: &[u8]) -> Result<Self, ProtocolError> {
        if token.len() > CREDENTIAL_SIZE {
            return Err(ProtocolError::MalformedCredential {
                expected: CREDENTIAL_SIZE,
                got: token.len(),
            });
        }
        let mut bytes = [0u8; CREDENTIAL_SIZE];
        bytes[..token.len()].copy_from_slice(token);
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; CREDENTIAL_SIZE] {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(")?;
        for b in &self.0[..4] {
            write!(f, "{:02x}", b)?;
        }
        write!(f, "..)")
    }
}

/// The two listening ports of a daemon host.
///
/// Wire format: `[gateway:2 BE][peer:2 BE]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PortPair {
    /// Port local gateways connect to.
    pub gateway: u16,
    /// Port federation peers connect to.
    pub peer: u16,
}

impl PortPair {
    pub const fn new(gateway: u16, peer: u16) -> Self {
        Self { gateway, peer }
    }

    pub fn from_bytes(bytes: [u8; PORT_PAIR_SIZE]) -> Self {
        Self {
            gateway: u16::from_be_bytes([bytes[0], bytes[1]]),
            peer: u16::from_be_bytes([bytes[2], bytes[3]]),
        }
    }

    pub fn to_bytes(&self) -> [u8; PORT_PAIR_SIZE] {
        let g = self.gateway.to_be_bytes();
        let p = self.peer.to_be_bytes();
        [g[0], g[1], p[0], p[1]]
    }
}

impl fmt::Display for PortPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.gateway, self.peer)
    }
}
