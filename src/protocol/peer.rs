//! Peer-facing messages exchanged between federated daemons.

use super::address::{Address, Credential, PortPair, ADDRESS_SIZE};
use super::reader::WireReader;
use super::ProtocolError;
use std::fmt;
use std::net::Ipv4Addr;

/// Peer command identifiers (first byte of every peer message).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PeerCommand {
    /// Sender now owns an address.
    Registered = 0x00,
    /// Sender no longer owns an address (or does not know it).
    Unregistered = 0x01,
    /// Data for a gateway owned by the receiver.
    Route = 0x02,
    /// Credential table replication.
    Resolve = 0x03,
    /// Credential table removal.
    Unresolve = 0x04,
    /// Mesh membership announcement.
    Link = 0x05,
    /// Mesh membership removal.
    Unlink = 0x06,
    /// Orderly link close.
    ClosePeer = 0x07,
    /// Ownership query.
    Query = 0x08,
}

impl PeerCommand {
    /// Try to convert from a byte.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(PeerCommand::Registered),
            0x01 => Some(PeerCommand::Unregistered),
            0x02 => Some(PeerCommand::Route),
            0x03 => Some(PeerCommand::Resolve),
            0x04 => Some(PeerCommand::Unresolve),
            0x05 => Some(PeerCommand::Link),
            0x06 => Some(PeerCommand::Unlink),
            0x07 => Some(PeerCommand::ClosePeer),
            0x08 => Some(PeerCommand::Query),
            _ => None,
        }
    }

    /// Convert to a byte.
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for PeerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PeerCommand::Registered => "REGISTERED",
            PeerCommand::Unregistered => "UNREGISTERED",
            PeerCommand::Route => "ROUTE",
            PeerCommand::Resolve => "RESOLVE",
            PeerCommand::Unresolve => "UNRESOLVE",
            PeerCommand::Link => "LINK",
            PeerCommand::Unlink => "UNLINK",
            PeerCommand::ClosePeer => "CLOSEPEER",
            PeerCommand::Query => "QUERY",
        };
        write!(f, "{}", name)
    }
}

/// A decoded peer message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PeerMessage {
    /// `[0x00][address:4]`
    Registered(Address),
    /// `[0x01][address:4]`
    Unregistered(Address),
    /// `[0x02][target:4][trailing...]`
    ///
    /// The trailing bytes are opaque and may be empty. The receiver
    /// delivers them to the target as `[DATA][trailing]`. Daemons put the
    /// sending gateway's address first, see [`PeerMessage::route`].
    Route { target: Address, trailing: Vec<u8> },
    /// `[0x03][address:4][credential:20]`
    Resolve {
        address: Address,
        credential: Credential,
    },
    /// `[0x04][address:4]`
    Unresolve(Address),
    /// `[0x05][ipv4:4][ports:4]`
    Link { ip: Ipv4Addr, ports: PortPair },
    /// `[0x06][ipv4:4]` (a trailing port pair is accepted and ignored)
    Unlink(Ipv4Addr),
    /// `[0x07]`
    ClosePeer,
    /// `[0x08][address:4]`
    Query(Address),
}

impl PeerMessage {
    /// ROUTE carrying `[source][payload]` to `target`.
    pub fn route(target: Address, source: Address, payload: &[u8]) -> Self {
        let mut trailing = Vec::with_capacity(ADDRESS_SIZE + payload.len());
        trailing.extend_from_slice(&source.to_bytes());
        trailing.extend_from_slice(payload);
        PeerMessage::Route { target, trailing }
    }

    /// The command byte for this message.
    pub fn command(&self) -> PeerCommand {
        match self {
            PeerMessage::Registered(_) => PeerCommand::Registered,
            PeerMessage::Unregistered(_) => PeerCommand::Unregistered,
            PeerMessage::Route { .. } => PeerCommand::Route,
            PeerMessage::Resolve { .. } => PeerCommand::Resolve,
            PeerMessage::Unresolve(_) => PeerCommand::Unresolve,
            PeerMessage::Link { .. } => PeerCommand::Link,
            PeerMessage::Unlink(_) => PeerCommand::Unlink,
            PeerMessage::ClosePeer => PeerCommand::ClosePeer,
            PeerMessage::Query(_) => PeerCommand::Query,
        }
    }

    /// Encode as wire format (includes command byte).
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(9);
        buf.push(self.command().to_byte());
        match self {
            PeerMessage::Registered(address)
            | PeerMessage::Unregistered(address)
            | PeerMessage::Unresolve(address)
            | PeerMessage::Query(address) => {
                buf.extend_from_slice(&address.to_bytes());
            }
            PeerMessage::Route { target, trailing } => {
                buf.reserve(trailing.len());
                buf.extend_from_slice(&target.to_bytes());
                buf.extend_from_slice(trailing);
            }
            PeerMessage::Resolve {
                address,
                credential,
            } => {
                buf.extend_from_slice(&address.to_bytes());
                buf.extend_from_slice(credential.as_bytes());
            }
            PeerMessage::Link { ip, ports } => {
                buf.extend_from_slice(&ip.octets());
                buf.extend_from_slice(&ports.to_bytes());
            }
            PeerMessage::Unlink(ip) => {
                buf.extend_from_slice(&ip.octets());
            }
            PeerMessage::ClosePeer => {}
        }
        buf
    }

    /// Decode a message from one received frame.
    pub fn decode(raw: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = WireReader::new(raw);
        let code = reader.read_u8().map_err(|_| ProtocolError::EmptyMessage)?;
        let command = PeerCommand::from_byte(code)
            .ok_or(ProtocolError::UnknownCommand { role: "peer", code })?;

        let msg = match command {
            PeerCommand::Registered => PeerMessage::Registered(reader.read_address()?),
            PeerCommand::Unregistered => PeerMessage::Unregistered(reader.read_address()?),
            PeerCommand::Route => PeerMessage::Route {
                target: reader.read_address()?,
                trailing: reader.rest().to_vec(),
            },
            PeerCommand::Resolve => {
                let address = reader.read_address()?;
                let credential = reader.read_credential()?;
                PeerMessage::Resolve {
                    address,
                    credential,
                }
            }
            PeerCommand::Unresolve => PeerMessage::Unresolve(reader.read_address()?),
            PeerCommand::Link => {
                let ip = reader.read_ipv4()?;
                let ports = reader.read_port_pair()?;
                PeerMessage::Link { ip, ports }
            }
            PeerCommand::Unlink => PeerMessage::Unlink(reader.read_ipv4()?),
            PeerCommand::ClosePeer => PeerMessage::ClosePeer,
            PeerCommand::Query => PeerMessage::Query(reader.read_address()?),
        };
        Ok(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_layout() {
        let wire = PeerMessage::Registered(Address::new(1, 2)).encode();
        assert_eq!(wire, vec![0x00, 0x00, 0x01, 0x00, 0x02]);
    }

    #[test]
    fn test_route_layout() {
        let msg = PeerMessage::route(Address::new(3, 4), Address::new(1, 2), b"abc");
        let wire = msg.encode();
        assert_eq!(&wire[..9], &[0x02, 0, 3, 0, 4, 0, 1, 0, 2]);
        assert_eq!(&wire[9..], b"abc");
        assert_eq!(PeerMessage::decode(&wire).unwrap(), msg);
    }

    #[test]
    fn test_route_short_trailing() {
        assert_eq!(
            PeerMessage::decode(&[0x02, 0, 3, 0, 4, b'h', b'i']).unwrap(),
            PeerMessage::Route {
                target: Address::new(3, 4),
                trailing: b"hi".to_vec(),
            }
        );
        assert_eq!(
            PeerMessage::decode(&[0x02, 0, 3, 0, 4]).unwrap(),
            PeerMessage::Route {
                target: Address::new(3, 4),
                trailing: Vec::new(),
            }
        );
        assert_eq!(
            PeerMessage::decode(&[0x02, 0, 3, 0]),
            Err(ProtocolError::TruncatedMessage { expected: 5, got: 4 })
        );
    }

    #[test]
    fn test_link_layout() {
        let msg = PeerMessage::Link {
            ip: Ipv4Addr::new(192, 168, 1, 20),
            ports: PortPair::new(43780, 43781),
        };
        let wire = msg.encode();
        assert_eq!(wire, vec![0x05, 192, 168, 1, 20, 0xAB, 0x04, 0xAB, 0x05]);
        assert_eq!(PeerMessage::decode(&wire).unwrap(), msg);
    }

    #[test]
    fn test_unlink_tolerates_trailing_ports() {
        let wire = [0x06, 10, 1, 2, 3, 0xAB, 0x04, 0xAB, 0x05];
        assert_eq!(
            PeerMessage::decode(&wire).unwrap(),
            PeerMessage::Unlink(Ipv4Addr::new(10, 1, 2, 3))
        );
    }

    #[test]
    fn test_resolve_requires_full_credential() {
        let mut wire = vec![0x03, 0, 1, 0, 2];
        wire.extend_from_slice(&[0x41; 19]);
        assert_eq!(
            PeerMessage::decode(&wire),
            Err(ProtocolError::MalformedCredential { expected: 20, got: 19 })
        );
    }

    #[test]
    fn test_all_messages_decode() {
        let credential = Credential::padded(b"KEY").unwrap();
        for msg in [
            PeerMessage::Registered(Address::new(7, 8)),
            PeerMessage::Unregistered(Address::new(7, 8)),
            PeerMessage::Resolve {
                address: Address::new(7, 8),
                credential,
            },
            PeerMessage::Unresolve(Address::new(7, 8)),
            PeerMessage::Unlink(Ipv4Addr::LOCALHOST),
            PeerMessage::ClosePeer,
            PeerMessage::Query(Address::new(9, 9)),
        ] {
            assert_eq!(PeerMessage::decode(&msg.encode()).unwrap(), msg);
        }
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            PeerMessage::decode(&[0x42]),
            Err(ProtocolError::UnknownCommand { role: "peer", code: 0x42 })
        );
        assert_eq!(PeerMessage::decode(&[]), Err(ProtocolError::EmptyMessage));
    }
}
