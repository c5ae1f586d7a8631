//! Gateway-facing messages: client requests and daemon replies.

use super::address::{Address, Credential};
use super::reader::WireReader;
use super::{ProtocolError, ProtocolVersion};
use std::fmt;

// ============================================================================
// Command, State and Reason Codes
// ============================================================================

/// Gateway command identifiers (first byte of every gateway message).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum GatewayCommand {
    /// Daemon to gateway state report.
    State = 0x00,
    /// Claim an address with a credential.
    Register = 0x01,
    /// Opaque data to (or from) another address.
    Data = 0x02,
    /// Ask for the current connection state.
    Status = 0x03,
    /// Orderly close.
    Close = 0x04,
}

impl GatewayCommand {
    /// Try to convert from a byte.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(GatewayCommand::State),
            0x01 => Some(GatewayCommand::Register),
            0x02 => Some(GatewayCommand::Data),
            0x03 => Some(GatewayCommand::Status),
            0x04 => Some(GatewayCommand::Close),
            _ => None,
        }
    }

    /// Convert to a byte.
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for GatewayCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GatewayCommand::State => "STATE",
            GatewayCommand::Register => "REGISTER",
            GatewayCommand::Data => "DATA",
            GatewayCommand::Status => "STATUS",
            GatewayCommand::Close => "CLOSE",
        };
        write!(f, "{}", name)
    }
}

/// State codes carried in STATE replies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum StateCode {
    Failure = 0x00,
    Connected = 0x01,
    Assigned = 0x02,
    Closed = 0x03,
    Sent = 0x04,
}

impl StateCode {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(StateCode::Failure),
            0x01 => Some(StateCode::Connected),
            0x02 => Some(StateCode::Assigned),
            0x03 => Some(StateCode::Closed),
            0x04 => Some(StateCode::Sent),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Reason byte following a FAILURE state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FailureReason {
    /// Unsupported major version (handshake rejection).
    Version = 0x00,
    /// Credential mismatch or address held by another gateway.
    BadKey = 0x01,
    AlreadyRegistered = 0x02,
    NotRegistered = 0x03,
    NoRoute = 0x04,
}

impl FailureReason {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(FailureReason::Version),
            0x01 => Some(FailureReason::BadKey),
            0x02 => Some(FailureReason::AlreadyRegistered),
            0x03 => Some(FailureReason::NotRegistered),
            0x04 => Some(FailureReason::NoRoute),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureReason::Version => "VERSION",
            FailureReason::BadKey => "BAD_KEY",
            FailureReason::AlreadyRegistered => "ALREADY_REGISTERED",
            FailureReason::NotRegistered => "NOT_REGISTERED",
            FailureReason::NoRoute => "NO_ROUTE",
        };
        write!(f, "{}", name)
    }
}

// ============================================================================
// Gateway Requests
// ============================================================================

/// A command sent by a gateway to the daemon.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GatewayRequest {
    /// `[0x01][address:4][credential:20]`
    Register {
        address: Address,
        credential: Credential,
    },
    /// `[0x02][target:4][payload...]`
    Data { target: Address, payload: Vec<u8> },
    /// `[0x03]`
    Status,
    /// `[0x04]`
    Close,
}

impl GatewayRequest {
    /// Decode a request from one received frame.
    pub fn decode(raw: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = WireReader::new(raw);
        let code = reader.read_u8().map_err(|_| ProtocolError::EmptyMessage)?;

        match GatewayCommand::from_byte(code) {
            Some(GatewayCommand::Register) => {
                let address = reader.read_address()?;
                let credential = reader.read_credential()?;
                Ok(GatewayRequest::Register {
                    address,
                    credential,
                })
            }
            Some(GatewayCommand::Data) => {
                let target = reader.read_address()?;
                Ok(GatewayRequest::Data {
                    target,
                    payload: reader.rest().to_vec(),
                })
            }
            Some(GatewayCommand::Status) => Ok(GatewayRequest::Status),
            Some(GatewayCommand::Close) => Ok(GatewayRequest::Close),
            // STATE only flows daemon -> gateway
            Some(GatewayCommand::State) | None => Err(ProtocolError::UnknownCommand {
                role: "gateway",
                code,
            }),
        }
    }

    /// Encode as wire format (includes command byte).
    pub fn encode(&self) -> Vec<u8> {
        match self {
            GatewayRequest::Register {
                address,
                credential,
            } => {
                let mut buf = Vec::with_capacity(25);
                buf.push(GatewayCommand::Register.to_byte());
                buf.extend_from_slice(&address.to_bytes());
                buf.extend_from_slice(credential.as_bytes());
                buf
            }
            GatewayRequest::Data { target, payload } => {
                let mut buf = Vec::with_capacity(5 + payload.len());
                buf.push(GatewayCommand::Data.to_byte());
                buf.extend_from_slice(&target.to_bytes());
                buf.extend_from_slice(payload);
                buf
            }
            GatewayRequest::Status => vec![GatewayCommand::Status.to_byte()],
            GatewayRequest::Close => vec![GatewayCommand::Close.to_byte()],
        }
    }
}

// ============================================================================
// Daemon Replies
// ============================================================================

/// A message sent by the daemon to a gateway.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GatewayReply {
    /// `[0x00][state]`
    State(StateCode),
    /// `[0x00][0x00][reason]`
    Failure(FailureReason),
    /// `[0x00][0x01][major][minor][patch]`, sent once after the handshake.
    Greeting(ProtocolVersion),
    /// `[0x02][source:4][payload...]`, data relayed from another address.
    Delivery { source: Address, payload: Vec<u8> },
    /// `[0x04]`, daemon-initiated close.
    CloseRequest,
}

impl GatewayReply {
    /// Encode as wire format.
    pub fn encode(&self) -> Vec<u8> {
        let state = GatewayCommand::State.to_byte();
        match self {
            GatewayReply::State(code) => vec![state, code.to_byte()],
            GatewayReply::Failure(reason) => {
                vec![state, StateCode::Failure.to_byte(), reason.to_byte()]
            }
            GatewayReply::Greeting(version) => {
                let mut buf = vec![state, StateCode::Connected.to_byte()];
                buf.extend_from_slice(&version.to_bytes());
                buf
            }
            GatewayReply::Delivery { source, payload } => {
                let mut buf = Vec::with_capacity(5 + payload.len());
                buf.push(GatewayCommand::Data.to_byte());
                buf.extend_from_slice(&source.to_bytes());
                buf.extend_from_slice(payload);
                buf
            }
            GatewayReply::CloseRequest => vec![GatewayCommand::Close.to_byte()],
        }
    }

    /// Decode a reply frame (gateway side).
    ///
    /// A bare `[0x00][0x00]` is the STATUS answer of a connection that has
    /// not been greeted yet and decodes as `State(Failure)`.
    pub fn decode(raw: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = WireReader::new(raw);
        let code = reader.read_u8().map_err(|_| ProtocolError::EmptyMessage)?;

        match GatewayCommand::from_byte(code) {
            Some(GatewayCommand::State) => {
                let state_byte = reader.read_u8()?;
                let state = StateCode::from_byte(state_byte).ok_or(
                    ProtocolError::UnknownCommand {
                        role: "gateway state",
                        code: state_byte,
                    },
                )?;
                match state {
                    StateCode::Failure if !reader.is_empty() => {
                        let reason_byte = reader.read_u8()?;
                        let reason = FailureReason::from_byte(reason_byte).ok_or(
                            ProtocolError::UnknownCommand {
                                role: "failure reason",
                                code: reason_byte,
                            },
                        )?;
                        Ok(GatewayReply::Failure(reason))
                    }
                    StateCode::Connected if reader.remaining() >= 3 => {
                        let major = reader.read_u8()?;
                        let minor = reader.read_u8()?;
                        let patch = reader.read_u8()?;
                        Ok(GatewayReply::Greeting(ProtocolVersion::new(major, minor, patch)))
                    }
                    other => Ok(GatewayReply::State(other)),
                }
            }
            Some(GatewayCommand::Data) => {
                let source = reader.read_address()?;
                Ok(GatewayReply::Delivery {
                    source,
                    payload: reader.rest().to_vec(),
                })
            }
            Some(GatewayCommand::Close) => Ok(GatewayReply::CloseRequest),
            _ => Err(ProtocolError::UnknownCommand {
                role: "gateway reply",
                code,
            }),
        }
    }
}
