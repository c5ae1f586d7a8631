//! Protocol error types.

use thiserror::Error;

/// Errors related to protocol message handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("message truncated: expected at least {expected} bytes, got {got}")]
    TruncatedMessage { expected: usize, got: usize },

    #[error("malformed credential: expected {expected} bytes, got {got}")]
    MalformedCredential { expected: usize, got: usize },

    #[error("unknown {role} command: 0x{code:02x}")]
    UnknownCommand { role: &'static str, code: u8 },

    #[error("empty message")]
    EmptyMessage,
}
