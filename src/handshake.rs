//! Connection Handshake
//!
//! Version negotiation on a fresh socket, for either connection role.
//!
//! The connecting side sends `[major][minor]`. Clients on minor version 0
//! follow it with one legacy byte that carries no meaning and is discarded.
//! The accepting side either rejects with `[STATE][FAILURE][VERSION]` and
//! closes, or records the negotiated version and hands the socket to the
//! engine. The next frame the connecting side sends is answered with the
//! greeting and otherwise ignored, so a dialer writes [`WAKE`] before
//! waiting for it.

use crate::protocol::{FailureReason, GatewayCommand, ProtocolVersion, StateCode};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// The `(major, minor)` pair agreed for one connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NegotiatedVersion {
    pub major: u8,
    pub minor: u8,
}

impl NegotiatedVersion {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for NegotiatedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}", self.major, self.minor)
    }
}

/// Errors from version negotiation.
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("handshake timed out")]
    Timeout,

    #[error("handshake truncated: got {got} bytes")]
    Truncated { got: usize },

    #[error("unsupported major version {offered} (supported: {supported})")]
    UnsupportedMajorVersion { offered: u8, supported: u8 },

    #[error("handshake I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Frame a dialer sends to prompt the greeting. Matches no command code.
pub const WAKE: u8 = 0xFF;

/// The rejection sent on a major version mismatch.
pub fn rejection() -> [u8; 3] {
    [
        GatewayCommand::State.to_byte(),
        StateCode::Failure.to_byte(),
        FailureReason::Version.to_byte(),
    ]
}

/// Negotiate as the accepting side.
///
/// On major mismatch the rejection is written and the stream shut down
/// before returning the error. A minor above ours is clamped to ours.
pub async fn accept<S>(
    stream: &mut S,
    ours: ProtocolVersion,
    wait: Duration,
) -> Result<NegotiatedVersion, HandshakeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut offer = [0u8; 2];
    read_full(stream, &mut offer, wait).await?;
    let [major, minor] = offer;

    if major != ours.major {
        stream.write_all(&rejection()).await?;
        let _ = stream.shutdown().await;
        return Err(HandshakeError::UnsupportedMajorVersion {
            offered: major,
            supported: ours.major,
        });
    }

    if minor == 0 {
        let mut legacy = [0u8; 1];
        if let Err(e) = read_full(stream, &mut legacy, wait).await {
            debug!(error = %e, "No legacy handshake byte");
        }
    }

    Ok(NegotiatedVersion::new(major, minor.min(ours.minor)))
}

/// Negotiate as the dialing side and read the acceptor's greeting.
pub async fn initiate<S>(
    stream: &mut S,
    ours: ProtocolVersion,
    wait: Duration,
) -> Result<NegotiatedVersion, HandshakeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if ours.minor == 0 {
        stream.write_all(&[ours.major, ours.minor, 0]).await?;
    } else {
        stream.write_all(&[ours.major, ours.minor]).await?;
    }
    stream.write_all(&[WAKE]).await?;

    let mut greeting = [0u8; 3];
    read_full(stream, &mut greeting, wait).await?;
    let theirs = ProtocolVersion::from_bytes(greeting);

    if theirs.major != ours.major {
        return Err(HandshakeError::UnsupportedMajorVersion {
            offered: theirs.major,
            supported: ours.major,
        });
    }

    Ok(NegotiatedVersion::new(ours.major, theirs.minor.min(ours.minor)))
}

/// Fill `buf` within `wait`, failing on timeout or early EOF.
async fn read_full<S>(stream: &mut S, buf: &mut [u8], wait: Duration) -> Result<(), HandshakeError>
where
    S: AsyncRead + Unpin,
{
    let got = match tokio::time::timeout(wait, fill(stream, buf)).await {
        Ok(result) => result?,
        Err(_) => return Err(HandshakeError::Timeout),
    };
    if got < buf.len() {
        return Err(HandshakeError::Truncated { got });
    }
    Ok(())
}

async fn fill<S>(stream: &mut S, buf: &mut [u8]) -> std::io::Result<usize>
where
    S: AsyncRead + Unpin,
{
    let mut got = 0;
    while got < buf.len() {
        let n = stream.read(&mut buf[got..]).await?;
        if n == 0 {
            break;
        }
        got += n;
    }
    Ok(got)
}
