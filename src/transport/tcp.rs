//! TCP Transport Implementation

use super::{Role, TransportError};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

/// A bound listener for one connection role.
#[derive(Debug)]
pub struct TcpTransport {
    role: Role,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl TcpTransport {
    /// Bind a listener. Port 0 picks an ephemeral port.
    pub async fn bind(role: Role, addr: SocketAddr) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| TransportError::Bind {
                role,
                addr,
                source: e,
            })?;
        let local_addr = listener.local_addr()?;

        info!(role = %role, local_addr = %local_addr, "Listener bound");

        Ok(Self {
            role,
            listener,
            local_addr,
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait for the next inbound connection.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), TransportError> {
        let (stream, remote) = self.listener.accept().await?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!(remote = %remote, error = %e, "Failed to set TCP_NODELAY");
        }
        Ok((stream, remote))
    }
}

/// Dial a remote listener.
pub async fn connect(addr: SocketAddr, wait: Duration) -> Result<TcpStream, TransportError> {
    let stream = match tokio::time::timeout(wait, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => return Err(TransportError::Connect { addr, source: e }),
        Err(_) => return Err(TransportError::Timeout(addr)),
    };
    if let Err(e) = stream.set_nodelay(true) {
        debug!(remote = %addr, error = %e, "Failed to set TCP_NODELAY");
    }
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_bind_accept_connect() {
        let transport = TcpTransport::bind(Role::Peer, "127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        assert_ne!(transport.local_addr().port(), 0);
        assert_eq!(transport.role(), Role::Peer);

        let addr = transport.local_addr();
        let (accepted, dialed) = tokio::join!(
            transport.accept(),
            connect(addr, Duration::from_secs(1))
        );
        let (mut server, _remote) = accepted.unwrap();
        let mut client = dialed.unwrap();

        client.write_all(&[1, 2, 3]).await.unwrap();
        let mut buf = [0u8; 3];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [1, 2, 3]);
    }

    #[tokio::test]
    async fn test_bind_conflict() {
        let first = TcpTransport::bind(Role::Gateway, "127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let err = TcpTransport::bind(Role::Gateway, first.local_addr())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Bind { role: Role::Gateway, .. }));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let addr = {
            let transport = TcpTransport::bind(Role::Peer, "127.0.0.1:0".parse().unwrap())
                .await
                .unwrap();
            transport.local_addr()
        };
        let err = connect(addr, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
    }
}
