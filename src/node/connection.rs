//! Per-connection tasks.
//!
//! Each accepted or dialed socket is served by one task that owns the
//! stream. After the handshake the task alternates between two sources:
//! frames read from the socket, dispatched to the engine, and items from
//! the link's outbound channel, written to the socket in order. Every
//! exit path ends in the same teardown.

use super::NodeError;
use crate::engine::{EngineRegistry, ProtocolEngine};
use crate::handshake;
use crate::link::{GatewayLink, LinkHandle, LinkRx, Outbound, PeerId, PeerLink};
use crate::protocol::{ProtocolError, ProtocolVersion};
use crate::router::Router;
use crate::transport::{self, Role};
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Everything a connection task needs, cloned into each task.
///
/// Holding a clone keeps the node's shutdown drain open.
#[derive(Clone)]
pub(super) struct Context {
    pub router: Router,
    pub engines: Arc<EngineRegistry>,
    /// Version advertised in handshakes.
    pub version: ProtocolVersion,
    pub handshake_timeout: Duration,
    pub max_frame_size: usize,
    /// Never sent on; the node's drain completes once every clone is gone.
    pub _drain: mpsc::Sender<()>,
}

/// The link a connection task is serving.
enum ActiveLink {
    Gateway(GatewayLink),
    Peer(PeerLink),
}

impl ActiveLink {
    async fn process(&mut self, engine: &dyn ProtocolEngine, raw: &[u8]) -> Result<(), ProtocolError> {
        match self {
            ActiveLink::Gateway(link) => engine.process_gateway_message(link, raw).await,
            ActiveLink::Peer(link) => engine.process_peer_message(link, raw).await,
        }
    }

    async fn kill(&mut self, engine: &dyn ProtocolEngine) {
        match self {
            ActiveLink::Gateway(link) => engine.kill_gateway(link).await,
            ActiveLink::Peer(link) => engine.kill_peer(link).await,
        }
    }

    /// Release shared state held by the link. Safe to reach after a kill
    /// or CLOSE has already released it.
    fn teardown(&mut self, router: &Router) {
        match self {
            ActiveLink::Gateway(link) => {
                if let Some(address) = link.mark_closed() {
                    router.release_gateway(link.id(), address);
                }
                router.detach_gateway(link.id());
            }
            ActiveLink::Peer(link) => {
                let dropped = router.detach_peer(link.id());
                if !dropped.is_empty() {
                    debug!(peer = %link.id(), routes = dropped.len(), "Dropped routes via closed link");
                }
            }
        }
    }
}

impl fmt::Display for ActiveLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActiveLink::Gateway(link) => write!(f, "{}", link.id()),
            ActiveLink::Peer(link) => write!(f, "{}", link.id()),
        }
    }
}

/// Serve an accepted socket for `role`.
pub(super) async fn serve(ctx: Context, role: Role, mut stream: TcpStream, remote: SocketAddr) {
    let version =
        match handshake::accept(&mut stream, ctx.version, ctx.handshake_timeout).await {
            Ok(version) => version,
            Err(e) => {
                info!(role = %role, remote = %remote, error = %e, "Handshake failed");
                return;
            }
        };

    let Some(engine) = ctx.engines.select(version) else {
        warn!(role = %role, remote = %remote, version = %version, "No engine for negotiated version");
        let _ = stream.write_all(&handshake::rejection()).await;
        return;
    };
    info!(remote = %remote, "{} using {}", role, version);

    let (handle, rx) = LinkHandle::channel();
    let link = match role {
        Role::Gateway => {
            let id = ctx.router.allocate_gateway_id();
            ctx.router.attach_gateway(id, handle.clone());
            ActiveLink::Gateway(GatewayLink::new(id, remote, version, handle))
        }
        Role::Peer => {
            let id = ctx.router.allocate_peer_id();
            let link = PeerLink::inbound(id, remote, version, handle.clone());
            ctx.router.attach_peer(id, link.remote_ip(), handle);
            ActiveLink::Peer(link)
        }
    };

    run(&ctx, engine, link, stream, rx).await;
}

/// Reuse an open link to `ip` or dial the peer port recorded for it.
pub(super) async fn link(ctx: &Context, ip: Ipv4Addr) -> Result<PeerId, NodeError> {
    if let Some(existing) = ctx.router.link_by_ip(&ip) {
        return Ok(existing);
    }
    let ports = ctx
        .router
        .known_peer(&ip)
        .ok_or(NodeError::UnknownPeer(ip))?;

    let remote = SocketAddr::new(ip.into(), ports.peer);
    let mut stream = transport::connect(remote, ctx.handshake_timeout).await?;
    let version = handshake::initiate(&mut stream, ctx.version, ctx.handshake_timeout).await?;
    let engine = ctx
        .engines
        .select(version)
        .ok_or(NodeError::NoEngineForVersion(version))?;

    let id = ctx.router.allocate_peer_id();
    let (handle, rx) = LinkHandle::channel();
    ctx.router.attach_peer(id, Some(ip), handle.clone());
    let link = ActiveLink::Peer(PeerLink::outbound(id, remote, version, handle));
    info!(peer = %id, remote = %remote, version = %version, "Linked to peer");

    let task_ctx = ctx.clone();
    tokio::spawn(async move {
        run(&task_ctx, engine, link, stream, rx).await;
    });
    Ok(id)
}

/// Drive one established link until it closes, then tear it down.
async fn run(
    ctx: &Context,
    engine: Arc<dyn ProtocolEngine>,
    mut link: ActiveLink,
    stream: TcpStream,
    mut rx: LinkRx,
) {
    let (mut reader, mut writer) = stream.into_split();

    let mut buf = vec![0u8; ctx.max_frame_size];
    loop {
        tokio::select! {
            biased;

            item = rx.recv() => match item {
                Some(Outbound::Frame(frame)) => {
                    if let Err(e) = writer.write_all(&frame).await {
                        debug!(link = %link, error = %e, "Write failed");
                        break;
                    }
                }
                Some(Outbound::Kill) => link.kill(engine.as_ref()).await,
                Some(Outbound::Close) | None => break,
            },

            read = reader.read(&mut buf) => match read {
                Ok(0) => {
                    debug!(link = %link, "Closed by remote");
                    break;
                }
                Ok(n) => {
                    if let Err(e) = link.process(engine.as_ref(), &buf[..n]).await {
                        warn!(link = %link, error = %e, "Protocol error, closing");
                        break;
                    }
                }
                Err(e) => {
                    debug!(link = %link, error = %e, "Read failed");
                    break;
                }
            },
        }
    }

    flush(&mut writer, &mut rx).await;
    let _ = writer.shutdown().await;
    link.teardown(&ctx.router);
    info!(link = %link, "Link closed");
}

/// Write frames that were queued before the loop ended.
async fn flush(writer: &mut OwnedWriteHalf, rx: &mut LinkRx) {
    while let Ok(item) = rx.try_recv() {
        match item {
            Outbound::Frame(frame) => {
                if writer.write_all(&frame).await.is_err() {
                    return;
                }
            }
            Outbound::Kill | Outbound::Close => return,
        }
    }
}

