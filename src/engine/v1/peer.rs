//! Peer command handling.

use super::{PROTOCOL_VERSION, V1Engine};
use crate::link::{PeerLink, PeerState};
use crate::protocol::{GatewayCommand, PeerMessage, ProtocolError};
use tracing::{debug, info, trace};

pub(super) fn process(
    engine: &V1Engine,
    link: &mut PeerLink,
    raw: &[u8],
) -> Result<(), ProtocolError> {
    if link.state() == PeerState::Unestablished {
        link.send(PROTOCOL_VERSION.to_bytes().to_vec());
        link.mark_established();
        info!(peer = %link.id(), remote = %link.remote(), version = %link.version(), "Peer established");
        return Ok(());
    }

    let message = PeerMessage::decode(raw)?;
    trace!(peer = %link.id(), command = ?message.command(), "Peer message");
    let router = &engine.router;

    match message {
        PeerMessage::Route { target, trailing } => {
            // Delivered as [DATA][trailing] whatever the trailing bytes hold
            let delivered = router
                .with_state(|s| s.registry.local_owner(&target))
                .is_some_and(|gateway| {
                    let mut frame = Vec::with_capacity(1 + trailing.len());
                    frame.push(GatewayCommand::Data.to_byte());
                    frame.extend_from_slice(&trailing);
                    router.send_to_gateway(gateway, frame)
                });
            if !delivered {
                debug!(peer = %link.id(), target = %target, "Route target not held here");
                link.send(PeerMessage::Unregistered(target).encode());
            }
        }

        PeerMessage::Registered(address) => {
            if router.learn_route(address, link.id()) {
                debug!(peer = %link.id(), address = %address, "Learned route");
            }
        }

        PeerMessage::Unregistered(address) => {
            if router.forget_route(&address, link.id()).is_some() {
                debug!(peer = %link.id(), address = %address, "Dropped route");
            }
        }

        PeerMessage::Resolve {
            address,
            credential,
        } => {
            router.with_state(|s| s.registry.upsert_credential(address, credential));
            debug!(peer = %link.id(), address = %address, "Credential replicated");
        }

        PeerMessage::Unresolve(address) => {
            router.with_state(|s| s.registry.remove_credential(&address));
            debug!(peer = %link.id(), address = %address, "Credential withdrawn");
        }

        PeerMessage::Link { ip, ports } => {
            router.add_peer(ip, ports);
            info!(peer = %link.id(), "Learned peer {}:{}", ip, ports);
        }

        PeerMessage::Unlink(ip) => {
            if router.remove_peer(&ip).is_some() {
                info!(peer = %link.id(), "Forgot peer {}", ip);
            }
        }

        PeerMessage::ClosePeer => {
            link.send(PeerMessage::ClosePeer.encode());
            link.close();
        }

        PeerMessage::Query(address) => {
            let reply = if router.is_local(&address) {
                PeerMessage::Registered(address)
            } else {
                PeerMessage::Unregistered(address)
            };
            link.send(reply.encode());
        }
    }

    Ok(())
}

/// Daemon-initiated close: `[CLOSEPEER]`, then release.
pub(super) fn kill(link: &mut PeerLink) {
    link.send(PeerMessage::ClosePeer.encode());
    link.close();
}
