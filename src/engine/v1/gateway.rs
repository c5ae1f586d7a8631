//! Gateway command handling.

use super::{PROTOCOL_VERSION, V1Engine};
use crate::link::{GatewayLink, GatewayState};
use crate::protocol::{
    Address, FailureReason, GatewayReply, GatewayRequest, PeerMessage, ProtocolError, StateCode,
};
use crate::registry::Classification;
use tracing::{debug, info};

pub(super) async fn process(
    engine: &V1Engine,
    link: &mut GatewayLink,
    raw: &[u8],
) -> Result<(), ProtocolError> {
    // The first frame after the handshake only triggers the greeting
    if link.state() == GatewayState::Unauthenticated {
        link.send(GatewayReply::Greeting(PROTOCOL_VERSION).encode());
        link.mark_connected();
        info!(gateway = %link.id(), remote = %link.remote(), version = %link.version(), "Gateway connected");
        return Ok(());
    }

    let request = GatewayRequest::decode(raw)?;

    if link.state() == GatewayState::Closed && request != GatewayRequest::Status {
        debug!(gateway = %link.id(), "Ignoring request on closed gateway");
        return Ok(());
    }

    match request {
        GatewayRequest::Register {
            address,
            credential,
        } => {
            if link.state() == GatewayState::Registered {
                fail(link, FailureReason::AlreadyRegistered);
                return Ok(());
            }

            if !engine
                .router
                .register_local(address, &credential, link.id())
            {
                info!(gateway = %link.id(), address = %address, "Registration refused");
                fail(link, FailureReason::BadKey);
                return Ok(());
            }

            link.send(GatewayReply::State(StateCode::Assigned).encode());
            link.mark_registered(address);
            let peers = engine
                .router
                .broadcast(&PeerMessage::Registered(address).encode());
            info!(gateway = %link.id(), address = %address, peers, "Gateway registered");
        }

        GatewayRequest::Data { target, payload } => {
            let Some(source) = link.address() else {
                fail(link, FailureReason::NotRegistered);
                return Ok(());
            };

            if relay(engine, source, target, payload).await {
                link.send(GatewayReply::State(StateCode::Sent).encode());
            } else {
                debug!(gateway = %link.id(), target = %target, "No route");
                fail(link, FailureReason::NoRoute);
            }
        }

        GatewayRequest::Status => {
            link.send(GatewayReply::State(link.state().state_code()).encode());
        }

        GatewayRequest::Close => {
            link.send(GatewayReply::State(StateCode::Closed).encode());
            release(engine, link);
            link.close();
        }
    }

    Ok(())
}

/// Daemon-initiated close: `[CLOSE]`, then `[STATE][CLOSED]`, then release.
pub(super) fn kill(engine: &V1Engine, link: &mut GatewayLink) {
    link.send(GatewayReply::CloseRequest.encode());
    link.send(GatewayReply::State(StateCode::Closed).encode());
    release(engine, link);
    link.close();
}

/// Enter Closed and give up the held address, at most once per link.
fn release(engine: &V1Engine, link: &mut GatewayLink) {
    if let Some(address) = link.mark_closed() {
        engine.router.release_gateway(link.id(), address);
    }
}

/// Deliver `payload` from `source` to whoever owns `target`.
///
/// Returns false when nobody owns it or the owning link has gone.
async fn relay(engine: &V1Engine, source: Address, target: Address, payload: Vec<u8>) -> bool {
    let router = &engine.router;
    let owner = match router.classify(&target) {
        Classification::Local(gateway) => {
            let frame = GatewayReply::Delivery { source, payload }.encode();
            return router.send_to_gateway(gateway, frame);
        }
        Classification::KnownForeign(peer) => Some(peer),
        Classification::Unknown => router.query(target, engine.query_timeout).await,
    };

    match owner {
        Some(peer) => router.send_to_peer(
            peer,
            PeerMessage::route(target, source, &payload).encode(),
        ),
        None => false,
    }
}

fn fail(link: &GatewayLink, reason: FailureReason) {
    link.send(GatewayReply::Failure(reason).encode());
}
