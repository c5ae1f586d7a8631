//! Background processor.
//!
//! Started with the node and joined at shutdown. Each tick dials known
//! mesh peers that have no open link, so seeded peers and LINK
//! announcements turn into links.

use super::connection::{self, Context};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

pub(super) async fn run(
    context: Context,
    interval: Duration,
    auto_link: bool,
    mut alive: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = alive.changed() => break,
            _ = ticker.tick() => {}
        }

        if auto_link {
            link_known_peers(&context).await;
        }
        debug!(
            gateways = context.router.gateway_count(),
            peer_links = context.router.peer_link_count(),
            pending_queries = context.router.pending_queries(),
            "Processor tick"
        );
    }

    debug!("Processor stopped");
}

async fn link_known_peers(context: &Context) {
    for (ip, ports) in context.router.unlinked_peers() {
        match connection::link(context, ip).await {
            Ok(peer) => info!(peer = %peer, "Auto-linked {}:{}", ip, ports),
            Err(e) => debug!(error = %e, "Failed to link {}:{}", ip, ports),
        }
    }
}
