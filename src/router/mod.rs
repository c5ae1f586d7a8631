//! Shared Routing State
//!
//! Every table the engines mutate lives in one [`RouterState`] behind a
//! single `parking_lot::Mutex`. The lock is never held across an `.await`
//! or while sending: fan-out takes a snapshot of link handles under the
//! lock and sends after releasing it.

mod query;

pub use query::QueryAnswer;

use crate::link::{GatewayId, LinkHandle, PeerId};
use crate::mesh::PeerMesh;
use crate::protocol::{Address, Credential, PeerMessage, PortPair};
use crate::registry::{Classification, Registry};
use crate::seed::{CredentialSeed, PeerSeed};
use parking_lot::Mutex;
use query::QueryTable;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tables shared by every connection task.
#[derive(Debug, Default)]
pub struct RouterState {
    pub registry: Registry,
    pub mesh: PeerMesh,
    queries: QueryTable,
    gateways: HashMap<GatewayId, LinkHandle>,
}

/// Cloneable handle to the shared routing state.
#[derive(Clone, Debug, Default)]
pub struct Router {
    inner: Arc<Mutex<RouterState>>,
    next_id: Arc<AtomicU64>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate_gateway_id(&self) -> GatewayId {
        GatewayId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn allocate_peer_id(&self) -> PeerId {
        PeerId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Run `f` with the state locked. `f` must not block.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut RouterState) -> R) -> R {
        f(&mut *self.inner.lock())
    }

    // === Link attachment ===

    pub fn attach_gateway(&self, id: GatewayId, handle: LinkHandle) {
        self.inner.lock().gateways.insert(id, handle);
    }

    pub fn detach_gateway(&self, id: GatewayId) {
        self.inner.lock().gateways.remove(&id);
    }

    pub fn attach_peer(&self, id: PeerId, ip: Option<Ipv4Addr>, handle: LinkHandle) {
        self.inner.lock().mesh.insert_link(id, ip, handle);
    }

    /// Remove a peer link, dropping its routes and declining its queries.
    ///
    /// Returns the addresses whose route went through the link.
    pub fn detach_peer(&self, id: PeerId) -> Vec<Address> {
        let mut state = self.inner.lock();
        state.mesh.remove_link(&id);
        state.queries.decline_all_from(id);
        state.registry.remove_routes_via(id)
    }

    // === Registry access ===

    pub fn classify(&self, address: &Address) -> Classification {
        self.inner.lock().registry.classify(address)
    }

    pub fn is_local(&self, address: &Address) -> bool {
        self.inner.lock().registry.is_local(address)
    }

    pub fn register_local(&self, address: Address, credential: &Credential, gateway: GatewayId) -> bool {
        self.inner
            .lock()
            .registry
            .register_local(address, credential, gateway)
    }

    /// Record that `peer` owns `address` and answer any pending queries.
    pub fn learn_route(&self, address: Address, peer: PeerId) -> bool {
        let mut state = self.inner.lock();
        if !state.registry.set_route(address, peer) {
            state.queries.decline(&address, peer);
            return false;
        }
        let answered = state.queries.resolve(&address, peer);
        if answered > 0 {
            debug!(address = %address, peer = %peer, answered, "Resolved pending queries");
        }
        true
    }

    /// Drop the route for `address`, counting it as `peer` declining.
    pub fn forget_route(&self, address: &Address, peer: PeerId) -> Option<PeerId> {
        let mut state = self.inner.lock();
        state.queries.decline(address, peer);
        state.registry.remove_route(address)
    }

    /// Release an address held by a gateway and tell the mesh.
    ///
    /// Removes the local registration, the credential entry and any route
    /// entry, then broadcasts UNREGISTERED. Does nothing unless `gateway`
    /// is the current holder.
    pub fn release_gateway(&self, gateway: GatewayId, address: Address) -> bool {
        {
            let mut state = self.inner.lock();
            if state.registry.local_owner(&address) != Some(gateway) {
                return false;
            }
            state.registry.unregister_local(&address);
            state.registry.remove_credential(&address);
            state.registry.remove_route(&address);
        }

        let sent = self.broadcast(&PeerMessage::Unregistered(address).encode());
        info!(gateway = %gateway, address = %address, peers = sent, "Released address");
        true
    }

    // === Sending ===

    /// Queue a frame to a local gateway. Returns false if it is gone.
    pub fn send_to_gateway(&self, id: GatewayId, frame: Vec<u8>) -> bool {
        let handle = self.inner.lock().gateways.get(&id).cloned();
        match handle {
            Some(handle) => handle.send(frame).is_ok(),
            None => false,
        }
    }

    /// Queue a frame to a peer link. Returns false if it is gone.
    pub fn send_to_peer(&self, id: PeerId, frame: Vec<u8>) -> bool {
        let handle = self.inner.lock().mesh.handle(&id);
        match handle {
            Some(handle) => handle.send(frame).is_ok(),
            None => false,
        }
    }

    /// Queue a frame to every peer link. Returns how many accepted it.
    ///
    /// A failed send is logged and does not affect the other links.
    pub fn broadcast(&self, frame: &[u8]) -> usize {
        let targets = self.inner.lock().mesh.handles();
        let mut sent = 0;
        for (peer, handle) in targets {
            match handle.send(frame.to_vec()) {
                Ok(()) => sent += 1,
                Err(e) => warn!(peer = %peer, error = %e, "Broadcast send failed"),
            }
        }
        sent
    }

    // === Ownership queries ===

    /// Ask every linked peer who owns `address`.
    ///
    /// Returns immediately when a route is already known or no peer is
    /// linked. Otherwise waits until a peer claims the address, all of
    /// them decline, or `wait` elapses.
    pub async fn query(&self, address: Address, wait: Duration) -> QueryAnswer {
        let (id, reply, targets) = {
            let mut state = self.inner.lock();
            if let Some(peer) = state.registry.route(&address) {
                return Some(peer);
            }
            let targets = state.mesh.handles();
            if targets.is_empty() {
                return None;
            }
            let (id, reply) = state
                .queries
                .open(address, targets.iter().map(|(peer, _)| *peer));
            (id, reply, targets)
        };

        let frame = PeerMessage::Query(address).encode();
        for (peer, handle) in &targets {
            if handle.send(frame.clone()).is_err() {
                debug!(peer = %peer, address = %address, "Query send failed");
                self.inner.lock().queries.decline(&address, *peer);
            }
        }

        match tokio::time::timeout(wait, reply).await {
            Ok(Ok(answer)) => answer,
            Ok(Err(_)) => None,
            Err(_) => {
                self.inner.lock().queries.cancel(&address, id);
                debug!(address = %address, "Query timed out");
                None
            }
        }
    }

    // === Mesh ===

    pub fn add_peer(&self, ip: Ipv4Addr, ports: PortPair) -> Option<PortPair> {
        self.inner.lock().mesh.add_peer(ip, ports)
    }

    pub fn remove_peer(&self, ip: &Ipv4Addr) -> Option<PortPair> {
        self.inner.lock().mesh.remove_peer(ip)
    }

    pub fn known_peer(&self, ip: &Ipv4Addr) -> Option<PortPair> {
        self.inner.lock().mesh.known_peer(ip)
    }

    /// An open link to the host, if any.
    pub fn link_by_ip(&self, ip: &Ipv4Addr) -> Option<PeerId> {
        self.inner.lock().mesh.link_by_ip(ip)
    }

    pub fn unlinked_peers(&self) -> Vec<(Ipv4Addr, PortPair)> {
        self.inner.lock().mesh.unlinked_peers()
    }

    /// Ask a peer link's task to close it.
    pub fn unlink(&self, peer: PeerId) -> bool {
        let handle = self.inner.lock().mesh.handle(&peer);
        handle.is_some_and(|handle| handle.close().is_ok())
    }

    /// Run forced teardown on every gateway and peer link.
    pub fn kill_all(&self) -> usize {
        let handles: Vec<LinkHandle> = {
            let state = self.inner.lock();
            state
                .gateways
                .values()
                .cloned()
                .chain(state.mesh.handles().into_iter().map(|(_, h)| h))
                .collect()
        };
        handles.iter().filter(|h| h.kill().is_ok()).count()
    }

    // === Seeds ===

    pub fn import_credentials(&self, seeds: &[CredentialSeed]) {
        let mut state = self.inner.lock();
        for seed in seeds {
            state.registry.upsert_credential(seed.address, seed.credential);
            info!(address = %seed.address, "Imported credential");
        }
    }

    pub fn import_peers(&self, seeds: &[PeerSeed]) {
        let mut state = self.inner.lock();
        for seed in seeds {
            state.mesh.add_peer(seed.ip, seed.ports);
            info!("Imported peer {}:{}", seed.ip, seed.ports);
        }
    }

    // === Counts ===

    pub fn gateway_count(&self) -> usize {
        self.inner.lock().gateways.len()
    }

    pub fn peer_link_count(&self) -> usize {
        self.inner.lock().mesh.link_count()
    }

    pub fn pending_queries(&self) -> usize {
        self.inner.lock().queries.pending_count()
    }
}
