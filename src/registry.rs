//! Address and Credential Registry
//!
//! Three tables keyed by [`Address`]:
//!
//! - **credentials**: who may claim an address (seeded at startup,
//!   replicated by RESOLVE/UNRESOLVE)
//! - **routes**: which peer link owns a foreign address (learned from
//!   REGISTERED, dropped by UNREGISTERED)
//! - **local**: which gateway connection currently holds an address
//!
//! An address is never in both `routes` and `local`: local registration
//! evicts a stale route, and a route for a locally held address is refused.

use crate::link::{GatewayId, PeerId};
use crate::protocol::{Address, Credential};
use std::collections::HashMap;

/// Where an address lives, from this daemon's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    /// Held by a gateway connected to this daemon.
    Local(GatewayId),
    /// Owned by the daemon on the other end of a peer link.
    KnownForeign(PeerId),
    /// Nobody we know owns it; a mesh query is needed.
    Unknown,
}

/// Address-keyed routing and authorization tables.
#[derive(Debug, Default)]
pub struct Registry {
    credentials: HashMap<Address, Credential>,
    routes: HashMap<Address, PeerId>,
    local: HashMap<Address, GatewayId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // === Classification ===

    pub fn is_local(&self, address: &Address) -> bool {
        self.local.contains_key(address)
    }

    /// Check if a peer link is known to own the address.
    pub fn is_foreign(&self, address: &Address) -> bool {
        self.routes.contains_key(address)
    }

    pub fn classify(&self, address: &Address) -> Classification {
        if let Some(gateway) = self.local.get(address) {
            Classification::Local(*gateway)
        } else if let Some(peer) = self.routes.get(address) {
            Classification::KnownForeign(*peer)
        } else {
            Classification::Unknown
        }
    }

    // === Local registrations ===

    /// Try to claim an address for a gateway.
    ///
    /// Succeeds when no credential is stored for the address or the
    /// presented one matches, and no other gateway holds it. A rejected
    /// claim leaves every table untouched.
    pub fn register_local(
        &mut self,
        address: Address,
        credential: &Credential,
        gateway: GatewayId,
    ) -> bool {
        if let Some(holder) = self.local.get(&address) {
            return *holder == gateway;
        }
        if self
            .credentials
            .get(&address)
            .is_some_and(|stored| stored != credential)
        {
            return false;
        }

        self.local.insert(address, gateway);
        self.routes.remove(&address);
        true
    }

    /// Release a local claim. Returns the gateway that held it.
    pub fn unregister_local(&mut self, address: &Address) -> Option<GatewayId> {
        self.local.remove(address)
    }

    pub fn local_owner(&self, address: &Address) -> Option<GatewayId> {
        self.local.get(address).copied()
    }

    pub fn local_count(&self) -> usize {
        self.local.len()
    }

    // === Routes ===

    /// Record that a peer owns an address.
    ///
    /// Refused (returns false) when the address is held locally.
    pub fn set_route(&mut self, address: Address, peer: PeerId) -> bool {
        if self.local.contains_key(&address) {
            return false;
        }
        self.routes.insert(address, peer);
        true
    }

    pub fn remove_route(&mut self, address: &Address) -> Option<PeerId> {
        self.routes.remove(address)
    }

    pub fn route(&self, address: &Address) -> Option<PeerId> {
        self.routes.get(address).copied()
    }

    /// Drop every route owned by a peer, returning the affected addresses.
    pub fn remove_routes_via(&mut self, peer: PeerId) -> Vec<Address> {
        let stale: Vec<Address> = self
            .routes
            .iter()
            .filter(|(_, owner)| **owner == peer)
            .map(|(addr, _)| *addr)
            .collect();
        for addr in &stale {
            self.routes.remove(addr);
        }
        stale
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    // === Credentials ===

    /// Insert or replace the credential for an address.
    ///
    /// Returns the previous credential, if any.
    pub fn upsert_credential(
        &mut self,
        address: Address,
        credential: Credential,
    ) -> Option<Credential> {
        self.credentials.insert(address, credential)
    }

    pub fn remove_credential(&mut self, address: &Address) -> Option<Credential> {
        self.credentials.remove(address)
    }

    pub fn credential(&self, address: &Address) -> Option<&Credential> {
        self.credentials.get(address)
    }

    pub fn credential_count(&self) -> usize {
        self.credentials.len()
    }
}
