//! Peer Mesh Membership
//!
//! Two distinct sets:
//! - **known peers**: `IPv4 -> PortPair` records, seeded from disk and
//!   updated by LINK/UNLINK announcements
//! - **links**: peer connections that are currently open
//!
//! A known peer need not be linked, and an inbound link may come from a
//! host that was never announced.

use crate::link::{LinkHandle, PeerId};
use crate::protocol::PortPair;
use std::collections::HashMap;
use std::net::Ipv4Addr;

/// An open peer link as seen by the mesh.
#[derive(Clone, Debug)]
struct LinkEntry {
    ip: Option<Ipv4Addr>,
    handle: LinkHandle,
}

/// Known peers and open peer links.
#[derive(Debug, Default)]
pub struct PeerMesh {
    known: HashMap<Ipv4Addr, PortPair>,
    links: HashMap<PeerId, LinkEntry>,
}

impl PeerMesh {
    pub fn new() -> Self {
        Self::default()
    }

    // === Known peers ===

    /// Add or update a known peer. Returns the previous ports, if any.
    pub fn add_peer(&mut self, ip: Ipv4Addr, ports: PortPair) -> Option<PortPair> {
        self.known.insert(ip, ports)
    }

    pub fn remove_peer(&mut self, ip: &Ipv4Addr) -> Option<PortPair> {
        self.known.remove(ip)
    }

    pub fn known_peer(&self, ip: &Ipv4Addr) -> Option<PortPair> {
        self.known.get(ip).copied()
    }

    pub fn known_count(&self) -> usize {
        self.known.len()
    }

    /// Known peers that have no open link.
    pub fn unlinked_peers(&self) -> Vec<(Ipv4Addr, PortPair)> {
        self.known
            .iter()
            .filter(|(ip, _)| self.link_by_ip(ip).is_none())
            .map(|(ip, ports)| (*ip, *ports))
            .collect()
    }

    // === Links ===

    pub fn insert_link(&mut self, id: PeerId, ip: Option<Ipv4Addr>, handle: LinkHandle) {
        self.links.insert(id, LinkEntry { ip, handle });
    }

    /// Remove an open link. Returns true if it was present.
    pub fn remove_link(&mut self, id: &PeerId) -> bool {
        self.links.remove(id).is_some()
    }

    /// Find an open link to the given host.
    pub fn link_by_ip(&self, ip: &Ipv4Addr) -> Option<PeerId> {
        self.links
            .iter()
            .filter(|(_, entry)| entry.ip.as_ref() == Some(ip) && !entry.handle.is_closed())
            .map(|(id, _)| *id)
            .min()
    }

    pub fn handle(&self, id: &PeerId) -> Option<LinkHandle> {
        self.links.get(id).map(|entry| entry.handle.clone())
    }

    /// Snapshot of every open link, for sending outside the lock.
    pub fn handles(&self) -> Vec<(PeerId, LinkHandle)> {
        self.links
            .iter()
            .map(|(id, entry)| (*id, entry.handle.clone()))
            .collect()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IP_A: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
    const IP_B: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);

    #[test]
    fn test_known_peers() {
        let mut mesh = PeerMesh::new();
        assert_eq!(mesh.add_peer(IP_A, PortPair::new(1, 2)), None);
        assert_eq!(mesh.add_peer(IP_A, PortPair::new(3, 4)), Some(PortPair::new(1, 2)));
        assert_eq!(mesh.known_peer(&IP_A), Some(PortPair::new(3, 4)));
        assert_eq!(mesh.known_count(), 1);

        assert_eq!(mesh.remove_peer(&IP_A), Some(PortPair::new(3, 4)));
        assert_eq!(mesh.remove_peer(&IP_A), None);
    }

    #[test]
    fn test_links_independent_of_known_peers() {
        let mut mesh = PeerMesh::new();
        let (handle, _rx) = LinkHandle::channel();
        mesh.insert_link(PeerId::new(1), Some(IP_B), handle);

        assert_eq!(mesh.link_count(), 1);
        assert_eq!(mesh.known_count(), 0);
        assert_eq!(mesh.link_by_ip(&IP_B), Some(PeerId::new(1)));
        assert!(mesh.remove_link(&PeerId::new(1)));
        assert!(!mesh.remove_link(&PeerId::new(1)));
        assert_eq!(mesh.link_by_ip(&IP_B), None);
    }

    #[test]
    fn test_unlinked_peers() {
        let mut mesh = PeerMesh::new();
        mesh.add_peer(IP_A, PortPair::new(1, 2));
        mesh.add_peer(IP_B, PortPair::new(3, 4));
        let (handle, _rx) = LinkHandle::channel();
        mesh.insert_link(PeerId::new(5), Some(IP_A), handle);

        assert_eq!(mesh.unlinked_peers(), vec![(IP_B, PortPair::new(3, 4))]);
    }

    #[test]
    fn test_link_by_ip_skips_dead_links() {
        let mut mesh = PeerMesh::new();
        let (handle, rx) = LinkHandle::channel();
        mesh.insert_link(PeerId::new(1), Some(IP_A), handle);
        drop(rx);

        assert_eq!(mesh.link_by_ip(&IP_A), None);
        assert_eq!(mesh.handles().len(), 1);
    }
}
