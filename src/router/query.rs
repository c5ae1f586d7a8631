//! Pending ownership queries.
//!
//! A query for an address is open until one peer claims it (REGISTERED),
//! every queried peer has declined it (UNREGISTERED or link loss), or the
//! asker gives up.

use crate::link::PeerId;
use crate::protocol::Address;
use std::collections::{HashMap, HashSet};
use tokio::sync::oneshot;

/// Answer delivered to a waiting asker: the owning peer, or `None`.
pub type QueryAnswer = Option<PeerId>;

#[derive(Debug)]
struct PendingQuery {
    id: u64,
    outstanding: HashSet<PeerId>,
    reply: oneshot::Sender<QueryAnswer>,
}

#[derive(Debug, Default)]
pub(crate) struct QueryTable {
    next_id: u64,
    pending: HashMap<Address, Vec<PendingQuery>>,
}

impl QueryTable {
    /// Open a query awaiting answers from `peers`.
    pub(crate) fn open(
        &mut self,
        address: Address,
        peers: impl IntoIterator<Item = PeerId>,
    ) -> (u64, oneshot::Receiver<QueryAnswer>) {
        let (tx, rx) = oneshot::channel();
        let id = self.next_id;
        self.next_id += 1;

        let query = PendingQuery {
            id,
            outstanding: peers.into_iter().collect(),
            reply: tx,
        };
        if query.outstanding.is_empty() {
            let _ = query.reply.send(None);
        } else {
            self.pending.entry(address).or_default().push(query);
        }
        (id, rx)
    }

    /// Complete every query for `address` with the owning peer.
    pub(crate) fn resolve(&mut self, address: &Address, owner: PeerId) -> usize {
        let Some(queries) = self.pending.remove(address) else {
            return 0;
        };
        let count = queries.len();
        for query in queries {
            let _ = query.reply.send(Some(owner));
        }
        count
    }

    /// Record that `peer` does not own `address`.
    pub(crate) fn decline(&mut self, address: &Address, peer: PeerId) {
        let Some(queries) = self.pending.get_mut(address) else {
            return;
        };
        let mut still_open = Vec::with_capacity(queries.len());
        for mut query in queries.drain(..) {
            query.outstanding.remove(&peer);
            if query.outstanding.is_empty() {
                let _ = query.reply.send(None);
            } else {
                still_open.push(query);
            }
        }
        if still_open.is_empty() {
            self.pending.remove(address);
        } else {
            *queries = still_open;
        }
    }

    /// Treat a closed peer link as declining every open query.
    pub(crate) fn decline_all_from(&mut self, peer: PeerId) {
        let addresses: Vec<Address> = self.pending.keys().copied().collect();
        for address in addresses {
            self.decline(&address, peer);
        }
    }

    /// Drop a query whose asker stopped waiting.
    pub(crate) fn cancel(&mut self, address: &Address, id: u64) {
        if let Some(queries) = self.pending.get_mut(address) {
            queries.retain(|q| q.id != id);
            if queries.is_empty() {
                self.pending.remove(address);
            }
        }
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: Address = Address::new(3, 4);

    #[test]
    fn test_resolve_completes_all() {
        let mut table = QueryTable::default();
        let (_, mut rx1) = table.open(ADDR, [PeerId::new(1), PeerId::new(2)]);
        let (_, mut rx2) = table.open(ADDR, [PeerId::new(1)]);

        assert_eq!(table.resolve(&ADDR, PeerId::new(2)), 2);
        assert_eq!(rx1.try_recv().unwrap(), Some(PeerId::new(2)));
        assert_eq!(rx2.try_recv().unwrap(), Some(PeerId::new(2)));
        assert_eq!(table.pending_count(), 0);
    }

    #[test]
    fn test_all_declines_answer_none() {
        let mut table = QueryTable::default();
        let (_, mut rx) = table.open(ADDR, [PeerId::new(1), PeerId::new(2)]);

        table.decline(&ADDR, PeerId::new(1));
        assert!(rx.try_recv().is_err());
        assert_eq!(table.pending_count(), 1);

        table.decline(&ADDR, PeerId::new(2));
        assert_eq!(rx.try_recv().unwrap(), None);
        assert_eq!(table.pending_count(), 0);
    }

    #[test]
    fn test_decline_from_unqueried_peer_is_ignored() {
        let mut table = QueryTable::default();
        let (_, mut rx) = table.open(ADDR, [PeerId::new(1)]);

        table.decline(&ADDR, PeerId::new(9));
        table.decline(&Address::new(9, 9), PeerId::new(1));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_link_loss_declines() {
        let mut table = QueryTable::default();
        let (_, mut rx_a) = table.open(ADDR, [PeerId::new(1)]);
        let (_, mut rx_b) = table.open(Address::new(5, 5), [PeerId::new(1), PeerId::new(2)]);

        table.decline_all_from(PeerId::new(1));
        assert_eq!(rx_a.try_recv().unwrap(), None);
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn test_open_without_peers_answers_immediately() {
        let mut table = QueryTable::default();
        let (_, mut rx) = table.open(ADDR, []);
        assert_eq!(rx.try_recv().unwrap(), None);
        assert_eq!(table.pending_count(), 0);
    }

    #[test]
    fn test_cancel() {
        let mut table = QueryTable::default();
        let (id, _rx) = table.open(ADDR, [PeerId::new(1)]);
        table.cancel(&ADDR, id);
        assert_eq!(table.pending_count(), 0);
    }
}
