use std::collections::HashMap;

use crate::as_graphs::as_graph::{ASGraph, ASN};
use crate::shared::Relationships;
use crate::simulation_engine::announcement::{Announcement, Prefix};

/// An entry of RIBs In: what a neighbor last sent, and over which relationship
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnInfo {
    pub ann: Announcement,
    pub recv_relationship: Relationships,
}

impl AnnInfo {
    pub fn new(ann: Announcement, recv_relationship: Relationships) -> Self {
        AnnInfo {
            ann,
            recv_relationship,
        }
    }
}

/// neighbor -> prefix -> last announcement received, valid or not
#[derive(Debug, Default, Clone)]
pub struct RIBsIn {
    info: HashMap<ASN, HashMap<Prefix, AnnInfo>>,
}

impl RIBsIn {
    pub fn get_incoming(&self, neighbor: ASN, prefix: &Prefix) -> Option<&AnnInfo> {
        self.info.get(&neighbor).and_then(|anns| anns.get(prefix))
    }

    pub fn store_incoming(
        &mut self,
        neighbor: ASN,
        prefix: Prefix,
        ann: Announcement,
        recv_relationship: Relationships,
    ) {
        self.info
            .entry(neighbor)
            .or_default()
            .insert(prefix, AnnInfo::new(ann, recv_relationship));
    }

    pub fn remove_incoming(&mut self, neighbor: ASN, prefix: &Prefix) -> Option<AnnInfo> {
        let anns = self.info.get_mut(&neighbor)?;
        let removed = anns.remove(prefix);
        if anns.is_empty() {
            self.info.remove(&neighbor);
        }
        removed
    }

    /// Every neighbor's entry for `prefix`
    pub fn candidates<'a>(
        &'a self,
        prefix: &'a Prefix,
    ) -> impl Iterator<Item = (ASN, &'a AnnInfo)> + 'a {
        self.info
            .iter()
            .filter_map(move |(&neighbor, anns)| anns.get(prefix).map(|info| (neighbor, info)))
    }

    pub fn is_empty(&self) -> bool {
        self.info.is_empty()
    }
}

/// prefix -> currently selected (processed) route
#[derive(Debug, Default, Clone)]
pub struct LocalRIB {
    anns: HashMap<Prefix, Announcement>,
}

impl LocalRIB {
    pub fn get_best(&self, prefix: &Prefix) -> Option<&Announcement> {
        self.anns.get(prefix)
    }

    /// Replaces whatever was selected before; one entry per prefix
    pub fn set_best(&mut self, prefix: Prefix, ann: Announcement) -> Option<Announcement> {
        self.anns.insert(prefix, ann)
    }

    pub fn remove_best(&mut self, prefix: &Prefix) -> Option<Announcement> {
        self.anns.remove(prefix)
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &Prefix> {
        self.anns.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Prefix, &Announcement)> {
        self.anns.iter()
    }

    pub fn len(&self) -> usize {
        self.anns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anns.is_empty()
    }
}

/// neighbor -> prefix -> what was last advertised to that neighbor
#[derive(Debug, Default, Clone)]
pub struct RIBsOut {
    info: HashMap<ASN, HashMap<Prefix, Announcement>>,
}

impl RIBsOut {
    pub fn get_outgoing(&self, neighbor: ASN, prefix: &Prefix) -> Option<&Announcement> {
        self.info.get(&neighbor).and_then(|anns| anns.get(prefix))
    }

    /// Records an advertisement, or forgets the entry when `ann` is a withdrawal
    pub fn record_outgoing(&mut self, neighbor: ASN, prefix: Prefix, ann: Announcement) {
        if ann.withdraw {
            if let Some(anns) = self.info.get_mut(&neighbor) {
                anns.remove(&prefix);
                if anns.is_empty() {
                    self.info.remove(&neighbor);
                }
            }
        } else {
            self.info.entry(neighbor).or_default().insert(prefix, ann);
        }
    }

    pub fn prefixes_for(&self, neighbor: ASN) -> impl Iterator<Item = &Prefix> {
        self.info.get(&neighbor).into_iter().flat_map(|anns| anns.keys())
    }
}

/// Per-round mailbox: neighbor -> prefix -> announcements in arrival order
#[derive(Debug, Default, Clone)]
pub struct AnnQueue {
    info: HashMap<ASN, HashMap<Prefix, Vec<Announcement>>>,
}

pub type RecvQueue = AnnQueue;
pub type SendQueue = AnnQueue;

impl AnnQueue {
    pub fn push(&mut self, neighbor: ASN, prefix: Prefix, ann: Announcement) {
        self.info
            .entry(neighbor)
            .or_default()
            .entry(prefix)
            .or_default()
            .push(ann);
    }

    /// Empties the queue, returning entries ordered by neighbor ASN
    pub fn drain(&mut self) -> Vec<(ASN, Prefix, Vec<Announcement>)> {
        let mut drained: Vec<(ASN, Prefix, Vec<Announcement>)> = self
            .info
            .drain()
            .flat_map(|(neighbor, anns)| {
                anns.into_iter()
                    .map(move |(prefix, anns)| (neighbor, prefix, anns))
            })
            .collect();
        drained.sort_by_key(|(neighbor, _, _)| *neighbor);
        drained
    }

    pub fn is_empty(&self) -> bool {
        self.info.is_empty()
    }
}

/// All routing state owned by one AS for the duration of one trial
#[derive(Debug, Default, Clone)]
pub struct RIBStore {
    pub asn: ASN,
    pub local_rib: LocalRIB,
    pub ribs_in: RIBsIn,
    pub ribs_out: RIBsOut,
    pub recv_q: RecvQueue,
    pub send_q: SendQueue,
}

impl RIBStore {
    pub fn new(asn: ASN) -> Self {
        RIBStore {
            asn,
            ..Default::default()
        }
    }

    pub fn store_incoming(
        &mut self,
        neighbor: ASN,
        prefix: Prefix,
        ann: Announcement,
        recv_relationship: Relationships,
    ) {
        self.ribs_in
            .store_incoming(neighbor, prefix, ann, recv_relationship)
    }

    pub fn get_incoming(&self, neighbor: ASN, prefix: &Prefix) -> Option<&AnnInfo> {
        self.ribs_in.get_incoming(neighbor, prefix)
    }

    pub fn remove_incoming(&mut self, neighbor: ASN, prefix: &Prefix) -> Option<AnnInfo> {
        self.ribs_in.remove_incoming(neighbor, prefix)
    }

    pub fn set_best(&mut self, prefix: Prefix, ann: Announcement) -> Option<Announcement> {
        self.local_rib.set_best(prefix, ann)
    }

    pub fn get_best(&self, prefix: &Prefix) -> Option<&Announcement> {
        self.local_rib.get_best(prefix)
    }

    pub fn record_outgoing(&mut self, neighbor: ASN, prefix: Prefix, ann: Announcement) {
        self.ribs_out.record_outgoing(neighbor, prefix, ann)
    }

    /// Nothing stored and nothing in flight
    pub fn is_empty(&self) -> bool {
        self.local_rib.is_empty()
            && self.ribs_in.is_empty()
            && self.ribs_out.info.is_empty()
            && self.recv_q.is_empty()
            && self.send_q.is_empty()
    }
}

/// One `RIBStore` per AS, laid out in graph index order.
///
/// Allocated fresh for every trial and never shared between trials.
#[derive(Debug, Clone)]
pub struct RIBStoreArena {
    stores: Vec<RIBStore>,
}

impl RIBStoreArena {
    pub fn new(as_graph: &ASGraph) -> Self {
        RIBStoreArena {
            stores: as_graph.iter().map(|as_obj| RIBStore::new(as_obj.asn)).collect(),
        }
    }

    pub fn get(&self, index: usize) -> &RIBStore {
        &self.stores[index]
    }

    pub fn get_mut(&mut self, index: usize) -> &mut RIBStore {
        &mut self.stores[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &RIBStore> {
        self.stores.iter()
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Timestamps;

    fn ann(path: Vec<ASN>) -> Announcement {
        Announcement::new("1.2.0.0/16".parse().unwrap(), path, Timestamps::Victim)
    }

    #[test]
    fn test_absent_entries_are_none() {
        let store = RIBStore::new(1);
        let prefix: Prefix = "1.2.0.0/16".parse().unwrap();
        assert!(store.get_incoming(2, &prefix).is_none());
        assert!(store.get_best(&prefix).is_none());
        assert!(store.ribs_out.get_outgoing(2, &prefix).is_none());
    }

    #[test]
    fn test_ribs_in_keeps_one_entry_per_neighbor_prefix() {
        let mut store = RIBStore::new(1);
        let first = ann(vec![2, 3]);
        let prefix = first.prefix;
        store.store_incoming(2, prefix, first, Relationships::Customers);
        store.store_incoming(2, prefix, ann(vec![2, 4, 3]), Relationships::Customers);

        let candidates: Vec<_> = store.ribs_in.candidates(&prefix).collect();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].1.ann.as_path, vec![2, 4, 3]);

        assert!(store.remove_incoming(2, &prefix).is_some());
        assert!(store.remove_incoming(2, &prefix).is_none());
        assert!(store.ribs_in.is_empty());
    }

    #[test]
    fn test_withdrawal_clears_ribs_out() {
        let mut store = RIBStore::new(1);
        let sent = ann(vec![1, 3]);
        let prefix = sent.prefix;
        store.record_outgoing(2, prefix, sent.clone());
        assert!(store.ribs_out.get_outgoing(2, &prefix).is_some());

        store.record_outgoing(2, prefix, sent.withdrawal());
        assert!(store.ribs_out.get_outgoing(2, &prefix).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_queue_drains_in_neighbor_order() {
        let mut queue = AnnQueue::default();
        let prefix: Prefix = "1.2.0.0/16".parse().unwrap();
        queue.push(9, prefix, ann(vec![9]));
        queue.push(3, prefix, ann(vec![3]));
        queue.push(3, prefix, ann(vec![3, 5]));

        let drained = queue.drain();
        assert!(queue.is_empty());
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].0, 3);
        assert_eq!(drained[0].2.len(), 2);
        assert_eq!(drained[1].0, 9);
    }
}
