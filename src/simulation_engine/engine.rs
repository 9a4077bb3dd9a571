use std::collections::{BTreeMap, HashSet};

use crate::as_graphs::as_graph::{ASGraph, ASN};
use crate::shared::{Relationships, SimulationError};
use crate::simulation_engine::announcement::{Announcement, Prefix};
use crate::simulation_engine::policy::{Decision, PolicyAssignment, ValidationContext};
use crate::simulation_engine::ribs::{LocalRIB, RIBStore, RIBStoreArena};

/// Round-based propagation over a shared, read-only topology.
///
/// Each engine owns a fresh `RIBStoreArena`, so one engine is one trial.
/// Work inside a rank step only touches the processing AS's own store. Send
/// queues are flushed to neighbors after the whole step, which is the
/// barrier between steps.
pub struct SimulationEngine<'a> {
    pub as_graph: &'a ASGraph,
    pub policies: &'a PolicyAssignment,
    ribs: RIBStoreArena,
}

impl<'a> SimulationEngine<'a> {
    pub fn new(as_graph: &'a ASGraph, policies: &'a PolicyAssignment) -> Self {
        SimulationEngine {
            as_graph,
            policies,
            ribs: RIBStoreArena::new(as_graph),
        }
    }

    /// Seeds announcements into their ASes' local RIBs.
    ///
    /// An empty path is treated as originated by the seeding AS. A second
    /// seed for a prefix an AS already holds is an error.
    pub fn setup(&mut self, seeds: Vec<(ASN, Announcement)>) -> Result<(), SimulationError> {
        for (asn, mut ann) in seeds {
            let index = self
                .as_graph
                .index_of(asn)
                .ok_or(SimulationError::UnknownAsn(asn))?;
            if ann.as_path.is_empty() {
                ann.as_path = vec![asn];
            }
            ann.seed_asn = Some(asn);
            ann.next_hop_asn = asn;
            ann.recv_relationship = Relationships::Origin;
            ann.withdraw = false;

            let ctx = self.context(index);
            let unprocessed = ann.clone();
            self.policies
                .policy_for(asn)
                .process_announcement(&unprocessed, &mut ann, &ctx);

            let store = self.ribs.get_mut(index);
            if store.get_best(&ann.prefix).is_some() {
                return Err(SimulationError::DuplicateLocalRibEntry {
                    asn,
                    prefix: ann.prefix,
                });
            }
            log::trace!("Seeding AS {} with {}", asn, ann);
            store.set_best(ann.prefix, ann);
        }
        Ok(())
    }

    /// Removes a seeded route and falls back to the best learned one, if
    /// any. The next round sends the withdrawals or the replacement.
    pub fn withdraw_seed(&mut self, asn: ASN, prefix: &Prefix) -> Result<(), SimulationError> {
        let index = self
            .as_graph
            .index_of(asn)
            .ok_or(SimulationError::UnknownAsn(asn))?;
        let ctx = self.context(index);
        let store = self.ribs.get_mut(index);
        let seeded = store
            .get_best(prefix)
            .map_or(false, |ann| ann.recv_relationship == Relationships::Origin);
        if !seeded {
            return Err(SimulationError::InvalidConfig {
                label: format!("AS {}", asn),
                reason: format!("no seeded route for {} to withdraw", prefix),
            });
        }
        store.local_rib.remove_best(prefix);
        select_best(store, prefix, &ctx);
        Ok(())
    }

    pub fn run(&mut self, rounds: u32) {
        for round in 0..rounds {
            log::trace!("Propagation round {}", round);
            self.propagate_round();
        }
    }

    /// Up to providers rank by rank, across peers, then down to customers
    pub fn propagate_round(&mut self) {
        let as_graph = self.as_graph;
        let ranks = &as_graph.propagation_ranks;

        for (i, rank) in ranks.iter().enumerate() {
            if i > 0 {
                self.process_incoming_anns(rank);
            }
            self.propagate_to(rank, Relationships::Providers);
        }

        let everyone: Vec<usize> = (0..as_graph.len()).collect();
        self.propagate_to(&everyone, Relationships::Peers);
        self.process_incoming_anns(&everyone);

        for (i, rank) in ranks.iter().rev().enumerate() {
            if i > 0 {
                self.process_incoming_anns(rank);
            }
            self.propagate_to(rank, Relationships::Customers);
        }
    }

    fn context(&self, index: usize) -> ValidationContext<'a> {
        ValidationContext {
            as_obj: self.as_graph.as_at(index),
            as_graph: self.as_graph,
            policies: self.policies,
        }
    }

    fn process_incoming_anns(&mut self, indices: &[usize]) {
        for &index in indices {
            let ctx = self.context(index);
            process_incoming(self.ribs.get_mut(index), &ctx);
        }
    }

    /// Fills send queues for `send_rel` neighbors, then flushes them
    fn propagate_to(&mut self, indices: &[usize], send_rel: Relationships) {
        for &index in indices {
            let ctx = self.context(index);
            queue_outgoing(self.ribs.get_mut(index), &ctx, send_rel);
        }
        for &index in indices {
            let sender = self.as_graph.as_at(index).asn;
            let outgoing = self.ribs.get_mut(index).send_q.drain();
            for (neighbor, prefix, anns) in outgoing {
                // Neighbors were checked when the graph was built
                if let Some(neighbor_index) = self.as_graph.index_of(neighbor) {
                    let recv_q = &mut self.ribs.get_mut(neighbor_index).recv_q;
                    for ann in anns {
                        recv_q.push(sender, prefix, ann);
                    }
                }
            }
        }
    }

    pub fn rib_store(&self, asn: ASN) -> Option<&RIBStore> {
        self.as_graph.index_of(asn).map(|i| self.ribs.get(i))
    }

    pub fn local_rib(&self, asn: ASN) -> Option<&LocalRIB> {
        self.rib_store(asn).map(|store| &store.local_rib)
    }

    pub fn get_local_rib_snapshot(&self) -> BTreeMap<ASN, BTreeMap<String, Vec<ASN>>> {
        self.ribs
            .iter()
            .map(|store| {
                let ribs = store
                    .local_rib
                    .iter()
                    .map(|(prefix, ann)| (prefix.to_string(), ann.as_path.clone()))
                    .collect();
                (store.asn, ribs)
            })
            .collect()
    }
}

/// Drains the receive queue into RIBs In and re-decides every touched prefix
fn process_incoming(store: &mut RIBStore, ctx: &ValidationContext) {
    let mut touched: HashSet<Prefix> = HashSet::new();

    for (neighbor, prefix, anns) in store.recv_q.drain() {
        for ann in anns {
            if ann.withdraw {
                let matches = store
                    .get_incoming(neighbor, &prefix)
                    .map_or(false, |info| info.ann.prefix_path_attributes_eq(&ann));
                if matches {
                    store.remove_incoming(neighbor, &prefix);
                }
            } else {
                assert!(
                    !ann.as_path.is_empty(),
                    "AS {} received an announcement for {} with an empty AS path from {}",
                    store.asn,
                    prefix,
                    neighbor
                );
                let recv_relationship = ann.recv_relationship;
                store.store_incoming(neighbor, prefix, ann, recv_relationship);
            }
            touched.insert(prefix);
        }
    }

    for prefix in touched {
        select_best(store, &prefix, ctx);
    }
}

fn select_best(store: &mut RIBStore, prefix: &Prefix, ctx: &ValidationContext) {
    let current = store.get_best(prefix);
    if current.map_or(false, |ann| ann.recv_relationship == Relationships::Origin) {
        return;
    }

    let policy = ctx.policies.policy_for(ctx.as_obj.asn);
    let mut best: Option<&Announcement> = None;
    for (_, info) in store.ribs_in.candidates(prefix) {
        if policy.decide(&info.ann, best, ctx) == Decision::Replace {
            best = Some(&info.ann);
        }
    }

    let processed = best.map(|ann| {
        let mut processed = ann.copy_and_process(ctx.as_obj.asn);
        policy.process_announcement(ann, &mut processed, ctx);
        processed
    });

    match processed {
        Some(ann) => {
            let changed = current.map_or(true, |cur| {
                !cur.prefix_path_attributes_eq(&ann) || cur.bgpsec_as_path != ann.bgpsec_as_path
            });
            if changed {
                log::trace!("AS {} selected {}", ctx.as_obj.asn, ann);
                store.set_best(*prefix, ann);
            }
        }
        None => {
            if store.local_rib.remove_best(prefix).is_some() {
                log::trace!("AS {} lost its route for {}", ctx.as_obj.asn, prefix);
            }
        }
    }
}

/// Diffs the local RIB against RIBs Out for every neighbor over `send_rel`
fn queue_outgoing(store: &mut RIBStore, ctx: &ValidationContext, send_rel: Relationships) {
    let asn = ctx.as_obj.asn;
    let policy = ctx.policies.policy_for(asn);

    for &neighbor in ctx.as_obj.get_neighbors(send_rel) {
        let mut prefixes: Vec<Prefix> = store.local_rib.prefixes().copied().collect();
        prefixes.extend(store.ribs_out.prefixes_for(neighbor).copied());
        let prefixes: HashSet<Prefix> = prefixes.into_iter().collect();

        for prefix in prefixes {
            let desired = store
                .get_best(&prefix)
                .filter(|ann| policy.should_propagate(ann, send_rel))
                .map(|ann| {
                    let mut out = ann.copy_for_neighbor(asn, send_rel);
                    policy.prepare_to_send(&mut out, asn, neighbor);
                    out
                });
            let previous = store.ribs_out.get_outgoing(neighbor, &prefix).cloned();

            if let (Some(prev), Some(new)) = (&previous, &desired) {
                if prev.prefix_path_attributes_eq(new) && prev.bgpsec_as_path == new.bgpsec_as_path {
                    continue;
                }
            }
            if let Some(prev) = previous {
                let withdrawal = prev.withdrawal();
                store.record_outgoing(neighbor, prefix, withdrawal.clone());
                store.send_q.push(neighbor, prefix, withdrawal);
            }
            if let Some(new) = desired {
                store.record_outgoing(neighbor, prefix, new.clone());
                store.send_q.push(neighbor, prefix, new);
            }
        }
    }
}
