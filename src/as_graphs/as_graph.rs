use std::collections::{BTreeSet, HashMap};

use crate::shared::{ASNGroups, Relationships, SimulationError};

pub type ASN = u32;

/// One node of the topology.
///
/// Neighbor lists are sorted so that everything iterating over them is
/// deterministic. Nodes are immutable once the graph is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AS {
    pub asn: ASN,
    pub peers: Vec<ASN>,
    pub providers: Vec<ASN>,
    pub customers: Vec<ASN>,
    pub input_clique: bool,
    /// No customers and exactly one neighbor
    pub stub: bool,
    /// No customers and more than one neighbor
    pub multihomed: bool,
    /// 0 for ASes without customers, otherwise one above the highest customer
    pub propagation_rank: usize,
}

impl AS {
    pub fn neighbors(&self) -> impl Iterator<Item = ASN> + '_ {
        self.peers
            .iter()
            .chain(self.providers.iter())
            .chain(self.customers.iter())
            .copied()
    }

    pub fn get_neighbors(&self, relationship: Relationships) -> &[ASN] {
        match relationship {
            Relationships::Customers => &self.customers,
            Relationships::Peers => &self.peers,
            Relationships::Providers => &self.providers,
            Relationships::Origin => &[],
        }
    }

    /// Relationship of `neighbor` as seen from this AS
    pub fn relationship_to(&self, neighbor: ASN) -> Option<Relationships> {
        if self.customers.binary_search(&neighbor).is_ok() {
            Some(Relationships::Customers)
        } else if self.peers.binary_search(&neighbor).is_ok() {
            Some(Relationships::Peers)
        } else if self.providers.binary_search(&neighbor).is_ok() {
            Some(Relationships::Providers)
        } else {
            None
        }
    }

    pub fn is_neighbor(&self, asn: ASN) -> bool {
        self.relationship_to(asn).is_some()
    }

    pub fn is_stub_or_mh(&self) -> bool {
        self.stub || self.multihomed
    }

    pub fn subgraph(&self) -> ASNGroups {
        if self.input_clique {
            ASNGroups::InputClique
        } else if self.is_stub_or_mh() {
            ASNGroups::StubsOrMh
        } else {
            ASNGroups::Etc
        }
    }
}

/// Builder struct used during AS graph construction
#[derive(Debug, Clone, Default)]
pub struct ASBuilder {
    pub asn: ASN,
    pub peer_asns: Vec<ASN>,
    pub provider_asns: Vec<ASN>,
    pub customer_asns: Vec<ASN>,
    pub input_clique: bool,
}

impl ASBuilder {
    pub fn new(asn: ASN) -> Self {
        ASBuilder {
            asn,
            ..Default::default()
        }
    }

    pub fn with_peers(mut self, peers: Vec<ASN>) -> Self {
        self.peer_asns = peers;
        self
    }

    pub fn with_providers(mut self, providers: Vec<ASN>) -> Self {
        self.provider_asns = providers;
        self
    }

    pub fn with_customers(mut self, customers: Vec<ASN>) -> Self {
        self.customer_asns = customers;
        self
    }

    pub fn as_input_clique(mut self) -> Self {
        self.input_clique = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CustomerProviderLink {
    pub provider_asn: ASN,
    pub customer_asn: ASN,
}

impl CustomerProviderLink {
    pub fn new(provider_asn: ASN, customer_asn: ASN) -> Self {
        CustomerProviderLink {
            provider_asn,
            customer_asn,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerLink {
    pub peer1_asn: ASN,
    pub peer2_asn: ASN,
}

impl PeerLink {
    pub fn new(peer1_asn: ASN, peer2_asn: ASN) -> Self {
        PeerLink {
            peer1_asn,
            peer2_asn,
        }
    }
}

/// Immutable AS topology shared read-only by every trial.
///
/// ASes live in one vector sorted by ASN. Per-trial state is kept in arenas
/// indexed by the same positions (see `index_of`).
#[derive(Debug, Clone)]
pub struct ASGraph {
    ases: Vec<AS>,
    index: HashMap<ASN, usize>,
    /// Graph indices grouped by propagation rank, each rank sorted by ASN
    pub propagation_ranks: Vec<Vec<usize>>,
    asn_groups: HashMap<ASNGroups, BTreeSet<ASN>>,
}

impl ASGraph {
    /// Build the graph from per-AS builders.
    ///
    /// Every relationship must be listed on both sides. Fails on unknown
    /// neighbors, self links, asymmetric links and customer-provider cycles.
    pub fn build(builders: Vec<ASBuilder>) -> Result<ASGraph, SimulationError> {
        let mut ases: Vec<AS> = builders
            .into_iter()
            .map(|b| AS {
                asn: b.asn,
                peers: sorted_unique(b.peer_asns),
                providers: sorted_unique(b.provider_asns),
                customers: sorted_unique(b.customer_asns),
                input_clique: b.input_clique,
                stub: false,
                multihomed: false,
                propagation_rank: 0,
            })
            .collect();
        ases.sort_by_key(|as_obj| as_obj.asn);
        if let Some(dup) = ases.windows(2).find(|w| w[0].asn == w[1].asn) {
            return Err(SimulationError::InvalidConfig {
                label: "as_graph".to_string(),
                reason: format!("AS {} was added twice", dup[0].asn),
            });
        }

        let index: HashMap<ASN, usize> = ases
            .iter()
            .enumerate()
            .map(|(i, as_obj)| (as_obj.asn, i))
            .collect();

        for as_obj in &ases {
            for rel in [
                Relationships::Customers,
                Relationships::Peers,
                Relationships::Providers,
            ] {
                for &neighbor in as_obj.get_neighbors(rel) {
                    if neighbor == as_obj.asn {
                        return Err(SimulationError::SelfLink(neighbor));
                    }
                    let neighbor_obj = index
                        .get(&neighbor)
                        .map(|&i| &ases[i])
                        .ok_or(SimulationError::UnknownAsn(neighbor))?;
                    if neighbor_obj.relationship_to(as_obj.asn) != Some(rel.invert()) {
                        return Err(SimulationError::AsymmetricRelationship {
                            asn: as_obj.asn,
                            neighbor,
                            relationship: rel,
                        });
                    }
                }
            }
        }

        for as_obj in ases.iter_mut() {
            let upstreams = as_obj.peers.len() + as_obj.providers.len();
            if as_obj.customers.is_empty() {
                as_obj.stub = upstreams == 1;
                as_obj.multihomed = upstreams > 1;
            }
        }

        let mut graph = ASGraph {
            ases,
            index,
            propagation_ranks: Vec::new(),
            asn_groups: HashMap::new(),
        };
        graph.assign_as_propagation_rank()?;
        graph.add_asn_groups();
        graph.validate_subgraphs()?;
        log::debug!(
            "Built AS graph with {} ASes and {} propagation ranks",
            graph.len(),
            graph.propagation_ranks.len()
        );
        Ok(graph)
    }

    /// Build from relationship links, the shape AS-relationship datasets use
    pub fn from_links(
        cp_links: &[CustomerProviderLink],
        peer_links: &[PeerLink],
        input_clique: &[ASN],
    ) -> Result<ASGraph, SimulationError> {
        let mut builders: HashMap<ASN, ASBuilder> = HashMap::new();
        for link in cp_links {
            builders
                .entry(link.provider_asn)
                .or_insert_with(|| ASBuilder::new(link.provider_asn))
                .customer_asns
                .push(link.customer_asn);
            builders
                .entry(link.customer_asn)
                .or_insert_with(|| ASBuilder::new(link.customer_asn))
                .provider_asns
                .push(link.provider_asn);
        }
        for link in peer_links {
            builders
                .entry(link.peer1_asn)
                .or_insert_with(|| ASBuilder::new(link.peer1_asn))
                .peer_asns
                .push(link.peer2_asn);
            builders
                .entry(link.peer2_asn)
                .or_insert_with(|| ASBuilder::new(link.peer2_asn))
                .peer_asns
                .push(link.peer1_asn);
        }
        for &asn in input_clique {
            builders
                .entry(asn)
                .or_insert_with(|| ASBuilder::new(asn))
                .input_clique = true;
        }
        ASGraph::build(builders.into_values().collect())
    }

    /// Get an AS by ASN
    pub fn get(&self, asn: &ASN) -> Option<&AS> {
        self.index.get(asn).map(|&i| &self.ases[i])
    }

    pub fn index_of(&self, asn: ASN) -> Option<usize> {
        self.index.get(&asn).copied()
    }

    pub fn as_at(&self, index: usize) -> &AS {
        &self.ases[index]
    }

    pub fn contains(&self, asn: ASN) -> bool {
        self.index.contains_key(&asn)
    }

    /// Iterate over all ASes in ascending ASN order
    pub fn iter(&self) -> impl Iterator<Item = &AS> {
        self.ases.iter()
    }

    pub fn len(&self) -> usize {
        self.ases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ases.is_empty()
    }

    pub fn asn_group(&self, group: ASNGroups) -> &BTreeSet<ASN> {
        // add_asn_groups inserts every group, even when empty
        &self.asn_groups[&group]
    }

    /// Rank 0 holds ASes without customers. A provider always ranks above
    /// its customers, so walking ranks upward visits customers first.
    fn assign_as_propagation_rank(&mut self) -> Result<(), SimulationError> {
        let n = self.ases.len();
        let mut pending_customers: Vec<usize> =
            self.ases.iter().map(|as_obj| as_obj.customers.len()).collect();
        let mut ranks = vec![0usize; n];
        let mut current: Vec<usize> = (0..n).filter(|&i| pending_customers[i] == 0).collect();
        let mut ranked = 0;

        while !current.is_empty() {
            ranked += current.len();
            let mut next = Vec::new();
            for &i in &current {
                for provider in &self.ases[i].providers {
                    let p = self.index[provider];
                    ranks[p] = ranks[p].max(ranks[i] + 1);
                    pending_customers[p] -= 1;
                    if pending_customers[p] == 0 {
                        next.push(p);
                    }
                }
            }
            current = next;
        }

        if ranked != n {
            let stuck = (0..n)
                .find(|&i| pending_customers[i] > 0)
                .map(|i| self.ases[i].asn)
                .unwrap_or_default();
            return Err(SimulationError::Cycle(stuck));
        }

        let max_rank = ranks.iter().copied().max().unwrap_or(0);
        let mut propagation_ranks = vec![Vec::new(); if n == 0 { 0 } else { max_rank + 1 }];
        for (i, as_obj) in self.ases.iter_mut().enumerate() {
            as_obj.propagation_rank = ranks[i];
            propagation_ranks[ranks[i]].push(i);
        }
        self.propagation_ranks = propagation_ranks;
        Ok(())
    }

    fn add_asn_groups(&mut self) {
        let mut groups: HashMap<ASNGroups, BTreeSet<ASN>> = ASNGroups::ALL
            .iter()
            .map(|&group| (group, BTreeSet::new()))
            .collect();
        for as_obj in &self.ases {
            if let Some(members) = groups.get_mut(&as_obj.subgraph()) {
                members.insert(as_obj.asn);
            }
        }
        self.asn_groups = groups;
    }

    /// Subgraphs must be mutually exclusive and cover every AS
    pub fn validate_subgraphs(&self) -> Result<(), SimulationError> {
        let mut seen: HashMap<ASN, ASNGroups> = HashMap::new();
        for group in ASNGroups::ALL {
            for &asn in self.asn_group(group) {
                if let Some(first) = seen.insert(asn, group) {
                    return Err(SimulationError::SubgraphsOverlap {
                        asn,
                        first,
                        second: group,
                    });
                }
            }
        }
        match self.ases.iter().find(|as_obj| !seen.contains_key(&as_obj.asn)) {
            Some(missing) => Err(SimulationError::SubgraphsIncomplete(missing.asn)),
            None => Ok(()),
        }
    }
}

fn sorted_unique(mut asns: Vec<ASN>) -> Vec<ASN> {
    asns.sort_unstable();
    asns.dedup();
    asns
}
