use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use ipnetwork::IpNetwork;
use lru::LruCache;

use crate::as_graphs::as_graph::ASN;
use crate::shared::{ROARouted, ROAValidity};
use crate::simulation_engine::announcement::Announcement;

const CACHE_SIZE: NonZeroUsize = match NonZeroUsize::new(10_000) {
    Some(size) => size,
    None => panic!("cache size must be non-zero"),
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ROA {
    pub prefix: IpNetwork,
    /// 0 marks a prefix that must not be routed at all
    pub origin: ASN,
    pub max_length: u8,
}

impl ROA {
    pub fn new(prefix: IpNetwork, origin: ASN, max_length: Option<u8>) -> Self {
        let max_length = max_length.unwrap_or_else(|| prefix.prefix());
        ROA {
            prefix,
            origin,
            max_length,
        }
    }

    pub fn is_routed(&self) -> bool {
        self.origin != 0
    }

    pub fn is_non_routed(&self) -> bool {
        self.origin == 0
    }

    pub fn covers_prefix(&self, prefix: &IpNetwork) -> bool {
        match (self.prefix, prefix) {
            (IpNetwork::V4(roa_net), IpNetwork::V4(prefix_net)) => {
                roa_net.contains(prefix_net.network()) && prefix_net.prefix() >= roa_net.prefix()
            }
            (IpNetwork::V6(roa_net), IpNetwork::V6(prefix_net)) => {
                roa_net.contains(prefix_net.network()) && prefix_net.prefix() >= roa_net.prefix()
            }
            _ => false,
        }
    }

    pub fn valid_length(&self, prefix: &IpNetwork) -> bool {
        prefix.prefix() <= self.max_length
    }

    pub fn get_validity(&self, prefix: &IpNetwork, origin: ASN) -> ROAValidity {
        if !self.covers_prefix(prefix) {
            return ROAValidity::Unknown;
        }

        match (self.valid_length(prefix), self.origin == origin) {
            (true, true) => ROAValidity::Valid,
            (false, true) => ROAValidity::InvalidLength,
            (true, false) => ROAValidity::InvalidOrigin,
            (false, false) => ROAValidity::InvalidLengthAndOrigin,
        }
    }

    pub fn get_outcome(&self, prefix: &IpNetwork, origin: ASN) -> (ROAValidity, ROARouted) {
        let validity = self.get_validity(prefix, origin);
        let routed = if self.is_routed() {
            ROARouted::Routed
        } else {
            ROARouted::NonRouted
        };
        (validity, routed)
    }
}

/// Best matching ROA for one (prefix, origin) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ROAOutcome {
    pub validity: ROAValidity,
    pub routed: ROARouted,
    /// Origin of the ROA that produced the outcome, if any covered the prefix
    pub roa_origin: Option<ASN>,
    pub roa_valid_length: Option<bool>,
}

impl ROAOutcome {
    fn unknown() -> Self {
        ROAOutcome {
            validity: ROAValidity::Unknown,
            routed: ROARouted::Unknown,
            roa_origin: None,
            roa_valid_length: None,
        }
    }
}

#[derive(Debug, Default)]
struct ROASNode {
    roas: HashSet<ROA>,
    left: Option<Box<ROASNode>>,
    right: Option<Box<ROASNode>>,
}

/// Binary trie of ROAs keyed on prefix bits, with an LRU of recent lookups
pub struct RouteValidator {
    root: ROASNode,
    cache: Mutex<LruCache<(IpNetwork, ASN), ROAOutcome>>,
}

impl RouteValidator {
    pub fn new() -> Self {
        RouteValidator {
            root: ROASNode::default(),
            cache: Mutex::new(LruCache::new(CACHE_SIZE)),
        }
    }

    pub fn from_roas(roas: impl IntoIterator<Item = ROA>) -> Self {
        let mut validator = Self::new();
        for roa in roas {
            validator.add_roa(roa);
        }
        validator
    }

    pub fn add_roa(&mut self, roa: ROA) {
        let mut node = &mut self.root;
        for bit in prefix_bits(&roa.prefix) {
            let child = if bit { &mut node.right } else { &mut node.left };
            node = &mut **child.get_or_insert_with(Box::default);
        }
        node.roas.insert(roa);
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    pub fn get_roa_outcome(&self, prefix: &IpNetwork, origin: ASN) -> (ROAValidity, ROARouted) {
        let outcome = self.lookup(prefix, origin);
        (outcome.validity, outcome.routed)
    }

    /// Outcome from the most favorable covering ROA
    pub fn lookup(&self, prefix: &IpNetwork, origin: ASN) -> ROAOutcome {
        if let Ok(mut cache) = self.cache.lock() {
            if let Some(outcome) = cache.get(&(*prefix, origin)) {
                return *outcome;
            }
        }

        let outcome = self
            .get_relevant_roas(prefix)
            .into_iter()
            .map(|roa| {
                let (validity, routed) = roa.get_outcome(prefix, origin);
                ROAOutcome {
                    validity,
                    routed,
                    roa_origin: Some(roa.origin),
                    roa_valid_length: Some(roa.valid_length(prefix)),
                }
            })
            // Lower validity is better; ties go to the lower ROA origin
            .min_by_key(|outcome| (outcome.validity, outcome.roa_origin))
            .unwrap_or_else(ROAOutcome::unknown);

        if let Ok(mut cache) = self.cache.lock() {
            cache.put((*prefix, origin), outcome);
        }
        outcome
    }

    /// Stamps `roa_origin` and `roa_valid_length` onto a seed announcement
    pub fn annotate(&self, ann: &mut Announcement) {
        let origin = ann.origin().unwrap_or_default();
        let outcome = self.lookup(&ann.prefix, origin);
        ann.roa_origin = outcome.roa_origin;
        ann.roa_valid_length = outcome.roa_valid_length;
    }

    fn get_relevant_roas(&self, prefix: &IpNetwork) -> Vec<&ROA> {
        let mut relevant_roas = Vec::new();
        let mut node = Some(&self.root);
        let mut bits = prefix_bits(prefix).into_iter();

        while let Some(current) = node {
            relevant_roas.extend(current.roas.iter().filter(|roa| roa.covers_prefix(prefix)));
            node = match bits.next() {
                Some(true) => current.right.as_deref(),
                Some(false) => current.left.as_deref(),
                None => None,
            };
        }

        relevant_roas
    }
}

impl Default for RouteValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Network bits of a prefix, most significant first
fn prefix_bits(prefix: &IpNetwork) -> Vec<bool> {
    let (addr_bits, width): (u128, u32) = match prefix {
        IpNetwork::V4(net) => (u32::from(net.network()) as u128, 32),
        IpNetwork::V6(net) => (u128::from(net.network()), 128),
    };
    (0..prefix.prefix() as u32)
        .map(|i| (addr_bits >> (width - 1 - i)) & 1 == 1)
        .collect()
}
