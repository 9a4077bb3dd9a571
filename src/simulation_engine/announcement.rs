use std::fmt;
use std::hash::{Hash, Hasher};

use crate::as_graphs::as_graph::ASN;
use crate::shared::{Relationships, Timestamps};

pub type Prefix = ipnetwork::IpNetwork;

/// One route advertisement.
///
/// `as_path[0]` is the most recent hop and the last element is the origin.
/// Announcements are copied by value at every hop, so identity is the
/// `(prefix, as_path)` pair rather than the object.
#[derive(Debug, Clone)]
pub struct Announcement {
    pub prefix: Prefix,
    pub as_path: Vec<ASN>,
    /// AS this announcement was learned from (the sender)
    pub next_hop_asn: ASN,
    /// AS that was externally seeded with the route. Cleared on every copy.
    pub seed_asn: Option<ASN>,
    pub recv_relationship: Relationships,
    pub timestamp: Timestamps,
    pub withdraw: bool,
    pub roa_valid_length: Option<bool>,
    pub roa_origin: Option<ASN>,
    pub bgpsec_next_asn: Option<ASN>,
    pub bgpsec_as_path: Option<Vec<ASN>>,
}

impl Announcement {
    /// A seed announcement originated at `as_path`'s last AS and held by its first
    pub fn new(prefix: Prefix, as_path: Vec<ASN>, timestamp: Timestamps) -> Self {
        let seed_asn = as_path.first().copied();
        Announcement {
            prefix,
            next_hop_asn: seed_asn.unwrap_or_default(),
            seed_asn,
            as_path,
            recv_relationship: Relationships::Origin,
            timestamp,
            withdraw: false,
            roa_valid_length: None,
            roa_origin: None,
            bgpsec_next_asn: None,
            bgpsec_as_path: None,
        }
    }

    pub fn with_roa(mut self, roa_origin: Option<ASN>, roa_valid_length: Option<bool>) -> Self {
        self.roa_origin = roa_origin;
        self.roa_valid_length = roa_valid_length;
        self
    }

    pub fn origin(&self) -> Option<ASN> {
        self.as_path.last().copied()
    }

    /// Covered by a ROA
    pub fn covered_by_roa(&self) -> bool {
        self.roa_origin.is_some()
    }

    /// Covered by a ROA that allows the prefix to be routed at all
    pub fn roa_routed(&self) -> bool {
        self.roa_origin.map_or(false, |origin| origin != 0)
    }

    pub fn invalid_by_roa(&self) -> bool {
        match self.roa_origin {
            Some(roa_origin) => {
                self.origin() != Some(roa_origin) || self.roa_valid_length == Some(false)
            }
            None => false,
        }
    }

    pub fn valid_by_roa(&self) -> bool {
        self.roa_origin.is_some()
            && self.origin() == self.roa_origin
            && self.roa_valid_length == Some(true)
    }

    pub fn unknown_by_roa(&self) -> bool {
        !self.covered_by_roa()
    }

    /// BGPsec signatures are intact and addressed to `asn`
    pub fn bgpsec_valid(&self, asn: ASN) -> bool {
        self.bgpsec_next_asn == Some(asn)
            && self.bgpsec_as_path.as_deref() == Some(self.as_path.as_slice())
    }

    pub fn prefix_path_attributes_eq(&self, other: &Announcement) -> bool {
        self.prefix == other.prefix && self.as_path == other.as_path
    }

    /// Local RIB copy at `asn`: own ASN prepended, seed cleared.
    /// Received announcements keep `next_hop_asn` pointing at the sender.
    pub fn copy_and_process(&self, asn: ASN) -> Self {
        let mut as_path = Vec::with_capacity(self.as_path.len() + 1);
        as_path.push(asn);
        as_path.extend_from_slice(&self.as_path);
        Announcement {
            as_path,
            seed_asn: None,
            ..self.clone()
        }
    }

    /// Copy of a local RIB entry as it arrives at a neighbor reached over `send_rel`
    pub fn copy_for_neighbor(&self, sender: ASN, send_rel: Relationships) -> Self {
        Announcement {
            next_hop_asn: sender,
            seed_asn: None,
            recv_relationship: send_rel.invert(),
            ..self.clone()
        }
    }

    /// Withdrawal cancelling this announcement
    pub fn withdrawal(&self) -> Self {
        Announcement {
            withdraw: true,
            ..self.clone()
        }
    }
}

impl PartialEq for Announcement {
    fn eq(&self, other: &Self) -> bool {
        self.prefix_path_attributes_eq(other)
    }
}

impl Eq for Announcement {}

impl Hash for Announcement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.prefix.hash(state);
        self.as_path.hash(state);
    }
}

impl fmt::Display for Announcement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?} {}", self.prefix, self.as_path, self.recv_relationship)
    }
}
