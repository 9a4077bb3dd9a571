use std::fmt;
use std::net::IpAddr;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::as_graphs::as_graph::ASN;
use crate::simulation_engine::announcement::Prefix;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Relationships {
    Providers = 1,
    Peers = 2,
    Customers = 3,
    Origin = 4,
}

impl Relationships {
    pub fn invert(&self) -> Self {
        match self {
            Relationships::Providers => Relationships::Customers,
            Relationships::Customers => Relationships::Providers,
            Relationships::Peers => Relationships::Peers,
            Relationships::Origin => Relationships::Origin,
        }
    }

    /// Gao-Rexford preference, higher is better
    pub fn preference(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for Relationships {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Relationships::Providers => "PROVIDERS",
            Relationships::Peers => "PEERS",
            Relationships::Customers => "CUSTOMERS",
            Relationships::Origin => "ORIGIN",
        };
        write!(f, "{}", s)
    }
}

/// Topology buckets used to stratify outcome metrics.
///
/// Every AS belongs to exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ASNGroups {
    InputClique,
    StubsOrMh,
    Etc,
}

impl ASNGroups {
    pub const ALL: [ASNGroups; 3] = [ASNGroups::InputClique, ASNGroups::StubsOrMh, ASNGroups::Etc];
}

impl fmt::Display for ASNGroups {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ASNGroups::InputClique => "INPUT_CLIQUE",
            ASNGroups::StubsOrMh => "STUBS_OR_MH",
            ASNGroups::Etc => "ETC",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ROAValidity {
    Valid = 0,
    Unknown = 1,
    InvalidLength = 2,
    InvalidOrigin = 3,
    InvalidLengthAndOrigin = 4,
}

impl ROAValidity {
    pub fn is_invalid(&self) -> bool {
        matches!(
            self,
            ROAValidity::InvalidLength
                | ROAValidity::InvalidOrigin
                | ROAValidity::InvalidLengthAndOrigin
        )
    }
}

impl fmt::Display for ROAValidity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ROAValidity::Valid => "VALID",
            ROAValidity::Unknown => "UNKNOWN",
            ROAValidity::InvalidLength => "INVALID_LENGTH",
            ROAValidity::InvalidOrigin => "INVALID_ORIGIN",
            ROAValidity::InvalidLengthAndOrigin => "INVALID_LENGTH_AND_ORIGIN",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ROARouted {
    Routed = 0,
    Unknown = 1,
    NonRouted = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Timestamps {
    Victim = 0,
    Attacker = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Outcomes {
    AttackerSuccess = 0,
    VictimSuccess = 1,
    Disconnected = 2,
}

impl Outcomes {
    pub const ALL: [Outcomes; 3] = [
        Outcomes::AttackerSuccess,
        Outcomes::VictimSuccess,
        Outcomes::Disconnected,
    ];
}

impl fmt::Display for Outcomes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcomes::AttackerSuccess => "ATTACKER_SUCCESS",
            Outcomes::VictimSuccess => "VICTIM_SUCCESS",
            Outcomes::Disconnected => "DISCONNECTED",
        };
        write!(f, "{}", s)
    }
}

/// Which view of routing an outcome was measured on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Plane {
    ControlPlane,
    DataPlane,
}

impl fmt::Display for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plane::ControlPlane => write!(f, "CONTROL_PLANE"),
            Plane::DataPlane => write!(f, "DATA_PLANE"),
        }
    }
}

/// Adopting split of a metric. `Notapplicable` counts every AS regardless of adoption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InAdoptingASNs {
    True,
    False,
    Notapplicable,
}

impl fmt::Display for InAdoptingASNs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InAdoptingASNs::True => "TRUE",
            InAdoptingASNs::False => "FALSE",
            InAdoptingASNs::Notapplicable => "NOT_APPLICABLE",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommonASNs;

impl CommonASNs {
    pub const ATTACKER: ASN = 666;
    pub const VICTIM: ASN = 777;
}

lazy_static! {
    pub static ref SUPERPREFIX: Prefix = "1.0.0.0/8".parse().unwrap();
    pub static ref PREFIX: Prefix = "1.2.0.0/16".parse().unwrap();
    pub static ref SUBPREFIX: Prefix = "1.2.3.0/24".parse().unwrap();
    /// Destination used for outcome classification, inside every prefix above
    pub static ref DEST_IP_ADDR: IpAddr = "1.2.3.4".parse().unwrap();
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("AS {0} is not in the AS graph")]
    UnknownAsn(ASN),

    #[error("AS {0} lists itself as a neighbor")]
    SelfLink(ASN),

    #[error("AS {asn} lists AS {neighbor} among its {relationship} but the reverse link is missing")]
    AsymmetricRelationship {
        asn: ASN,
        neighbor: ASN,
        relationship: Relationships,
    },

    #[error("customer-provider cycle in the AS graph involving AS {0}")]
    Cycle(ASN),

    #[error("AS {asn} is in both the {first} and {second} subgraphs")]
    SubgraphsOverlap {
        asn: ASN,
        first: ASNGroups,
        second: ASNGroups,
    },

    #[error("AS {0} is not in any subgraph")]
    SubgraphsIncomplete(ASN),

    #[error("invalid scenario config '{label}': {reason}")]
    InvalidConfig { label: String, reason: String },

    #[error("AS {asn} already has a local RIB entry for {prefix}")]
    DuplicateLocalRibEntry { asn: ASN, prefix: Prefix },

    #[error("unknown policy '{0}'")]
    UnknownPolicy(String),

    #[error("unknown scenario '{0}'")]
    UnknownScenario(String),

    #[error("malformed AS relationship line {line}: '{content}'")]
    MalformedTopology { line: usize, content: String },

    #[error("worker chunk {chunk} failed: {reason}")]
    ChunkFailed { chunk: usize, reason: String },

    #[error("could not start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("bad progress bar template: {0}")]
    Template(#[from] indicatif::style::TemplateError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimulationError {
    pub fn config(label: &str, reason: impl Into<String>) -> Self {
        SimulationError::InvalidConfig {
            label: label.to_string(),
            reason: reason.into(),
        }
    }
}
