pub mod policy_extensions;

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::as_graphs::as_graph::{ASGraph, AS, ASN};
use crate::shared::{Relationships, SimulationError};
use crate::simulation_engine::announcement::Announcement;

use self::policy_extensions::{aspa, bgp, bgpsec, path_end, peer_rov, rov};

/// Everything a policy may consult while judging an announcement at one AS
#[derive(Clone, Copy)]
pub struct ValidationContext<'a> {
    pub as_obj: &'a AS,
    pub as_graph: &'a ASGraph,
    pub policies: &'a PolicyAssignment,
}

/// Outcome of running the decision process on one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Replace,
    Keep,
    Reject,
}

/// One validity predicate plus its optional hooks.
///
/// Extensions are stateless; all per-AS data comes through the context.
pub trait PolicyExtension: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the (unprocessed) announcement may be selected at all
    fn validate_announcement(&self, _ann: &Announcement, _ctx: &ValidationContext) -> bool {
        true
    }

    /// Security preference between equally related routes, consulted before
    /// path length.
    /// `Less` means `ann1` is preferred.
    fn compare_security(
        &self,
        _ann1: &Announcement,
        _ann2: &Announcement,
        _ctx: &ValidationContext,
    ) -> Ordering {
        Ordering::Equal
    }

    /// Adjusts the local RIB copy once `unprocessed` has been selected
    fn process_announcement(
        &self,
        _unprocessed: &Announcement,
        _processed: &mut Announcement,
        _ctx: &ValidationContext,
    ) {
    }

    /// Adjusts an outgoing copy right before it is queued for `neighbor`
    fn prepare_to_send(&self, _ann: &mut Announcement, _sender: ASN, _neighbor: ASN) {}
}

/// Validity predicate tags, declared in evaluation order.
///
/// A policy variant is a chain of these; the chain is always walked in this
/// order no matter how the variant lists them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[repr(u32)]
pub enum Settings {
    BaseDefense = 0,
    Rov = 1,
    PeerRov = 2,
    PathEnd = 3,
    Aspa = 4,
    Bgpsec = 5,
}

impl Settings {
    pub fn extension(self) -> &'static dyn PolicyExtension {
        match self {
            Settings::BaseDefense => &bgp::BGPPolicy,
            Settings::Rov => &rov::ROVPolicy,
            Settings::PeerRov => &peer_rov::PeerROVPolicy,
            Settings::PathEnd => &path_end::PathEndPolicy,
            Settings::Aspa => &aspa::ASPAPolicy,
            Settings::Bgpsec => &bgpsec::BGPSecPolicy,
        }
    }
}

/// Closed set of named policy variants an AS can run
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub enum PolicyKind {
    #[default]
    Bgp,
    Rov,
    PeerRov,
    PathEnd,
    Aspa,
    RovAspa,
    Bgpsec,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 7] = [
        PolicyKind::Bgp,
        PolicyKind::Rov,
        PolicyKind::PeerRov,
        PolicyKind::PathEnd,
        PolicyKind::Aspa,
        PolicyKind::RovAspa,
        PolicyKind::Bgpsec,
    ];

    /// Stable name used in configs and metric keys
    pub fn name(&self) -> &'static str {
        match self {
            PolicyKind::Bgp => "BGP",
            PolicyKind::Rov => "ROV",
            PolicyKind::PeerRov => "PeerROV",
            PolicyKind::PathEnd => "PathEnd",
            PolicyKind::Aspa => "ASPA",
            PolicyKind::RovAspa => "ROV+ASPA",
            PolicyKind::Bgpsec => "BGPSec",
        }
    }

    /// Predicate chain, already in `Settings` order
    pub fn settings(&self) -> &'static [Settings] {
        match self {
            PolicyKind::Bgp => &[Settings::BaseDefense],
            PolicyKind::Rov => &[Settings::BaseDefense, Settings::Rov],
            PolicyKind::PeerRov => &[Settings::BaseDefense, Settings::PeerRov],
            PolicyKind::PathEnd => &[Settings::BaseDefense, Settings::Rov, Settings::PathEnd],
            PolicyKind::Aspa => &[Settings::BaseDefense, Settings::Aspa],
            PolicyKind::RovAspa => &[Settings::BaseDefense, Settings::Rov, Settings::Aspa],
            PolicyKind::Bgpsec => &[Settings::BaseDefense, Settings::Bgpsec],
        }
    }

    pub fn adopts(&self, setting: Settings) -> bool {
        self.settings().contains(&setting)
    }

    fn extensions(&self) -> impl Iterator<Item = &'static dyn PolicyExtension> {
        self.settings().iter().map(|setting| setting.extension())
    }

    pub fn valid_ann(&self, ann: &Announcement, ctx: &ValidationContext) -> bool {
        self.extensions().all(|ext| {
            let valid = ext.validate_announcement(ann, ctx);
            if !valid {
                log::trace!("AS {} {} rejected {}", ctx.as_obj.asn, ext.name(), ann);
            }
            valid
        })
    }

    /// Total order over valid candidates; `Less` means `ann1` wins.
    ///
    /// Relationship first, then security preferences, then path length, then
    /// the lower next-hop ASN.
    pub fn compare(
        &self,
        ann1: &Announcement,
        ann2: &Announcement,
        ctx: &ValidationContext,
    ) -> Ordering {
        relationship_compare(ann1, ann2)
            .then_with(|| {
                self.extensions()
                    .map(|ext| ext.compare_security(ann1, ann2, ctx))
                    .find(|ordering| *ordering != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| path_compare(ann1, ann2))
    }

    pub fn decide(
        &self,
        candidate: &Announcement,
        current: Option<&Announcement>,
        ctx: &ValidationContext,
    ) -> Decision {
        if !self.valid_ann(candidate, ctx) {
            return Decision::Reject;
        }
        match current {
            None => Decision::Replace,
            Some(current) => match self.compare(candidate, current, ctx) {
                Ordering::Less => Decision::Replace,
                _ => Decision::Keep,
            },
        }
    }

    pub fn process_announcement(
        &self,
        unprocessed: &Announcement,
        processed: &mut Announcement,
        ctx: &ValidationContext,
    ) {
        for ext in self.extensions() {
            ext.process_announcement(unprocessed, processed, ctx);
        }
    }

    pub fn prepare_to_send(&self, ann: &mut Announcement, sender: ASN, neighbor: ASN) {
        for ext in self.extensions() {
            ext.prepare_to_send(ann, sender, neighbor);
        }
    }

    /// Gao-Rexford export rule
    pub fn should_propagate(&self, ann: &Announcement, send_relationship: Relationships) -> bool {
        match ann.recv_relationship {
            Relationships::Origin | Relationships::Customers => true,
            Relationships::Peers | Relationships::Providers => {
                send_relationship == Relationships::Customers
            }
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for PolicyKind {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PolicyKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| SimulationError::UnknownPolicy(s.to_string()))
    }
}

/// Relationship, then shorter path, then lower next hop
pub fn gao_rexford_compare(ann1: &Announcement, ann2: &Announcement) -> Ordering {
    relationship_compare(ann1, ann2).then_with(|| path_compare(ann1, ann2))
}

fn relationship_compare(ann1: &Announcement, ann2: &Announcement) -> Ordering {
    ann2.recv_relationship
        .preference()
        .cmp(&ann1.recv_relationship.preference())
}

fn path_compare(ann1: &Announcement, ann2: &Announcement) -> Ordering {
    ann1.as_path
        .len()
        .cmp(&ann2.as_path.len())
        .then_with(|| ann1.next_hop_asn.cmp(&ann2.next_hop_asn))
}

/// ASN -> policy variant, with a default for everyone else.
///
/// This is the only policy configuration the engine reads. It lives outside
/// the topology so trials never mutate the shared graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyAssignment {
    pub default: PolicyKind,
    overrides: HashMap<ASN, PolicyKind>,
}

impl PolicyAssignment {
    pub fn new(default: PolicyKind) -> Self {
        PolicyAssignment {
            default,
            overrides: HashMap::new(),
        }
    }

    pub fn with_policy(mut self, asn: ASN, kind: PolicyKind) -> Self {
        self.set_policy(asn, kind);
        self
    }

    pub fn set_policy(&mut self, asn: ASN, kind: PolicyKind) {
        self.overrides.insert(asn, kind);
    }

    pub fn policy_for(&self, asn: ASN) -> PolicyKind {
        self.overrides.get(&asn).copied().unwrap_or(self.default)
    }

    /// Overrides sorted by ASN
    pub fn overrides(&self) -> BTreeMap<ASN, PolicyKind> {
        self.overrides.iter().map(|(&asn, &kind)| (asn, kind)).collect()
    }
}
