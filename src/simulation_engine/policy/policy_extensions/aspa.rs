use crate::as_graphs::as_graph::ASN;
use crate::shared::Relationships;
use crate::simulation_engine::announcement::Announcement;
use crate::simulation_engine::policy::{PolicyExtension, Settings, ValidationContext};

/// Result of checking one hop of a path against the customer's ASPA record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HopCheck {
    ProviderPlus,
    NotProviderPlus,
    NoAttestation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ASPAValidity {
    Valid,
    Unknown,
    Invalid,
}

/// ASPA path verification.
///
/// An AS "has an ASPA record" when it runs a policy that includes ASPA; the
/// record lists exactly its providers in the topology.
#[derive(Debug, Clone)]
pub struct ASPAPolicy;

impl ASPAPolicy {
    /// Is `provider` attested as a provider of `customer`
    pub fn hop_check(customer: ASN, provider: ASN, ctx: &ValidationContext) -> HopCheck {
        if !ctx.policies.policy_for(customer).adopts(Settings::Aspa) {
            return HopCheck::NoAttestation;
        }
        match ctx.as_graph.get(&customer) {
            Some(customer_as) if customer_as.providers.binary_search(&provider).is_ok() => {
                HopCheck::ProviderPlus
            }
            Some(_) => HopCheck::NotProviderPlus,
            None => HopCheck::NoAttestation,
        }
    }

    /// Path from origin to the neighbor with consecutive duplicates removed
    fn origin_first_path(ann: &Announcement) -> Vec<ASN> {
        let mut path: Vec<ASN> = ann.as_path.iter().rev().copied().collect();
        path.dedup();
        path
    }

    /// Route received from a customer or peer: every hop must go up
    pub fn verify_upstream(path: &[ASN], ctx: &ValidationContext) -> ASPAValidity {
        if path.len() <= 1 {
            return ASPAValidity::Valid;
        }
        let mut unknown = false;
        for hop in path.windows(2) {
            match Self::hop_check(hop[0], hop[1], ctx) {
                HopCheck::NotProviderPlus => return ASPAValidity::Invalid,
                HopCheck::NoAttestation => unknown = true,
                HopCheck::ProviderPlus => {}
            }
        }
        if unknown {
            ASPAValidity::Unknown
        } else {
            ASPAValidity::Valid
        }
    }

    /// Route received from a provider: an up ramp from the origin, an
    /// optional single peering hop, then a down ramp to us.
    pub fn verify_downstream(path: &[ASN], ctx: &ValidationContext) -> ASPAValidity {
        let n = path.len();
        if n <= 2 {
            return ASPAValidity::Valid;
        }

        // Up ramp lengths, counting ASes from the origin
        let mut max_up = n;
        let mut min_up = n;
        let mut found_min = false;
        for i in 0..n - 1 {
            match Self::hop_check(path[i], path[i + 1], ctx) {
                HopCheck::NotProviderPlus => {
                    max_up = i + 1;
                    if !found_min {
                        min_up = max_up;
                    }
                    break;
                }
                HopCheck::NoAttestation if !found_min => {
                    min_up = i + 1;
                    found_min = true;
                }
                _ => {}
            }
        }

        // Down ramp lengths, counting ASes from the neighbor
        let mut max_down = n;
        let mut min_down = n;
        let mut found_min = false;
        for j in (1..n).rev() {
            match Self::hop_check(path[j], path[j - 1], ctx) {
                HopCheck::NotProviderPlus => {
                    max_down = n - j;
                    if !found_min {
                        min_down = max_down;
                    }
                    break;
                }
                HopCheck::NoAttestation if !found_min => {
                    min_down = n - j;
                    found_min = true;
                }
                _ => {}
            }
        }

        if max_up + max_down < n {
            ASPAValidity::Invalid
        } else if min_up + min_down < n {
            ASPAValidity::Unknown
        } else {
            ASPAValidity::Valid
        }
    }

    pub fn validity(ann: &Announcement, ctx: &ValidationContext) -> ASPAValidity {
        let path = Self::origin_first_path(ann);
        match ann.recv_relationship {
            Relationships::Providers => Self::verify_downstream(&path, ctx),
            _ => Self::verify_upstream(&path, ctx),
        }
    }
}

impl PolicyExtension for ASPAPolicy {
    fn name(&self) -> &'static str {
        "ASPA"
    }

    fn validate_announcement(&self, ann: &Announcement, ctx: &ValidationContext) -> bool {
        if ann.as_path.first() != Some(&ann.next_hop_asn) {
            return false;
        }
        Self::validity(ann, ctx) != ASPAValidity::Invalid
    }
}
