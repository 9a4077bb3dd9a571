use std::collections::BTreeSet;

use crate::as_graphs::as_graph::ASN;
use crate::route_validator::ROA;
use crate::shared::{Timestamps, PREFIX};
use crate::simulation_engine::{Announcement, Prefix};
use crate::simulation_framework::scenario::ScenarioTrait;

/// Attackers announce a prefix whose ROA (origin 0) says it is never routed.
/// There is no victim.
pub struct NonRoutedPrefixHijack;

impl ScenarioTrait for NonRoutedPrefixHijack {
    fn name(&self) -> &'static str {
        "NonRoutedPrefixHijack"
    }

    fn uses_victims(&self) -> bool {
        false
    }

    fn seed_announcements(
        &self,
        attacker_asns: &BTreeSet<ASN>,
        _victim_asns: &BTreeSet<ASN>,
    ) -> Vec<(ASN, Announcement)> {
        attacker_asns
            .iter()
            .map(|&asn| (asn, Announcement::new(*PREFIX, vec![asn], Timestamps::Attacker)))
            .collect()
    }

    fn roas(&self, _attacker_asns: &BTreeSet<ASN>, _victim_asns: &BTreeSet<ASN>) -> Vec<ROA> {
        vec![ROA::new(*PREFIX, 0, None)]
    }

    fn relevant_prefixes(&self) -> Vec<Prefix> {
        vec![*PREFIX]
    }
}
