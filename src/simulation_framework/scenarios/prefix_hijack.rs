use std::collections::BTreeSet;

use crate::as_graphs::as_graph::ASN;
use crate::route_validator::ROA;
use crate::shared::{Timestamps, PREFIX};
use crate::simulation_engine::{Announcement, Prefix};
use crate::simulation_framework::scenario::ScenarioTrait;

/// Attackers originate exactly the victims' prefix
pub struct PrefixHijack;

impl ScenarioTrait for PrefixHijack {
    fn name(&self) -> &'static str {
        "PrefixHijack"
    }

    fn seed_announcements(
        &self,
        attacker_asns: &BTreeSet<ASN>,
        victim_asns: &BTreeSet<ASN>,
    ) -> Vec<(ASN, Announcement)> {
        victim_asns
            .iter()
            .map(|&asn| (asn, Announcement::new(*PREFIX, vec![asn], Timestamps::Victim)))
            .chain(
                attacker_asns
                    .iter()
                    .map(|&asn| (asn, Announcement::new(*PREFIX, vec![asn], Timestamps::Attacker))),
            )
            .collect()
    }

    fn roas(&self, _attacker_asns: &BTreeSet<ASN>, victim_asns: &BTreeSet<ASN>) -> Vec<ROA> {
        victim_asns
            .iter()
            .map(|&asn| ROA::new(*PREFIX, asn, None))
            .collect()
    }

    fn relevant_prefixes(&self) -> Vec<Prefix> {
        vec![*PREFIX]
    }
}
