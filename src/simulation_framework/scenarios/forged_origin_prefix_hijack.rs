use std::collections::BTreeSet;

use crate::as_graphs::as_graph::ASN;
use crate::route_validator::ROA;
use crate::shared::{Timestamps, PREFIX};
use crate::simulation_engine::{Announcement, Prefix};
use crate::simulation_framework::scenario::ScenarioTrait;

/// Attackers announce the victims' prefix with a victim appended as origin,
/// so the route passes ROV but the path is a lie.
pub struct ForgedOriginPrefixHijack;

impl ScenarioTrait for ForgedOriginPrefixHijack {
    fn name(&self) -> &'static str {
        "ForgedOriginPrefixHijack"
    }

    fn seed_announcements(
        &self,
        attacker_asns: &BTreeSet<ASN>,
        victim_asns: &BTreeSet<ASN>,
    ) -> Vec<(ASN, Announcement)> {
        let mut seeds: Vec<(ASN, Announcement)> = victim_asns
            .iter()
            .map(|&asn| (asn, Announcement::new(*PREFIX, vec![asn], Timestamps::Victim)))
            .collect();
        if let Some(&victim) = victim_asns.iter().next() {
            seeds.extend(attacker_asns.iter().map(|&asn| {
                (asn, Announcement::new(*PREFIX, vec![asn, victim], Timestamps::Attacker))
            }));
        }
        seeds
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
