use std::collections::BTreeSet;

use crate::as_graphs::as_graph::ASN;
use crate::route_validator::ROA;
use crate::shared::{Timestamps, PREFIX, SUBPREFIX};
use crate::simulation_engine::{Announcement, Prefix};
use crate::simulation_framework::scenario::ScenarioTrait;

/// Subprefix hijack scenario.
/// Victims originate the prefix; attackers originate a more specific one
/// that the victims' ROA does not allow.
pub struct SubprefixHijack;

impl ScenarioTrait for SubprefixHijack {
    fn name(&self) -> &'static str {
        "SubprefixHijack"
    }

    fn seed_announcements(
        &self,
        attacker_asns: &BTreeSet<ASN>,
        victim_asns: &BTreeSet<ASN>,
    ) -> Vec<(ASN, Announcement)> {
        let victims = victim_asns
            .iter()
            .map(|&asn| (asn, Announcement::new(*PREFIX, vec![asn], Timestamps::Victim)));
        let attackers = attacker_asns
            .iter()
            .map(|&asn| (asn, Announcement::new(*SUBPREFIX, vec![asn], Timestamps::Attacker)));
        victims.chain(attackers).collect()
    }

    fn roas(&self, _attacker_asns: &BTreeSet<ASN>, victim_asns: &BTreeSet<ASN>) -> Vec<ROA> {
        victim_asns
            .iter()
            .map(|&asn| ROA::new(*PREFIX, asn, None))
            .collect()
    }

    fn relevant_prefixes(&self) -> Vec<Prefix> {
        vec![*PREFIX, *SUBPREFIX]
    }
}
