use std::collections::{BTreeSet, HashMap};

use crate::as_graphs::as_graph::ASN;
use crate::simulation_engine::policy::PolicyKind;
use crate::simulation_framework::scenario::ScenarioKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioConfig {
    /// Label for this scenario configuration, used as the metric key
    pub label: String,

    pub scenario: ScenarioKind,

    /// Policy of every AS that is not adopting
    pub base_policy: PolicyKind,

    /// Policy of adopting ASes
    pub adopt_policy: PolicyKind,

    pub num_attackers: usize,

    /// Rounds to propagate; raised to the scenario's minimum if lower
    pub propagation_rounds: u32,

    /// Override attacker ASNs (if None, will be randomly selected)
    pub override_attacker_asns: Option<BTreeSet<ASN>>,

    /// Override victim ASNs (if None, will be randomly selected)
    pub override_victim_asns: Option<BTreeSet<ASN>>,

    /// Override adopting ASNs (if None, will be randomly selected based on percentage)
    pub override_adopting_asns: Option<BTreeSet<ASN>>,

    /// Applied after adoption, so these win over everything else
    pub hardcoded_asn_policies: HashMap<ASN, PolicyKind>,
}

impl ScenarioConfig {
    pub fn new(label: &str, scenario: ScenarioKind) -> Self {
        ScenarioConfig {
            label: label.to_string(),
            scenario,
            base_policy: PolicyKind::Bgp,
            adopt_policy: PolicyKind::Rov,
            num_attackers: 1,
            propagation_rounds: scenario.min_propagation_rounds(),
            override_attacker_asns: None,
            override_victim_asns: None,
            override_adopting_asns: None,
            hardcoded_asn_policies: HashMap::new(),
        }
    }

    pub fn with_base_policy(mut self, policy: PolicyKind) -> Self {
        self.base_policy = policy;
        self
    }

    pub fn with_adopt_policy(mut self, policy: PolicyKind) -> Self {
        self.adopt_policy = policy;
        self
    }

    pub fn with_num_attackers(mut self, num_attackers: usize) -> Self {
        self.num_attackers = num_attackers;
        self
    }

    pub fn with_propagation_rounds(mut self, rounds: u32) -> Self {
        self.propagation_rounds = rounds;
        self
    }

    pub fn with_attacker_asns(mut self, asns: impl IntoIterator<Item = ASN>) -> Self {
        self.override_attacker_asns = Some(asns.into_iter().collect());
        self
    }

    pub fn with_victim_asns(mut self, asns: impl IntoIterator<Item = ASN>) -> Self {
        self.override_victim_asns = Some(asns.into_iter().collect());
        self
    }

    pub fn with_adopting_asns(mut self, asns: impl IntoIterator<Item = ASN>) -> Self {
        self.override_adopting_asns = Some(asns.into_iter().collect());
        self
    }

    pub fn with_asn_policy(mut self, asn: ASN, policy: PolicyKind) -> Self {
        self.hardcoded_asn_policies.insert(asn, policy);
        self
    }

    /// Rounds actually run
    pub fn rounds(&self) -> u32 {
        self.propagation_rounds
            .max(self.scenario.min_propagation_rounds())
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        ScenarioConfig::new("SubprefixHijack ROV", ScenarioKind::SubprefixHijack)
    }
}
