use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::as_graphs::as_graph::{ASGraph, ASN};
use crate::route_validator::{RouteValidator, ROA};
use crate::shared::{ASNGroups, Outcomes, Relationships, SimulationError, DEST_IP_ADDR};
use crate::simulation_engine::announcement::{Announcement, Prefix};
use crate::simulation_engine::policy::PolicyAssignment;
use crate::simulation_engine::ribs::LocalRIB;
use crate::simulation_engine::SimulationEngine;
use crate::simulation_framework::scenario_config::ScenarioConfig;
use crate::simulation_framework::scenarios::{
    ForgedOriginPrefixHijack, LegitimatePrefixOnly, NonRoutedPrefixHijack, PrefixHijack,
    SubprefixHijack,
};

/// What distinguishes one attack from another: which prefixes get seeded
/// where, and which ROAs exist.
pub trait ScenarioTrait: Send + Sync {
    fn name(&self) -> &'static str;

    /// Minimum number of propagation rounds for this scenario
    fn min_propagation_rounds(&self) -> u32 {
        1
    }

    fn uses_attackers(&self) -> bool {
        true
    }

    fn uses_victims(&self) -> bool {
        true
    }

    /// Seeds before ROA annotation, as (seeding ASN, announcement)
    fn seed_announcements(
        &self,
        attacker_asns: &BTreeSet<ASN>,
        victim_asns: &BTreeSet<ASN>,
    ) -> Vec<(ASN, Announcement)>;

    fn roas(&self, attacker_asns: &BTreeSet<ASN>, victim_asns: &BTreeSet<ASN>) -> Vec<ROA>;

    /// Prefixes looked at when classifying control plane outcomes
    fn relevant_prefixes(&self) -> Vec<Prefix>;

    fn dest_ip_addr(&self) -> IpAddr {
        *DEST_IP_ADDR
    }
}

/// Closed set of scenarios selectable by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScenarioKind {
    SubprefixHijack,
    PrefixHijack,
    NonRoutedPrefixHijack,
    ForgedOriginPrefixHijack,
    LegitimatePrefixOnly,
}

impl ScenarioKind {
    pub const ALL: [ScenarioKind; 5] = [
        ScenarioKind::SubprefixHijack,
        ScenarioKind::PrefixHijack,
        ScenarioKind::NonRoutedPrefixHijack,
        ScenarioKind::ForgedOriginPrefixHijack,
        ScenarioKind::LegitimatePrefixOnly,
    ];

    pub fn implementation(&self) -> &'static dyn ScenarioTrait {
        match self {
            ScenarioKind::SubprefixHijack => &SubprefixHijack,
            ScenarioKind::PrefixHijack => &PrefixHijack,
            ScenarioKind::NonRoutedPrefixHijack => &NonRoutedPrefixHijack,
            ScenarioKind::ForgedOriginPrefixHijack => &ForgedOriginPrefixHijack,
            ScenarioKind::LegitimatePrefixOnly => &LegitimatePrefixOnly,
        }
    }

    pub fn name(&self) -> &'static str {
        self.implementation().name()
    }

    pub fn min_propagation_rounds(&self) -> u32 {
        self.implementation().min_propagation_rounds()
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ScenarioKind {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("ValidPrefix") {
            return Ok(ScenarioKind::LegitimatePrefixOnly);
        }
        ScenarioKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| SimulationError::UnknownScenario(s.to_string()))
    }
}

/// Everything fixed for one trial before propagation starts
#[derive(Debug, Clone)]
pub struct Scenario {
    pub config: ScenarioConfig,
    pub percent_adoption: u32,
    pub attacker_asns: BTreeSet<ASN>,
    pub victim_asns: BTreeSet<ASN>,
    pub adopting_asns: BTreeSet<ASN>,
    pub policies: PolicyAssignment,
    pub roas: Vec<ROA>,
    /// ROA-annotated seeds
    pub seed_announcements: Vec<(ASN, Announcement)>,
    pub dest_ip_addr: IpAddr,
}

impl Scenario {
    /// Draws attackers, victims and adopters, then builds the seeds.
    ///
    /// All configuration problems surface here, before any propagation.
    pub fn new<R: Rng + ?Sized>(
        config: &ScenarioConfig,
        as_graph: &ASGraph,
        percent_adoption: u32,
        rng: &mut R,
    ) -> Result<Self, SimulationError> {
        if percent_adoption > 100 {
            return Err(SimulationError::config(
                &config.label,
                format!("percent adoption {} is above 100", percent_adoption),
            ));
        }
        let kind = config.scenario.implementation();

        let attacker_asns = Self::select_attackers(config, as_graph, rng)?;
        let victim_asns = Self::select_victims(config, as_graph, &attacker_asns, rng)?;
        if let Some(asn) = attacker_asns.intersection(&victim_asns).next() {
            return Err(SimulationError::config(
                &config.label,
                format!("AS {} is both an attacker and a victim", asn),
            ));
        }

        let adopting_asns = match &config.override_adopting_asns {
            Some(asns) => {
                check_in_graph(as_graph, asns)?;
                asns.clone()
            }
            None => Self::select_adopters(
                config,
                as_graph,
                percent_adoption,
                &attacker_asns,
                &victim_asns,
                rng,
            ),
        };
        if adopting_asns.is_empty() {
            return Err(SimulationError::config(&config.label, "adopting ASN set is empty"));
        }

        let mut policies = PolicyAssignment::new(config.base_policy);
        for &asn in &adopting_asns {
            policies.set_policy(asn, config.adopt_policy);
        }
        for (&asn, &policy) in &config.hardcoded_asn_policies {
            policies.set_policy(asn, policy);
        }

        let roas = kind.roas(&attacker_asns, &victim_asns);
        let route_validator = RouteValidator::from_roas(roas.iter().cloned());
        let seed_announcements = kind
            .seed_announcements(&attacker_asns, &victim_asns)
            .into_iter()
            .map(|(asn, mut ann)| {
                route_validator.annotate(&mut ann);
                (asn, ann)
            })
            .collect();

        log::debug!(
            "{} at {}%: attackers {:?}, victims {:?}, {} adopters",
            config.label,
            percent_adoption,
            attacker_asns,
            victim_asns,
            adopting_asns.len()
        );

        Ok(Scenario {
            config: config.clone(),
            percent_adoption,
            attacker_asns,
            victim_asns,
            adopting_asns,
            policies,
            roas,
            seed_announcements,
            dest_ip_addr: kind.dest_ip_addr(),
        })
    }

    fn select_attackers<R: Rng + ?Sized>(
        config: &ScenarioConfig,
        as_graph: &ASGraph,
        rng: &mut R,
    ) -> Result<BTreeSet<ASN>, SimulationError> {
        if let Some(asns) = &config.override_attacker_asns {
            check_in_graph(as_graph, asns)?;
            return Ok(asns.clone());
        }
        if !config.scenario.implementation().uses_attackers() {
            return Ok(BTreeSet::new());
        }
        let candidates: Vec<ASN> = as_graph
            .asn_group(ASNGroups::StubsOrMh)
            .iter()
            .copied()
            .collect();
        sample(config, candidates, config.num_attackers, "attackers", rng)
    }

    fn select_victims<R: Rng + ?Sized>(
        config: &ScenarioConfig,
        as_graph: &ASGraph,
        attacker_asns: &BTreeSet<ASN>,
        rng: &mut R,
    ) -> Result<BTreeSet<ASN>, SimulationError> {
        if let Some(asns) = &config.override_victim_asns {
            check_in_graph(as_graph, asns)?;
            return Ok(asns.clone());
        }
        if !config.scenario.implementation().uses_victims() {
            return Ok(BTreeSet::new());
        }
        let candidates: Vec<ASN> = as_graph
            .asn_group(ASNGroups::StubsOrMh)
            .iter()
            .copied()
            .filter(|asn| !attacker_asns.contains(asn))
            .collect();
        sample(config, candidates, 1, "victims", rng)
    }

    /// Per subgraph: `possible * percent / 100`, rounded up to 1 when it
    /// floors to 0, otherwise lowered to `possible - 1` when it would cover
    /// the whole subgraph. Victims always adopt and attackers never do.
    ///
    /// A subgraph with a single eligible AS therefore adopts below 100% and
    /// does not adopt at 100%.
    fn select_adopters<R: Rng + ?Sized>(
        config: &ScenarioConfig,
        as_graph: &ASGraph,
        percent_adoption: u32,
        attacker_asns: &BTreeSet<ASN>,
        victim_asns: &BTreeSet<ASN>,
        rng: &mut R,
    ) -> BTreeSet<ASN> {
        let mut adopting = BTreeSet::new();
        for group in ASNGroups::ALL {
            let possible: Vec<ASN> = as_graph
                .asn_group(group)
                .iter()
                .copied()
                .filter(|asn| !attacker_asns.contains(asn) && !victim_asns.contains(asn))
                .collect();
            if possible.is_empty() {
                continue;
            }
            let mut k = possible.len() * percent_adoption as usize / 100;
            if k == 0 {
                log::debug!(
                    "{}: {}% of {} {} ASes rounds to 0, adopting 1",
                    config.label,
                    percent_adoption,
                    possible.len(),
                    group
                );
                k = 1;
            } else if k == possible.len() {
                // With one eligible AS this leaves the subgraph without adopters
                log::debug!(
                    "{}: {}% covers all {} {} ASes, leaving one non-adopting",
                    config.label,
                    percent_adoption,
                    possible.len(),
                    group
                );
                k -= 1;
            }
            adopting.extend(possible.choose_multiple(rng, k).copied());
        }
        adopting.extend(victim_asns.iter().copied());
        adopting
    }

    pub fn is_adopting(&self, asn: ASN) -> bool {
        self.adopting_asns.contains(&asn)
    }

    /// Attackers and victims are excluded from metrics
    pub fn is_uninvolved(&self, asn: ASN) -> bool {
        !self.attacker_asns.contains(&asn) && !self.victim_asns.contains(&asn)
    }

    /// Classify one AS by the route it selected for the destination
    pub fn control_plane_outcome(&self, engine: &SimulationEngine, asn: ASN) -> Outcomes {
        let prefixes = self.config.scenario.implementation().relevant_prefixes();
        let ann = engine
            .local_rib(asn)
            .and_then(|local_rib| most_specific_route(local_rib, &prefixes, self.dest_ip_addr));
        match ann {
            None => Outcomes::Disconnected,
            Some(ann) if ann.as_path.iter().any(|hop| self.attacker_asns.contains(hop)) => {
                Outcomes::AttackerSuccess
            }
            Some(ann) if ann.origin().map_or(false, |o| self.victim_asns.contains(&o)) => {
                Outcomes::VictimSuccess
            }
            Some(_) => Outcomes::Disconnected,
        }
    }

    /// Follow next hops of the longest-prefix match from every AS.
    ///
    /// Results are memoized across the walk; a forwarding loop or a missing
    /// route counts as disconnected.
    pub fn data_plane_outcomes(&self, engine: &SimulationEngine) -> HashMap<ASN, Outcomes> {
        let mut outcomes = HashMap::with_capacity(engine.as_graph.len());
        for as_obj in engine.as_graph.iter() {
            let mut visiting = HashSet::new();
            self.trace_data_plane(engine, as_obj.asn, &mut outcomes, &mut visiting);
        }
        outcomes
    }

    fn trace_data_plane(
        &self,
        engine: &SimulationEngine,
        asn: ASN,
        outcomes: &mut HashMap<ASN, Outcomes>,
        visiting: &mut HashSet<ASN>,
    ) -> Outcomes {
        if let Some(&outcome) = outcomes.get(&asn) {
            return outcome;
        }
        if !visiting.insert(asn) {
            return Outcomes::Disconnected;
        }

        let next_hop = engine
            .local_rib(asn)
            .and_then(|local_rib| longest_prefix_match(local_rib, self.dest_ip_addr))
            .map(|ann| {
                if ann.recv_relationship == Relationships::Origin {
                    None
                } else {
                    ann.as_path.get(1).copied()
                }
            });

        let outcome = match next_hop {
            None => Outcomes::Disconnected,
            Some(None) if self.attacker_asns.contains(&asn) => Outcomes::AttackerSuccess,
            Some(None) if self.victim_asns.contains(&asn) => Outcomes::VictimSuccess,
            Some(None) => Outcomes::Disconnected,
            Some(Some(next)) => self.trace_data_plane(engine, next, outcomes, visiting),
        };
        outcomes.insert(asn, outcome);
        outcome
    }
}

fn check_in_graph(as_graph: &ASGraph, asns: &BTreeSet<ASN>) -> Result<(), SimulationError> {
    match asns.iter().find(|&&asn| !as_graph.contains(asn)) {
        Some(&asn) => Err(SimulationError::UnknownAsn(asn)),
        None => Ok(()),
    }
}

fn sample<R: Rng + ?Sized>(
    config: &ScenarioConfig,
    candidates: Vec<ASN>,
    count: usize,
    what: &str,
    rng: &mut R,
) -> Result<BTreeSet<ASN>, SimulationError> {
    if count == 0 || candidates.len() < count {
        return Err(SimulationError::config(
            &config.label,
            format!(
                "cannot draw {} {} from {} stub or multihomed candidates",
                count,
                what,
                candidates.len()
            ),
        ));
    }
    Ok(candidates.choose_multiple(rng, count).copied().collect())
}

fn most_specific_route<'a>(
    local_rib: &'a LocalRIB,
    prefixes: &[Prefix],
    dest: IpAddr,
) -> Option<&'a Announcement> {
    prefixes
        .iter()
        .filter(|prefix| prefix.contains(dest))
        .filter_map(|prefix| local_rib.get_best(prefix))
        .max_by_key(|ann| ann.prefix.prefix())
}

fn longest_prefix_match(local_rib: &LocalRIB, dest: IpAddr) -> Option<&Announcement> {
    local_rib
        .iter()
        .filter(|(prefix, _)| prefix.contains(dest))
        .map(|(_, ann)| ann)
        .max_by_key(|ann| ann.prefix.prefix())
}
