use std::fs;

use rand::rngs::StdRng;
use rand::SeedableRng;

use bgpattacksim::as_graphs::as_graph::{ASGraph, CustomerProviderLink, PeerLink};
use bgpattacksim::run_context::RunContext;
use bgpattacksim::shared::{ASNGroups, InAdoptingASNs, Plane, SimulationError};
use bgpattacksim::simulation_engine::PolicyKind;
use bgpattacksim::simulation_framework::{
    DataTracker, Scenario, ScenarioConfig, ScenarioKind, Simulation,
};

/// Two peered tier-1s over a handful of transit and stub ASes
fn create_test_as_graph() -> ASGraph {
    let cp_links: Vec<CustomerProviderLink> = [
        (1, 3),
        (1, 4),
        (1, 5),
        (4, 6),
        (5, 7),
        (2, 8),
        (2, 9),
        (8, 10),
        (8, 11),
        (9, 11),
        (9, 12),
        (5, 13),
        (4, 14),
        (9, 14),
    ]
    .into_iter()
    .map(|(provider, customer)| CustomerProviderLink::new(provider, customer))
    .collect();
    let peer_links = vec![PeerLink::new(1, 2), PeerLink::new(4, 8)];
    ASGraph::from_links(&cp_links, &peer_links, &[1, 2]).unwrap()
}

fn quiet_context() -> RunContext {
    RunContext::default()
        .with_progress(false)
        .with_write_results(false)
        .with_seed(42)
}

fn create_simulation(run_context: RunContext) -> Simulation {
    let configs = vec![
        ScenarioConfig::new("SubprefixHijack ROV", ScenarioKind::SubprefixHijack)
            .with_adopt_policy(PolicyKind::Rov),
        ScenarioConfig::new("PrefixHijack ASPA", ScenarioKind::PrefixHijack)
            .with_adopt_policy(PolicyKind::Aspa)
            .with_propagation_rounds(2),
    ];
    Simulation::new(create_test_as_graph())
        .with_percent_adoptions(vec![0, 30, 100])
        .with_num_trials(6)
        .with_scenario_configs(configs)
        .with_run_context(run_context)
}

#[test]
fn test_single_and_multi_threaded_runs_match() {
    let single = create_simulation(quiet_context().with_parse_cpus(1)).run().unwrap();
    let parallel = create_simulation(quiet_context().with_parse_cpus(4)).run().unwrap();

    assert!(!single.is_empty());
    assert_eq!(single, parallel);
}

#[test]
fn test_same_seed_same_metrics() {
    let first = create_simulation(quiet_context().with_parse_cpus(3)).run().unwrap();
    let second = create_simulation(quiet_context().with_parse_cpus(3)).run().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_every_trial_is_recorded_per_round() {
    let simulation = create_simulation(quiet_context().with_parse_cpus(2));
    let tracker = simulation.run().unwrap();

    for key in tracker.keys() {
        if key.in_adopting == InAdoptingASNs::Notapplicable {
            let trials: Vec<u32> = tracker.records(key).iter().map(|r| r.trial).collect();
            assert_eq!(trials, (0..6).collect::<Vec<u32>>(), "{:?}", key);
        }
    }
    let rounds: Vec<u32> = tracker
        .keys()
        .filter(|key| key.scenario_label == "PrefixHijack ASPA")
        .map(|key| key.propagation_round)
        .collect();
    assert!(rounds.contains(&0) && rounds.contains(&1));
}

#[test]
fn test_chunks_cover_every_work_item() {
    let simulation = create_simulation(quiet_context().with_parse_cpus(4));
    let chunks = simulation.chunks();

    assert_eq!(chunks.len(), 4);
    let mut items: Vec<(u32, u32)> = chunks.into_iter().flatten().collect();
    items.sort();
    assert_eq!(items.len(), 18);
    items.dedup();
    assert_eq!(items.len(), 18);

    let empty = create_simulation(quiet_context()).with_num_trials(0);
    assert!(empty.chunks().is_empty());
    assert_eq!(empty.run().unwrap(), DataTracker::new());
}

#[test]
fn test_adopter_count_is_clamped_per_subgraph() {
    let as_graph = create_test_as_graph();
    let config = ScenarioConfig::new("clamp", ScenarioKind::SubprefixHijack);

    for seed in 0..5 {
        let scenario = Scenario::new(&config, &as_graph, 0, &mut StdRng::seed_from_u64(seed)).unwrap();
        for group in ASNGroups::ALL {
            let adopters = as_graph
                .asn_group(group)
                .iter()
                .filter(|asn| scenario.is_adopting(**asn) && scenario.is_uninvolved(**asn))
                .count();
            assert_eq!(adopters, 1, "{} at 0%", group);
        }

        let scenario = Scenario::new(&config, &as_graph, 100, &mut StdRng::seed_from_u64(seed)).unwrap();
        for group in ASNGroups::ALL {
            let non_adopters = as_graph
                .asn_group(group)
                .iter()
                .filter(|asn| !scenario.is_adopting(**asn) && scenario.is_uninvolved(**asn))
                .count();
            assert_eq!(non_adopters, 1, "{} at 100%", group);
        }
        for victim in &scenario.victim_asns {
            assert!(scenario.is_adopting(*victim));
        }
        for attacker in &scenario.attacker_asns {
            assert!(!scenario.is_adopting(*attacker));
            assert_eq!(scenario.policies.policy_for(*attacker), PolicyKind::Bgp);
        }
    }
}

#[test]
fn test_lone_eligible_as_adopts_only_below_full_adoption() {
    // 1 is the only Etc AS once stubs 2, 3 and 4 are drawn
    let as_graph = ASGraph::from_links(
        &[
            CustomerProviderLink::new(1, 2),
            CustomerProviderLink::new(1, 3),
            CustomerProviderLink::new(1, 4),
        ],
        &[],
        &[],
    )
    .unwrap();
    assert_eq!(as_graph.asn_group(ASNGroups::Etc).len(), 1);
    let config = ScenarioConfig::new("lone", ScenarioKind::PrefixHijack);

    for percent in [1, 50, 99] {
        let scenario = Scenario::new(&config, &as_graph, percent, &mut StdRng::seed_from_u64(0)).unwrap();
        assert!(scenario.is_adopting(1), "{}%", percent);
    }
    let scenario = Scenario::new(&config, &as_graph, 100, &mut StdRng::seed_from_u64(0)).unwrap();
    assert!(!scenario.is_adopting(1));
}

#[test]
fn test_attackers_and_victims_are_stubs_or_multihomed() {
    let as_graph = create_test_as_graph();
    let config = ScenarioConfig::new("draws", ScenarioKind::SubprefixHijack).with_num_attackers(2);
    let stubs = as_graph.asn_group(ASNGroups::StubsOrMh);

    for seed in 0..10 {
        let scenario = Scenario::new(&config, &as_graph, 50, &mut StdRng::seed_from_u64(seed)).unwrap();
        assert_eq!(scenario.attacker_asns.len(), 2);
        assert_eq!(scenario.victim_asns.len(), 1);
        assert!(scenario.attacker_asns.is_subset(stubs));
        assert!(scenario.victim_asns.is_subset(stubs));
        assert!(scenario.attacker_asns.is_disjoint(&scenario.victim_asns));
    }
}

#[test]
fn test_non_routed_prefix_never_reaches_a_victim() {
    let config = ScenarioConfig::new("NonRouted ROV", ScenarioKind::NonRoutedPrefixHijack)
        .with_adopt_policy(PolicyKind::Rov);
    let tracker = Simulation::new(create_test_as_graph())
        .with_percent_adoptions(vec![50])
        .with_num_trials(4)
        .with_scenario_configs(vec![config])
        .with_run_context(quiet_context())
        .run()
        .unwrap();

    for (key, metric) in tracker.summary() {
        assert_eq!(metric.victim_success, 0.0, "{:?}", key);
        if key.plane == Plane::ControlPlane && key.in_adopting == InAdoptingASNs::True {
            assert_eq!(metric.attacker_success, 0.0, "{:?}", key);
        }
    }
}

#[test]
fn test_legitimate_prefix_reaches_everyone() {
    let config = ScenarioConfig::new("Legitimate", ScenarioKind::LegitimatePrefixOnly);
    let tracker = Simulation::new(create_test_as_graph())
        .with_percent_adoptions(vec![10])
        .with_num_trials(3)
        .with_scenario_configs(vec![config])
        .with_run_context(quiet_context())
        .run()
        .unwrap();

    assert!(!tracker.is_empty());
    for metric in tracker.summary().values() {
        assert_eq!(metric.victim_success, 100.0);
    }
}

#[test]
fn test_results_written_to_output_dir() {
    let dir = std::env::temp_dir().join(format!("bgpattacksim-results-{}", std::process::id()));
    let run_context = quiet_context().with_write_results(true).with_output_dir(&dir);
    let simulation = create_simulation(run_context.clone()).with_num_trials(2);
    simulation.run().unwrap();

    let written = fs::read_to_string(run_context.results_path()).unwrap();
    let rows: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert!(rows.as_array().map_or(false, |rows| !rows.is_empty()));
    assert!(rows[0]["scenario_label"].is_string());
    assert!(rows[0]["attacker_success"].is_number());

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_config_errors_before_propagation() {
    let as_graph = create_test_as_graph();
    let mut rng = StdRng::seed_from_u64(0);
    let base = ScenarioConfig::new("errors", ScenarioKind::SubprefixHijack);

    assert!(matches!(
        Scenario::new(&base, &as_graph, 101, &mut rng),
        Err(SimulationError::InvalidConfig { .. })
    ));
    assert!(matches!(
        Scenario::new(&base.clone().with_attacker_asns([99]), &as_graph, 10, &mut rng),
        Err(SimulationError::UnknownAsn(99))
    ));
    let overlap = base.clone().with_attacker_asns([3]).with_victim_asns([3]);
    assert!(matches!(
        Scenario::new(&overlap, &as_graph, 10, &mut rng),
        Err(SimulationError::InvalidConfig { .. })
    ));
    let too_many = base.clone().with_num_attackers(50);
    assert!(matches!(
        Scenario::new(&too_many, &as_graph, 10, &mut rng),
        Err(SimulationError::InvalidConfig { .. })
    ));
    let no_adopters = base.clone().with_adopting_asns(Vec::new());
    assert!(matches!(
        Scenario::new(&no_adopters, &as_graph, 10, &mut rng),
        Err(SimulationError::InvalidConfig { .. })
    ));

    // The runner reports them before starting any worker
    let simulation = Simulation::new(as_graph)
        .with_scenario_configs(vec![too_many])
        .with_run_context(quiet_context());
    assert!(matches!(
        simulation.run(),
        Err(SimulationError::InvalidConfig { .. })
    ));
}

#[test]
fn test_scenario_names_round_trip() {
    for kind in ScenarioKind::ALL {
        assert_eq!(kind.name().parse::<ScenarioKind>().unwrap(), kind);
    }
    assert!(matches!(
        "Nope".parse::<ScenarioKind>(),
        Err(SimulationError::UnknownScenario(_))
    ));
}
