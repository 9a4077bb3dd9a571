use std::env;
use std::path::Path;
use std::process;

use bgpattacksim::as_graphs::as_graph_generators::{ASGraphGenerator, CAIDAASGraphGenerator};
use bgpattacksim::shared::{ASNGroups, InAdoptingASNs, Outcomes, Plane};
use bgpattacksim::{
    init_logging, ASGraph, CustomerProviderLink, EngineRunConfig, EngineRunner, PeerLink,
    PolicyKind, RunContext, ScenarioConfig, ScenarioKind, Simulation, SimulationError,
};

fn main() {
    init_logging();

    if let Err(err) = run() {
        eprintln!("error: {}", err);
        process::exit(1);
    }
}

fn run() -> Result<(), SimulationError> {
    // An optional argument names a CAIDA serial-2 file. Without one, use the
    // file cached for today if present, else a small synthetic topology.
    let cached = CAIDAASGraphGenerator::from_run_context(&RunContext::default());
    let as_graph = match env::args().nth(1) {
        Some(path) => CAIDAASGraphGenerator::new(Path::new(&path)).generate()?,
        None if cached.path.exists() => cached.generate()?,
        None => {
            let as_graph = synthetic_topology()?;
            run_engine_example(as_graph.clone())?;
            println!("\n{}\n", "=".repeat(80));
            as_graph
        }
    };
    println!("BGP attack simulator: {} ASes\n", as_graph.len());

    run_simulation_example(as_graph)
}

/// Single deterministic subprefix hijack with explicit attacker and victim
fn run_engine_example(as_graph: ASGraph) -> Result<(), SimulationError> {
    println!("Example 1: Subprefix hijack, AS 6 running ROV");
    println!("---------------------------------------------");

    let config = ScenarioConfig::new("subprefix example", ScenarioKind::SubprefixHijack)
        .with_attacker_asns([3])
        .with_victim_asns([7])
        .with_adopting_asns([6, 7]);
    let run_context = RunContext::default().with_write_results(false);
    let engine_run = EngineRunConfig::new("subprefix_example", config, as_graph)?
        .with_text("AS 3 hijacks AS 7's /16 with a /24");
    let result = EngineRunner::new(engine_run, &run_context).run()?;

    for (asn, ribs) in &result.local_ribs {
        println!("AS {}: {}", asn, result.control_plane[asn]);
        for (prefix, path) in ribs {
            println!("  {} -> {:?}", prefix, path);
        }
    }
    Ok(())
}

/// Attacker success per policy and adoption level, averaged over trials
fn run_simulation_example(as_graph: ASGraph) -> Result<(), SimulationError> {
    println!("Example 2: Adoption sweep");
    println!("-------------------------");

    let configs: Vec<ScenarioConfig> = [PolicyKind::Rov, PolicyKind::Aspa, PolicyKind::Bgpsec]
        .into_iter()
        .map(|policy| {
            ScenarioConfig::new(&format!("SubprefixHijack {}", policy), ScenarioKind::SubprefixHijack)
                .with_adopt_policy(policy)
        })
        .collect();
    let simulation = Simulation::new(as_graph)
        .with_percent_adoptions(vec![10, 50, 80])
        .with_num_trials(20)
        .with_scenario_configs(configs)
        .with_run_context(RunContext::default().with_write_results(false));
    let tracker = simulation.run()?;

    for (key, metric) in tracker.summary() {
        let last_round = key.propagation_round + 1 == simulation.scenario_configs[0].rounds();
        if key.plane == Plane::ControlPlane
            && key.subgraph == ASNGroups::StubsOrMh
            && key.in_adopting == InAdoptingASNs::Notapplicable
            && last_round
        {
            println!(
                "{:<28} {:>3}%  {}: {:5.1}%  ({} trials)",
                key.scenario_label,
                key.percent_adoption,
                Outcomes::AttackerSuccess,
                metric.attacker_success,
                metric.trials
            );
        }
    }
    Ok(())
}

/// Two peered tier-1s, a few transit providers and their stubs
fn synthetic_topology() -> Result<ASGraph, SimulationError> {
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

    ASGraph::from_links(&cp_links, &peer_links, &[1, 2])
}
