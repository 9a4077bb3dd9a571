use crate::as_graphs::as_graph::ASGraph;
use crate::shared::SimulationError;
use crate::simulation_framework::scenario_config::ScenarioConfig;

/// Configuration for a single engine run
#[derive(Debug, Clone)]
pub struct EngineRunConfig {
    /// Unique name for this engine run, also its storage directory
    pub name: String,

    /// Scenario configuration. Set attacker and victim overrides for a
    /// reproducible run.
    pub scenario_config: ScenarioConfig,

    /// AS graph to use
    pub as_graph: ASGraph,

    /// Free-form description stored alongside the results
    pub text: String,

    pub percent_adoption: u32,

    /// Seed for any draws the scenario config leaves open
    pub seed: u64,
}

impl EngineRunConfig {
    pub fn new(
        name: &str,
        scenario_config: ScenarioConfig,
        as_graph: ASGraph,
    ) -> Result<Self, SimulationError> {
        if name.is_empty() || name.contains(std::path::is_separator) {
            return Err(SimulationError::config(
                &scenario_config.label,
                format!("engine run name {:?} is not a valid directory name", name),
            ));
        }

        Ok(EngineRunConfig {
            name: name.to_string(),
            scenario_config,
            as_graph,
            text: String::new(),
            percent_adoption: 0,
            seed: 0,
        })
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn with_percent_adoption(mut self, percent: u32) -> Self {
        self.percent_adoption = percent;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn to_json(&self) -> serde_json::Value {
        let config = &self.scenario_config;
        serde_json::json!({
            "name": self.name,
            "text": self.text,
            "percent_adoption": self.percent_adoption,
            "seed": self.seed,
            "scenario_config": {
                "label": config.label,
                "scenario": config.scenario.name(),
                "base_policy": config.base_policy.name(),
                "adopt_policy": config.adopt_policy.name(),
                "propagation_rounds": config.rounds(),
                "attacker_asns": config.override_attacker_asns,
                "victim_asns": config.override_victim_asns,
                "adopting_asns": config.override_adopting_asns,
            },
            "as_graph": {
                "num_ases": self.as_graph.len(),
                "propagation_ranks": self.as_graph.propagation_ranks.len(),
            },
        })
    }
}
