use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::as_graphs::as_graph::ASN;
use crate::run_context::RunContext;
use crate::shared::{Outcomes, Plane, SimulationError};
use crate::simulation_engine::SimulationEngine;
use crate::simulation_framework::data_tracker::outcome_table;
use crate::simulation_framework::scenario::Scenario;

use super::engine_run_config::EngineRunConfig;

const ENGINE_FILE: &str = "engine_guess.json";
const OUTCOMES_FILE: &str = "outcomes_guess.json";
const GROUND_TRUTH_FILE: &str = "outcomes_ground_truth.json";
const CONFIG_FILE: &str = "config.json";

/// Final state of one engine run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineRunResult {
    /// ASN -> prefix -> AS path of the selected route
    pub local_ribs: BTreeMap<ASN, BTreeMap<String, Vec<ASN>>>,
    pub control_plane: BTreeMap<ASN, Outcomes>,
    pub data_plane: BTreeMap<ASN, Outcomes>,
}

/// Runs a single engine run with specific configuration
pub struct EngineRunner {
    pub config: EngineRunConfig,

    /// Storage directory for this specific run
    pub storage_dir: PathBuf,

    /// Write the run's JSON artifacts
    pub write_files: bool,

    /// Compare outcomes against a stored ground truth, creating it if absent
    pub compare_against_ground_truth: bool,
}

impl EngineRunner {
    pub fn new(config: EngineRunConfig, run_context: &RunContext) -> Self {
        let storage_dir = run_context
            .output_dir
            .join("engine_runs")
            .join(&config.name);

        EngineRunner {
            config,
            storage_dir,
            write_files: run_context.write_results,
            compare_against_ground_truth: false,
        }
    }

    pub fn with_storage_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.storage_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_write_files(mut self, write: bool) -> Self {
        self.write_files = write;
        self
    }

    pub fn with_compare_against_ground_truth(mut self, compare: bool) -> Self {
        self.compare_against_ground_truth = compare;
        self
    }

    /// Run the engine with the configured scenario
    pub fn run(&self) -> Result<EngineRunResult, SimulationError> {
        let as_graph = &self.config.as_graph;
        let scenario_config = &self.config.scenario_config;
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let scenario = Scenario::new(
            scenario_config,
            as_graph,
            self.config.percent_adoption,
            &mut rng,
        )?;

        let mut engine = SimulationEngine::new(as_graph, &scenario.policies);
        engine.setup(scenario.seed_announcements.clone())?;
        engine.run(scenario_config.rounds());
        log::info!(
            "Engine run {} finished after {} rounds",
            self.config.name,
            scenario_config.rounds()
        );

        let result = EngineRunResult {
            local_ribs: engine.get_local_rib_snapshot(),
            control_plane: outcome_table(&scenario, &engine, Plane::ControlPlane),
            data_plane: outcome_table(&scenario, &engine, Plane::DataPlane),
        };

        if self.write_files || self.compare_against_ground_truth {
            fs::create_dir_all(&self.storage_dir)?;
        }
        if self.write_files {
            self.store_data(&result)?;
        }
        if self.compare_against_ground_truth {
            self.check_ground_truth(&result)?;
        }
        Ok(result)
    }

    fn store_data(&self, result: &EngineRunResult) -> Result<(), SimulationError> {
        write_json(&self.storage_dir.join(ENGINE_FILE), &result.local_ribs)?;
        write_json(&self.storage_dir.join(OUTCOMES_FILE), result)?;
        write_json(&self.storage_dir.join(CONFIG_FILE), &self.config.to_json())?;
        Ok(())
    }

    fn check_ground_truth(&self, result: &EngineRunResult) -> Result<(), SimulationError> {
        let path = self.storage_dir.join(GROUND_TRUTH_FILE);
        if !path.exists() {
            log::info!("No ground truth for {}, storing this run", self.config.name);
            return write_json(&path, result);
        }

        let expected: EngineRunResult = serde_json::from_str(&fs::read_to_string(&path)?)?;
        if &expected != result {
            return Err(SimulationError::config(
                &self.config.scenario_config.label,
                format!(
                    "engine run {} does not match {}",
                    self.config.name,
                    path.display()
                ),
            ));
        }
        Ok(())
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), SimulationError> {
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}
