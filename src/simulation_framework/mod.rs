pub mod data_tracker;
pub mod scenario;
pub mod scenario_config;
pub mod scenarios;
pub mod simulation;

pub use data_tracker::{DataKey, DataTracker, OutcomeCounts, TrialRecord};
pub use scenario::{Scenario, ScenarioKind, ScenarioTrait};
pub use scenario_config::ScenarioConfig;
pub use simulation::Simulation;
