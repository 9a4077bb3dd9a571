pub mod as_graphs;
pub mod engine_runner;
pub mod route_validator;
pub mod run_context;
pub mod shared;
pub mod simulation_engine;
pub mod simulation_framework;

// Re-export commonly used types at the crate root
pub use as_graphs::{ASBuilder, ASGraph, CustomerProviderLink, PeerLink, AS, ASN};
pub use engine_runner::{EngineRunConfig, EngineRunner};
pub use route_validator::{RouteValidator, ROA};
pub use run_context::{init_logging, RunContext};
pub use shared::{CommonASNs, Outcomes, Relationships, SimulationError, Timestamps};
pub use simulation_engine::{Announcement, PolicyAssignment, PolicyKind, Prefix, SimulationEngine};
pub use simulation_framework::{DataTracker, Scenario, ScenarioConfig, ScenarioKind, Simulation};
