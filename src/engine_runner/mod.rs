pub mod engine_run_config;
pub mod engine_runner;

pub use engine_run_config::EngineRunConfig;
pub use engine_runner::{EngineRunResult, EngineRunner};
