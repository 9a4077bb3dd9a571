use std::path::{Path, PathBuf};

use chrono::Local;

/// Explicit run-wide settings, passed to whatever needs them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    /// Where results.json and engine-run artifacts are written
    pub output_dir: PathBuf,

    /// Single-day cache directory for topology files
    pub cache_dir: PathBuf,

    /// Worker threads for the trial pool
    pub parse_cpus: usize,

    /// Base seed mixed into every trial's RNG
    pub seed: u64,

    pub show_progress: bool,

    pub write_results: bool,

    /// Keep merged metrics from the chunks that succeeded when one fails
    pub allow_partial_results: bool,
}

impl Default for RunContext {
    fn default() -> Self {
        let output_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Desktop")
            .join("sims")
            .join("bgpattacksim");
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("bgpattacksim")
            .join(Local::now().format("%Y-%m-%d").to_string());

        RunContext {
            output_dir,
            cache_dir,
            parse_cpus: num_cpus::get().max(2) - 1,
            seed: 0,
            show_progress: true,
            write_results: true,
            allow_partial_results: false,
        }
    }
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.output_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_cache_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cache_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_parse_cpus(mut self, parse_cpus: usize) -> Self {
        self.parse_cpus = parse_cpus.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn with_write_results(mut self, write_results: bool) -> Self {
        self.write_results = write_results;
        self
    }

    pub fn with_allow_partial_results(mut self, allow: bool) -> Self {
        self.allow_partial_results = allow;
        self
    }

    pub fn results_path(&self) -> PathBuf {
        self.output_dir.join("results.json")
    }
}

/// Installs the env_logger backend once. Later calls are no-ops.
pub fn init_logging() {
    let _ = pretty_env_logger::try_init();
}
