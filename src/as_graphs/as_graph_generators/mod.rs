pub mod caida;

use std::path::{Path, PathBuf};

use crate::as_graphs::as_graph::ASGraph;
use crate::run_context::RunContext;
use crate::shared::SimulationError;

/// File name the CAIDA reader looks for inside a run's cache directory
pub const CAIDA_CACHE_FILE_NAME: &str = "as-rel2.txt.bz2";

pub trait ASGraphGenerator {
    fn generate(&self) -> Result<ASGraph, SimulationError>;
}

/// Reads a CAIDA serial-2 AS relationship file that is already on disk.
///
/// Fetching the dataset is left to the caller.
pub struct CAIDAASGraphGenerator {
    pub path: PathBuf,
}

impl CAIDAASGraphGenerator {
    pub fn new(path: &Path) -> Self {
        CAIDAASGraphGenerator {
            path: path.to_path_buf(),
        }
    }

    /// Generator for the relationship file cached for this run
    pub fn from_run_context(run_context: &RunContext) -> Self {
        Self::new(&run_context.cache_dir.join(CAIDA_CACHE_FILE_NAME))
    }
}

impl ASGraphGenerator for CAIDAASGraphGenerator {
    fn generate(&self) -> Result<ASGraph, SimulationError> {
        log::info!("Loading CAIDA AS relationships from {:?}", self.path);
        let converter = caida::CAIDAASGraphConverter::new(&self.path);
        let links = converter.read_links()?;
        log::info!(
            "Read {} customer-provider links, {} peer links, {} input clique ASes",
            links.cp_links.len(),
            links.peer_links.len(),
            links.input_clique.len()
        );
        ASGraph::from_links(&links.cp_links, &links.peer_links, &links.input_clique)
    }
}
