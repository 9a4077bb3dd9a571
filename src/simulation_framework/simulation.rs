use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::as_graphs::as_graph::ASGraph;
use crate::run_context::RunContext;
use crate::shared::SimulationError;
use crate::simulation_engine::policy::PolicyKind;
use crate::simulation_engine::SimulationEngine;

use super::data_tracker::DataTracker;
use super::scenario::{Scenario, ScenarioKind};
use super::scenario_config::ScenarioConfig;

/// (percent adoption, trial index)
type WorkItem = (u32, u32);

pub struct Simulation {
    /// Percentages of ASes adopting for each run
    pub percent_adoptions: Vec<u32>,

    /// Scenario configurations to run
    pub scenario_configs: Vec<ScenarioConfig>,

    /// Number of trials per configuration
    pub num_trials: u32,

    pub run_context: RunContext,

    /// AS graph shared read-only by every trial
    as_graph: ASGraph,
}

impl Simulation {
    pub fn new(as_graph: ASGraph) -> Self {
        Simulation {
            percent_adoptions: vec![10, 20, 50, 80, 99],
            scenario_configs: vec![ScenarioConfig::new(
                "SubprefixHijack ROV",
                ScenarioKind::SubprefixHijack,
            )
            .with_adopt_policy(PolicyKind::Rov)],
            num_trials: 10,
            run_context: RunContext::default(),
            as_graph,
        }
    }

    pub fn with_percent_adoptions(mut self, percentages: Vec<u32>) -> Self {
        self.percent_adoptions = percentages;
        self
    }

    pub fn with_scenario_configs(mut self, configs: Vec<ScenarioConfig>) -> Self {
        self.scenario_configs = configs;
        self
    }

    pub fn with_num_trials(mut self, trials: u32) -> Self {
        self.num_trials = trials;
        self
    }

    pub fn with_run_context(mut self, run_context: RunContext) -> Self {
        self.run_context = run_context;
        self
    }

    pub fn as_graph(&self) -> &ASGraph {
        &self.as_graph
    }

    /// Run every (percent, trial) pair for every scenario config and merge
    /// the metrics. Writes `results.json` when the run context asks for it.
    pub fn run(&self) -> Result<DataTracker, SimulationError> {
        self.validate()?;
        let start_time = Instant::now();

        let chunks = self.chunks();
        let total_trials = chunks.iter().map(Vec::len).sum::<usize>() * self.scenario_configs.len();
        log::info!(
            "Running {} trials over {} ASes in {} chunks",
            total_trials,
            self.as_graph.len(),
            chunks.len()
        );

        let progress = if self.run_context.show_progress {
            let bar = ProgressBar::new(total_trials as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40} {pos}/{len} trials")?
                    .progress_chars("##-"),
            );
            bar
        } else {
            ProgressBar::hidden()
        };

        let result = self.run_chunks(&chunks, |chunk| self.run_chunk(chunk, &progress));
        progress.finish_and_clear();
        let (tracker, failed_chunks) = result?;

        if self.run_context.write_results {
            fs::create_dir_all(&self.run_context.output_dir)?;
            tracker.save_to_file(&self.run_context.results_path())?;
        }
        log::info!(
            "Simulation complete in {:.2}s ({} failed chunks)",
            start_time.elapsed().as_secs_f64(),
            failed_chunks
        );
        Ok(tracker)
    }

    /// Surface configuration errors before any worker starts
    fn validate(&self) -> Result<(), SimulationError> {
        if self.scenario_configs.is_empty() {
            return Err(SimulationError::config("simulation", "no scenario configs"));
        }
        for config in &self.scenario_configs {
            for &percent in &self.percent_adoptions {
                let mut rng = StdRng::seed_from_u64(self.run_context.seed);
                Scenario::new(config, &self.as_graph, percent, &mut rng)?;
            }
        }
        Ok(())
    }

    /// Work items dealt round-robin into at most `parse_cpus` chunks
    pub fn chunks(&self) -> Vec<Vec<WorkItem>> {
        let items: Vec<WorkItem> = self
            .percent_adoptions
            .iter()
            .flat_map(|&percent| (0..self.num_trials).map(move |trial| (percent, trial)))
            .collect();
        let num_chunks = self.run_context.parse_cpus.max(1).min(items.len());

        let mut chunks = vec![Vec::new(); num_chunks];
        for (i, item) in items.into_iter().enumerate() {
            chunks[i % num_chunks].push(item);
        }
        chunks
    }

    /// Runs every chunk on the worker pool and merges what comes back.
    ///
    /// A failed chunk fails the whole run unless `allow_partial_results` is
    /// set, in which case it is logged and counted. An empty chunk result is
    /// still a success.
    fn run_chunks<F>(
        &self,
        chunks: &[Vec<WorkItem>],
        run_chunk: F,
    ) -> Result<(DataTracker, usize), SimulationError>
    where
        F: Fn(&[WorkItem]) -> Result<DataTracker, SimulationError> + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.run_context.parse_cpus.max(1))
            .build()?;
        let results: Vec<Result<DataTracker, SimulationError>> = pool.install(|| {
            chunks
                .par_iter()
                .enumerate()
                .map(|(index, chunk)| guard_chunk(index, || run_chunk(chunk.as_slice())))
                .collect()
        });

        let mut tracker = DataTracker::new();
        let mut failed_chunks = 0;
        for result in results {
            match result {
                Ok(chunk_tracker) => tracker.merge(chunk_tracker),
                Err(err) if self.run_context.allow_partial_results => {
                    log::error!("{}; keeping partial results", err);
                    failed_chunks += 1;
                }
                Err(err) => return Err(err),
            }
        }
        Ok((tracker, failed_chunks))
    }

    /// Run every work item of one chunk for every scenario config
    pub fn run_chunk(
        &self,
        chunk: &[WorkItem],
        progress: &ProgressBar,
    ) -> Result<DataTracker, SimulationError> {
        let mut tracker = DataTracker::new();
        for &(percent, trial) in chunk {
            for config in &self.scenario_configs {
                self.run_trial(config, percent, trial, &mut tracker)?;
                progress.inc(1);
            }
        }
        Ok(tracker)
    }

    /// One trial: fresh RIBs, seeded RNG, outcomes tallied after every round.
    ///
    /// Every config sees the same draws for a given (percent, trial), so
    /// policies are compared against identical attackers and victims.
    pub fn run_trial(
        &self,
        config: &ScenarioConfig,
        percent: u32,
        trial: u32,
        tracker: &mut DataTracker,
    ) -> Result<(), SimulationError> {
        let mut rng = StdRng::seed_from_u64(trial_seed(self.run_context.seed, percent, trial));
        let scenario = Scenario::new(config, &self.as_graph, percent, &mut rng)?;

        let mut engine = SimulationEngine::new(&self.as_graph, &scenario.policies);
        engine.setup(scenario.seed_announcements.clone())?;
        for round in 0..config.rounds() {
            engine.propagate_round();
            tracker.track_trial(&scenario, &engine, trial, round);
        }
        Ok(())
    }
}

/// SplitMix64 over the base seed and the work item
fn trial_seed(seed: u64, percent: u32, trial: u32) -> u64 {
    let item = ((percent as u64) << 32) | trial as u64;
    let mut z = seed ^ item.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Turns a panic or error inside one chunk into `ChunkFailed`
fn guard_chunk<F>(index: usize, run: F) -> Result<DataTracker, SimulationError>
where
    F: FnOnce() -> Result<DataTracker, SimulationError>,
{
    let result = panic::catch_unwind(AssertUnwindSafe(run)).unwrap_or_else(|panic| {
        Err(SimulationError::ChunkFailed {
            chunk: index,
            reason: panic_reason(panic),
        })
    });
    result.map_err(|err| match err {
        SimulationError::ChunkFailed { .. } => err,
        other => SimulationError::ChunkFailed {
            chunk: index,
            reason: other.to_string(),
        },
    })
}

fn panic_reason(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::as_graphs::as_graph::ASBuilder;
    use crate::shared::InAdoptingASNs;

    /// 1 serves stubs 2, 3 and 4
    fn create_simulation(allow_partial_results: bool) -> Simulation {
        let as_graph = ASGraph::build(vec![
            ASBuilder::new(1).with_customers(vec![2, 3, 4]),
            ASBuilder::new(2).with_providers(vec![1]),
            ASBuilder::new(3).with_providers(vec![1]),
            ASBuilder::new(4).with_providers(vec![1]),
        ])
        .unwrap();
        let run_context = RunContext::default()
            .with_parse_cpus(2)
            .with_seed(3)
            .with_progress(false)
            .with_write_results(false)
            .with_allow_partial_results(allow_partial_results);
        Simulation::new(as_graph)
            .with_percent_adoptions(vec![50])
            .with_num_trials(4)
            .with_run_context(run_context)
    }

    /// Runs normally, except that the chunk holding trial 1 blows up
    fn run_with_failing_chunk(
        simulation: &Simulation,
        panic: bool,
    ) -> Result<(DataTracker, usize), SimulationError> {
        let progress = ProgressBar::hidden();
        let chunks = simulation.chunks();
        simulation.run_chunks(&chunks, |chunk| {
            if chunk.iter().any(|&(_, trial)| trial == 1) {
                if panic {
                    panic!("trial 1 exploded");
                }
                return Err(SimulationError::UnknownAsn(99));
            }
            simulation.run_chunk(chunk, &progress)
        })
    }

    #[test]
    fn test_trial_seed_differs_per_item() {
        assert_ne!(trial_seed(0, 10, 0), trial_seed(0, 10, 1));
        assert_ne!(trial_seed(0, 10, 0), trial_seed(0, 20, 0));
        assert_eq!(trial_seed(7, 50, 3), trial_seed(7, 50, 3));
    }

    #[test]
    fn test_failed_chunk_fails_the_run() {
        let simulation = create_simulation(false);
        // Trials 0 and 2 land in chunk 0, trials 1 and 3 in chunk 1
        assert_eq!(simulation.chunks(), vec![vec![(50, 0), (50, 2)], vec![(50, 1), (50, 3)]]);

        match run_with_failing_chunk(&simulation, true) {
            Err(SimulationError::ChunkFailed { chunk, reason }) => {
                assert_eq!(chunk, 1);
                assert!(reason.contains("trial 1 exploded"), "{}", reason);
            }
            other => panic!("expected a failed chunk, got {:?}", other.map(|(_, n)| n)),
        }
        match run_with_failing_chunk(&simulation, false) {
            Err(SimulationError::ChunkFailed { chunk, reason }) => {
                assert_eq!(chunk, 1);
                assert_eq!(reason, SimulationError::UnknownAsn(99).to_string());
            }
            other => panic!("expected a failed chunk, got {:?}", other.map(|(_, n)| n)),
        }
    }

    #[test]
    fn test_partial_results_keep_surviving_chunks() {
        let simulation = create_simulation(true);
        let (tracker, failed_chunks) = run_with_failing_chunk(&simulation, true).unwrap();

        assert_eq!(failed_chunks, 1);
        assert!(!tracker.is_empty());
        for key in tracker.keys() {
            let trials: Vec<u32> = tracker.records(key).iter().map(|r| r.trial).collect();
            assert!(trials.iter().all(|trial| *trial == 0 || *trial == 2), "{:?}", key);
            if key.in_adopting == InAdoptingASNs::Notapplicable {
                assert_eq!(trials, vec![0, 2], "{:?}", key);
            }
        }
    }

    #[test]
    fn test_empty_chunk_is_not_a_failure() {
        let simulation = create_simulation(false);
        let chunks = vec![Vec::new(), vec![(50, 0)]];
        let (tracker, failed_chunks) = simulation
            .run_chunks(&chunks, |chunk| simulation.run_chunk(chunk, &ProgressBar::hidden()))
            .unwrap();

        assert_eq!(failed_chunks, 0);
        assert!(!tracker.is_empty());
    }

    #[test]
    fn test_trial_seed_differs_per_item_duplicate() {
        assert_ne!(trial_seed(0, 10, 0), trial_seed(0, 10, 1));
        assert_ne!(trial_seed(0, 10, 0), trial_seed(0, 20, 0));
        assert_eq!(trial_seed(7, 50, 3), trial_seed(7, 50, 3));
    }
}
