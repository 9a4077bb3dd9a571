use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::as_graphs::as_graph::ASN;
use crate::shared::{ASNGroups, InAdoptingASNs, Outcomes, Plane, SimulationError};
use crate::simulation_engine::SimulationEngine;
use crate::simulation_framework::scenario::Scenario;

/// One metric bucket
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DataKey {
    pub scenario_label: String,
    pub plane: Plane,
    pub subgraph: ASNGroups,
    pub in_adopting: InAdoptingASNs,
    /// Name of the adopting policy under test
    pub policy: String,
    pub percent_adoption: u32,
    pub propagation_round: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub attacker_success: u64,
    pub victim_success: u64,
    pub disconnected: u64,
}

impl OutcomeCounts {
    pub fn add(&mut self, outcome: Outcomes) {
        match outcome {
            Outcomes::AttackerSuccess => self.attacker_success += 1,
            Outcomes::VictimSuccess => self.victim_success += 1,
            Outcomes::Disconnected => self.disconnected += 1,
        }
    }

    pub fn get(&self, outcome: Outcomes) -> u64 {
        match outcome {
            Outcomes::AttackerSuccess => self.attacker_success,
            Outcomes::VictimSuccess => self.victim_success,
            Outcomes::Disconnected => self.disconnected,
        }
    }

    pub fn total(&self) -> u64 {
        self.attacker_success + self.victim_success + self.disconnected
    }

    pub fn percent(&self, outcome: Outcomes) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.get(outcome) as f64 * 100.0 / total as f64,
        }
    }
}

/// Outcome tally of one trial for one key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub trial: u32,
    pub counts: OutcomeCounts,
}

/// Mean outcome percentages over the trials of one key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    pub trials: usize,
    pub attacker_success: f64,
    pub victim_success: f64,
    pub disconnected: f64,
}

#[derive(Debug, Serialize)]
struct ResultRow<'a> {
    #[serde(flatten)]
    key: &'a DataKey,
    #[serde(flatten)]
    summary: MetricSummary,
    records: &'a [TrialRecord],
}

/// Metric table for a run. Chunks fill their own tracker, the coordinator
/// merges them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTracker {
    data: BTreeMap<DataKey, Vec<TrialRecord>>,
}

impl DataTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tally every AS except attackers and victims after one round
    pub fn track_trial(
        &mut self,
        scenario: &Scenario,
        engine: &SimulationEngine,
        trial: u32,
        propagation_round: u32,
    ) {
        let data_plane = scenario.data_plane_outcomes(engine);
        let mut counts: HashMap<DataKey, OutcomeCounts> = HashMap::new();

        for as_obj in engine.as_graph.iter() {
            let asn = as_obj.asn;
            if !scenario.is_uninvolved(asn) {
                continue;
            }
            let adopting = if scenario.is_adopting(asn) {
                InAdoptingASNs::True
            } else {
                InAdoptingASNs::False
            };
            let control = scenario.control_plane_outcome(engine, asn);
            let data = data_plane
                .get(&asn)
                .copied()
                .unwrap_or(Outcomes::Disconnected);

            for (plane, outcome) in [(Plane::ControlPlane, control), (Plane::DataPlane, data)] {
                for in_adopting in [adopting, InAdoptingASNs::Notapplicable] {
                    let key = self.key(scenario, plane, as_obj.subgraph(), in_adopting, propagation_round);
                    counts.entry(key).or_default().add(outcome);
                }
            }
        }

        for (key, counts) in counts {
            self.data
                .entry(key)
                .or_default()
                .push(TrialRecord { trial, counts });
        }
    }

    fn key(
        &self,
        scenario: &Scenario,
        plane: Plane,
        subgraph: ASNGroups,
        in_adopting: InAdoptingASNs,
        propagation_round: u32,
    ) -> DataKey {
        DataKey {
            scenario_label: scenario.config.label.clone(),
            plane,
            subgraph,
            in_adopting,
            policy: scenario.config.adopt_policy.name().to_string(),
            percent_adoption: scenario.percent_adoption,
            propagation_round,
        }
    }

    /// Reduce step. Records stay ordered by trial, so the result does not
    /// depend on how trials were split across chunks.
    pub fn merge(&mut self, other: DataTracker) {
        for (key, records) in other.data {
            let entry = self.data.entry(key).or_default();
            entry.extend(records);
            entry.sort_by_key(|record| record.trial);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &DataKey> {
        self.data.keys()
    }

    pub fn records(&self, key: &DataKey) -> &[TrialRecord] {
        self.data.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn summary(&self) -> BTreeMap<DataKey, MetricSummary> {
        self.data
            .iter()
            .map(|(key, records)| (key.clone(), summarize(records)))
            .collect()
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), SimulationError> {
        let rows: Vec<ResultRow> = self
            .data
            .iter()
            .map(|(key, records)| ResultRow {
                key,
                summary: summarize(records),
                records,
            })
            .collect();
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, &rows)?;
        log::info!("Wrote {} metric rows to {}", rows.len(), path.display());
        Ok(())
    }

    /// Attacker success percentage averaged over trials, if the key exists
    pub fn attacker_success(&self, key: &DataKey) -> Option<f64> {
        self.data
            .get(key)
            .map(|records| summarize(records).attacker_success)
    }
}

fn summarize(records: &[TrialRecord]) -> MetricSummary {
    let trials = records.len();
    let mean = |outcome: Outcomes| {
        if trials == 0 {
            return 0.0;
        }
        records
            .iter()
            .map(|record| record.counts.percent(outcome))
            .sum::<f64>()
            / trials as f64
    };
    MetricSummary {
        trials,
        attacker_success: mean(Outcomes::AttackerSuccess),
        victim_success: mean(Outcomes::VictimSuccess),
        disconnected: mean(Outcomes::Disconnected),
    }
}

/// Outcome per ASN, for callers that want the raw table
pub fn outcome_table(
    scenario: &Scenario,
    engine: &SimulationEngine,
    plane: Plane,
) -> BTreeMap<ASN, Outcomes> {
    match plane {
        Plane::ControlPlane => engine
            .as_graph
            .iter()
            .map(|as_obj| (as_obj.asn, scenario.control_plane_outcome(engine, as_obj.asn)))
            .collect(),
        Plane::DataPlane => scenario.data_plane_outcomes(engine).into_iter().collect(),
    }
}
