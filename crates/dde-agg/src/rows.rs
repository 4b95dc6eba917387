//! Typed output rows and their conversion to named cells.

use std::collections::BTreeMap;
use std::fmt;

use crate::similarity::PairwiseComparison;

/// Literal written for an undefined value.
pub const MISSING: &str = "NONE";

/// Epoch of the zeroed point placed before the first checkpoint.
pub const ORIGIN_EPOCH: i64 = -1;

/// One output value, rendered to text only when written.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Verbatim text, such as a configuration value.
    Text(String),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Undefined value.
    Missing,
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(text) => f.write_str(text),
            Cell::Int(value) => write!(f, "{value}"),
            Cell::Float(value) => write!(f, "{value:?}"),
            Cell::Missing => f.write_str(MISSING),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Float(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl From<usize> for Cell {
    fn from(value: usize) -> Self {
        Cell::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<u64> for Cell {
    fn from(value: u64) -> Self {
        Cell::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Cell::Int(i64::from(value))
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map(Cell::Float).unwrap_or(Cell::Missing)
    }
}

/// Named cells of one row, sorted by field name.
pub type Fields = BTreeMap<String, Cell>;

/// A typed row that can be flattened into named cells.
pub trait Record {
    /// Returns the row's fields keyed by column name.
    fn fields(&self) -> Fields;
}

fn put(fields: &mut Fields, name: &str, cell: impl Into<Cell>) {
    fields.insert(name.to_string(), cell.into());
}

/// Configuration values identifying a run (`SEED`, `SELECTION_METHOD`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyFields(pub Vec<(String, String)>);

impl KeyFields {
    fn extend_into(&self, fields: &mut Fields) {
        for (name, value) in &self.0 {
            put(fields, name, value.as_str());
        }
    }
}

/// Coverage and score metrics of one world-evaluation checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointMetrics {
    /// Distinct population coverage profiles.
    pub num_pop_trait_profiles: usize,
    /// Entropy of the population coverage profiles.
    pub pop_trait_profile_entropy: f64,
    /// Highest population aggregate score.
    pub max_aggregate_score: f64,
    /// Tasks covered by any population.
    pub total_trait_coverage: usize,
    /// Most tasks covered by a single population.
    pub max_trait_coverage: usize,
}

impl CheckpointMetrics {
    fn extend_into(&self, fields: &mut Fields) {
        put(fields, "num_pop_trait_profiles", self.num_pop_trait_profiles);
        put(fields, "pop_trait_profile_entropy", self.pop_trait_profile_entropy);
        put(fields, "max_aggregate_score", self.max_aggregate_score);
        put(fields, "total_trait_coverage", self.total_trait_coverage);
        put(fields, "max_trait_coverage", self.max_trait_coverage);
    }
}

/// Per-population averages from the world summary log at one epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldAverages {
    /// Mean population size.
    pub avg_num_orgs: f64,
    /// Mean organism generation.
    pub avg_gens: f64,
    /// Mean CPU cycles per replication.
    pub avg_cpu_cycles_per_replication: f64,
    /// Mean organism fitness.
    pub avg_org_fitness: f64,
}

impl WorldAverages {
    fn extend_into(&self, fields: &mut Fields) {
        put(fields, "avg_num_orgs", self.avg_num_orgs);
        put(fields, "avg_gens", self.avg_gens);
        put(
            fields,
            "avg_cpu_cycles_per_replication",
            self.avg_cpu_cycles_per_replication,
        );
        put(fields, "avg_org_fitness", self.avg_org_fitness);
    }
}

/// One row of `experiment_summary.csv`.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    /// Every resolved configuration parameter.
    pub config: Vec<(String, String)>,
    /// Coverage threshold used for the run.
    pub trait_cov_thresh: f64,
    /// `EPOCHS * UPDATES_PER_EPOCH`.
    pub total_updates: u64,
    /// Systematics fields at the target epoch, when tracked.
    pub systematics: Option<Vec<(String, String)>>,
    /// World-evaluation fields carried verbatim from the target epoch.
    pub evaluation: Vec<(String, String)>,
    /// Metrics recomputed at the target epoch.
    pub metrics: CheckpointMetrics,
    /// Mean distinct selections over epochs up to the target.
    pub avg_unique_selected: f64,
    /// Mean selection entropy over epochs up to the target.
    pub avg_entropy_selected: f64,
    /// Sum over epochs of the mean population generation.
    pub total_gens_approx: f64,
    /// World summary averages at the target epoch.
    pub world: WorldAverages,
    /// Mean population distance from the task centroid.
    pub avg_cosine_dist_from_centroid: Option<f64>,
}

impl Record for SummaryRow {
    fn fields(&self) -> Fields {
        let mut fields = Fields::new();
        for (name, value) in &self.config {
            put(&mut fields, name, value.as_str());
        }
        put(&mut fields, "trait_cov_thresh", self.trait_cov_thresh);
        put(&mut fields, "total_updates", self.total_updates);
        for (name, value) in self.systematics.iter().flatten() {
            put(&mut fields, name, value.as_str());
        }
        for (name, value) in &self.evaluation {
            put(&mut fields, name, value.as_str());
        }
        self.metrics.extend_into(&mut fields);
        put(&mut fields, "avg_unique_selected", self.avg_unique_selected);
        put(&mut fields, "avg_entropy_selected", self.avg_entropy_selected);
        put(&mut fields, "total_gens_approx", self.total_gens_approx);
        self.world.extend_into(&mut fields);
        put(
            &mut fields,
            "avg_cosine_dist_from_centroid",
            self.avg_cosine_dist_from_centroid,
        );
        fields
    }
}

/// One row of `evaluation_time_series.csv`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesPoint {
    /// Run identifying fields.
    pub keys: KeyFields,
    /// Checkpoint epoch; [`ORIGIN_EPOCH`] marks a zeroed origin point.
    pub epoch: i64,
    /// `epoch * UPDATES_PER_EPOCH + UPDATES_PER_EPOCH`.
    pub updates_elapsed: u64,
    /// Distinct populations selected at this epoch.
    pub num_unique_selected: u64,
    /// Entropy of the selection events at this epoch.
    pub entropy_selected: f64,
    /// Coverage metrics at this epoch.
    pub metrics: CheckpointMetrics,
    /// World summary averages at this epoch.
    pub world: WorldAverages,
    /// Approximate generations elapsed up to this epoch.
    pub generations_elapsed: f64,
}

impl Record for TimeSeriesPoint {
    fn fields(&self) -> Fields {
        let mut fields = Fields::new();
        self.keys.extend_into(&mut fields);
        put(&mut fields, "epoch", self.epoch);
        put(&mut fields, "updates_elapsed", self.updates_elapsed);
        put(&mut fields, "num_unique_selected", self.num_unique_selected);
        put(&mut fields, "entropy_selected", self.entropy_selected);
        self.metrics.extend_into(&mut fields);
        self.world.extend_into(&mut fields);
        put(&mut fields, "generations_elapsed", self.generations_elapsed);
        fields
    }
}

/// One row of `population_profiles.csv`: a single task of a single population.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRow {
    pub keys: KeyFields,
    pub epoch: u64,
    pub pop_id: usize,
    /// Position of the population in the similarity visiting order.
    pub pop_order: usize,
    /// Index of the task among the population's sorted task names.
    pub task_id: usize,
    pub task_name: String,
    pub pathway: String,
    pub task_score: f64,
    pub task_coverage: bool,
    pub indiv_level: bool,
    pub pop_level: bool,
}

impl Record for ProfileRow {
    fn fields(&self) -> Fields {
        let mut fields = Fields::new();
        self.keys.extend_into(&mut fields);
        put(&mut fields, "epoch", self.epoch);
        put(&mut fields, "pop_id", self.pop_id);
        put(&mut fields, "pop_order", self.pop_order);
        put(&mut fields, "task_id", self.task_id);
        put(&mut fields, "task_name", self.task_name.as_str());
        put(&mut fields, "pathway", self.pathway.as_str());
        put(&mut fields, "task_score", self.task_score);
        put(&mut fields, "task_coverage", self.task_coverage);
        put(&mut fields, "indiv_level", self.indiv_level);
        put(&mut fields, "pop_level", self.pop_level);
        fields
    }
}

/// One row of `pairwise_population_comps.csv`.
#[derive(Debug, Clone, PartialEq)]
pub struct PairwiseRow {
    pub keys: KeyFields,
    pub comparison: PairwiseComparison,
}

impl Record for PairwiseRow {
    fn fields(&self) -> Fields {
        let mut fields = Fields::new();
        self.keys.extend_into(&mut fields);
        put(&mut fields, "pop_a", self.comparison.pop_a);
        put(&mut fields, "pop_b", self.comparison.pop_b);
        put(&mut fields, "cosine_distance", self.comparison.cosine_distance);
        put(
            &mut fields,
            "coverage_hamming_distance",
            self.comparison.coverage_hamming_distance,
        );
        fields
    }
}

/// One row of `pop_snapshot_time_series.csv`.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotPoint {
    pub keys: KeyFields,
    pub update: u64,
    /// Tasks performed by at least one organism.
    pub population_task_coverage: usize,
    pub max_org_task_coverage: usize,
    pub max_org_aggregate_score: f64,
    pub num_unique_task_profiles: usize,
    pub avg_cosine_dist_from_centroid: Option<f64>,
}

impl Record for SnapshotPoint {
    fn fields(&self) -> Fields {
        let mut fields = Fields::new();
        self.keys.extend_into(&mut fields);
        put(&mut fields, "update", self.update);
        put(
            &mut fields,
            "population_task_coverage",
            self.population_task_coverage,
        );
        put(&mut fields, "max_org_task_coverage", self.max_org_task_coverage);
        put(
            &mut fields,
            "max_org_aggregate_score",
            self.max_org_aggregate_score,
        );
        put(
            &mut fields,
            "num_unique_task_profiles",
            self.num_unique_task_profiles,
        );
        put(
            &mut fields,
            "avg_cosine_dist_from_centroid",
            self.avg_cosine_dist_from_centroid,
        );
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_render_like_log_values() {
        assert_eq!(Cell::from(1.0).to_string(), "1.0");
        assert_eq!(Cell::from(0.25).to_string(), "0.25");
        assert_eq!(Cell::from(true).to_string(), "1");
        assert_eq!(Cell::from(None::<f64>).to_string(), "NONE");
        assert_eq!(Cell::from(7usize).to_string(), "7");
    }

    #[test]
    fn pairwise_fields_are_sorted_by_name() {
        let row = PairwiseRow {
            keys: KeyFields(vec![("SEED".into(), "4".into())]),
            comparison: PairwiseComparison {
                pop_a: 0,
                pop_b: 1,
                cosine_distance: None,
                coverage_hamming_distance: Some(0.5),
            },
        };
        let names: Vec<String> = row.fields().into_keys().collect();
        assert_eq!(
            names,
            vec![
                "SEED",
                "cosine_distance",
                "coverage_hamming_distance",
                "pop_a",
                "pop_b"
            ]
        );
    }
}
