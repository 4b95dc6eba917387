//! Aggregation of per-replicate evolution logs into schema-consistent tables.

mod checkpoint;
mod config;
mod dispatch;
mod fields;
mod fill;
mod metrics;
mod profile;
mod report;
mod resample;
mod rows;
mod run;
mod serde;
mod similarity;
mod snapshot;
mod table;
mod writer;

pub use checkpoint::{extract_group, extract_unique, filter_group, group_by, KeyMatch};
pub use config::{Configuration, EXPERIMENT_SOURCE};
pub use dispatch::{aggregate, discover_runs};
pub use fields::{
    decode_f64_list, decode_f64_matrix, decode_task_list, decode_task_performance,
    decode_u64_list, pathway_of, TaskScores,
};
pub use fill::{forward_fill, origin_point, prepend_origin, FillGrid, GridPoint};
pub use metrics::{
    avg_centroid_distance, centroid_distances, cosine_distance, coverage_count, coverage_flags,
    coverage_hamming, coverage_summary, l1_normalize, label_counts, label_entropy, max_value,
    mean, mean_defined, shannon_entropy, trait_profile, CoverageRule, CoverageSummary,
};
pub use profile::{load_profile, profile_to_yaml, AggregationProfile};
pub use report::{AggregateReport, SkippedRun, REPORT_FILE};
pub use resample::{ensure_ordered, select_indices, ResampleUnit};
pub use rows::{
    Cell, CheckpointMetrics, Fields, KeyFields, PairwiseRow, ProfileRow, Record, SnapshotPoint,
    SummaryRow, TimeSeriesPoint, WorldAverages, MISSING, ORIGIN_EPOCH,
};
pub use run::{
    checkpoint_metrics, derive_run, RunOutput, OUTPUT_DIR, POPULATION_SNAPSHOT_FILE,
    RUN_CONFIG_FILE, SYSTEMATICS_FILE, WORLD_EVALUATION_FILE, WORLD_SUMMARY_FILE,
};
pub use similarity::{
    highest_scoring, order_populations, PairwiseComparison, PopulationOrdering,
    SimilarityMatrix, TaskProfile,
};
pub use snapshot::snapshot_series;
pub use table::{parse_table, read_table, RawTable, Row};
pub use writer::{batch_schema, MultiTableWriter, OutputTable, RunBatch, TableKind, TableSummary};

pub use serde::{from_json_slice, to_canonical_json_bytes};
