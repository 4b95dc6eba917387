use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use dde_core::errors::{DdeError, ErrorInfo};
use tracing::debug;

use crate::checkpoint::{extract_group, extract_unique, filter_group, group_by, KeyMatch};
use crate::config::Configuration;
use crate::fill::{forward_fill, prepend_origin};
use crate::fields::{
    decode_f64_list, decode_f64_matrix, decode_task_list, decode_task_performance,
    decode_u64_list, pathway_of,
};
use crate::metrics::{
    avg_centroid_distance, coverage_summary, label_entropy, max_value, mean, CoverageRule,
};
use crate::profile::AggregationProfile;
use crate::resample::{select_indices, ResampleUnit};
use crate::rows::{
    CheckpointMetrics, Fields, KeyFields, PairwiseRow, ProfileRow, Record, SnapshotPoint,
    SummaryRow, TimeSeriesPoint, WorldAverages,
};
use crate::similarity::{order_populations, TaskProfile};
use crate::snapshot::snapshot_series;
use crate::table::{read_table, RawTable, Row};
use crate::writer::{RunBatch, TableKind};

/// Directory inside a run holding its logs.
pub const OUTPUT_DIR: &str = "output";
/// Per-run configuration log.
pub const RUN_CONFIG_FILE: &str = "run_config.csv";
/// Phylogenetic systematics log.
pub const SYSTEMATICS_FILE: &str = "systematics.csv";
/// Per-epoch world evaluation log.
pub const WORLD_EVALUATION_FILE: &str = "world_evaluation.csv";
/// Per-population world summary log.
pub const WORLD_SUMMARY_FILE: &str = "world_summary.csv";
/// Optional organism-level snapshot log.
pub const POPULATION_SNAPSHOT_FILE: &str = "population_snapshot.csv";

fn derived_empty(what: &str) -> DdeError {
    DdeError::Field(
        ErrorInfo::new("derived_empty", "derived collection is empty").with_context("what", what),
    )
}

/// Every row derived from one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    /// Run directory name.
    pub name: String,
    pub summary: SummaryRow,
    pub time_series: Vec<TimeSeriesPoint>,
    pub profiles: Vec<ProfileRow>,
    pub pairwise: Vec<PairwiseRow>,
    pub snapshot: Vec<SnapshotPoint>,
}

impl RunOutput {
    /// Flattens the typed rows into per-table cells.
    pub fn to_batch(&self) -> RunBatch {
        let mut batch = RunBatch::new();
        batch.push(TableKind::Summary, vec![self.summary.fields()]);
        batch.push(TableKind::TimeSeries, fields_of(&self.time_series));
        batch.push(TableKind::Profiles, fields_of(&self.profiles));
        batch.push(TableKind::Pairwise, fields_of(&self.pairwise));
        batch.push(TableKind::Snapshot, fields_of(&self.snapshot));
        batch
    }
}

fn fields_of<R: Record>(rows: &[R]) -> Vec<Fields> {
    rows.iter().map(Record::fields).collect()
}

/// Parameters of a run needed to locate and interpret its checkpoints.
#[derive(Debug, Clone, PartialEq)]
struct RunParameters {
    num_pops: usize,
    updates_per_epoch: u64,
    track_systematics: bool,
    epochs: u64,
    world_tasks: Option<Vec<String>>,
    indiv_tasks: Vec<String>,
}

impl RunParameters {
    fn from_config(config: &Configuration) -> Result<Self, DdeError> {
        let world_tasks = config
            .get("world_tasks")
            .map(|raw| decode_task_list("world_tasks", raw))
            .transpose()?;
        let indiv_tasks = config
            .get("indiv_tasks")
            .map(|raw| decode_task_list("indiv_tasks", raw))
            .transpose()?
            .unwrap_or_default();
        Ok(Self {
            num_pops: config.require_parse("NUM_POPS")?,
            updates_per_epoch: config.require_parse("UPDATES_PER_EPOCH")?,
            track_systematics: config.require_flag("TRACK_SYSTEMATICS")?,
            epochs: config.require_parse("EPOCHS")?,
            world_tasks,
            indiv_tasks,
        })
    }
}

fn key_fields(config: &Configuration, names: &[String]) -> Result<KeyFields, DdeError> {
    names
        .iter()
        .map(|name| Ok((name.clone(), config.require(name)?.to_string())))
        .collect::<Result<Vec<_>, DdeError>>()
        .map(KeyFields)
}

fn carry_fields(row: &Row, names: &[String]) -> Result<Vec<(String, String)>, DdeError> {
    names
        .iter()
        .map(|name| Ok((name.clone(), row.require(name)?.to_string())))
        .collect()
}

/// Coverage metrics of one world-evaluation record.
pub fn checkpoint_metrics(row: &Row, rule: CoverageRule) -> Result<CheckpointMetrics, DdeError> {
    let scores = decode_f64_matrix("scores", row.require("scores")?)?;
    let aggregate_scores = decode_f64_list("aggregate_scores", row.require("aggregate_scores")?)?;
    let coverage = coverage_summary(&scores, rule).ok_or_else(|| derived_empty("scores"))?;
    let max_aggregate_score =
        max_value(&aggregate_scores).ok_or_else(|| derived_empty("aggregate_scores"))?;
    Ok(CheckpointMetrics {
        num_pop_trait_profiles: coverage.num_profiles,
        pop_trait_profile_entropy: coverage.profile_entropy,
        max_aggregate_score,
        total_trait_coverage: coverage.total_coverage,
        max_trait_coverage: coverage.max_coverage,
    })
}

fn selection_entropy(row: &Row) -> Result<f64, DdeError> {
    let selected = decode_u64_list("selected", row.require("selected")?)?;
    Ok(label_entropy(selected))
}

fn world_averages(rows: &[&Row]) -> Result<WorldAverages, DdeError> {
    let column = |name: &str| -> Result<f64, DdeError> {
        let values = rows
            .iter()
            .map(|row| row.parse::<f64>(name))
            .collect::<Result<Vec<_>, _>>()?;
        mean(&values).ok_or_else(|| derived_empty(name))
    };
    Ok(WorldAverages {
        avg_num_orgs: column("num_orgs")?,
        avg_gens: column("avg_generation")?,
        avg_cpu_cycles_per_replication: column("avg_cpu_cycles_per_replication")?,
        avg_org_fitness: column("avg_org_fitness")?,
    })
}

/// World summary rows grouped by epoch, restricted to the summary update.
struct WorldSummary<'t> {
    by_epoch: BTreeMap<u64, Vec<&'t Row>>,
}

impl<'t> WorldSummary<'t> {
    fn new(table: &'t RawTable, summary_update: u64) -> Result<Self, DdeError> {
        let mut by_epoch = group_by(table, "epoch")?;
        for rows in by_epoch.values_mut() {
            *rows = filter_group(rows, "world_update", summary_update)?;
        }
        Ok(Self { by_epoch })
    }

    fn at(&self, epoch: u64) -> Result<WorldAverages, DdeError> {
        let rows = self.by_epoch.get(&epoch).map(Vec::as_slice).unwrap_or(&[]);
        world_averages(rows).map_err(|err| match err {
            DdeError::Field(info) => DdeError::Field(info.with_context("epoch", epoch.to_string())),
            other => other,
        })
    }

    fn total_generations(&self) -> Result<f64, DdeError> {
        let mut total = 0.0;
        for epoch in self.by_epoch.keys() {
            total += self.at(*epoch)?.avg_gens;
        }
        Ok(total)
    }
}

fn run_logs(run_dir: &Path) -> PathBuf {
    run_dir.join(OUTPUT_DIR)
}

fn update_overflow(quantity: &str, epoch: u64, updates_per_epoch: u64) -> DdeError {
    DdeError::Config(
        ErrorInfo::new("config_overflow", "update count does not fit in 64 bits")
            .with_context("quantity", quantity)
            .with_context("epoch", epoch.to_string())
            .with_context("parameter", "UPDATES_PER_EPOCH")
            .with_context("value", updates_per_epoch.to_string()),
    )
}

fn updates_elapsed(epoch: u64, updates_per_epoch: u64) -> Result<u64, DdeError> {
    epoch
        .checked_add(1)
        .and_then(|epochs| epochs.checked_mul(updates_per_epoch))
        .ok_or_else(|| update_overflow("updates_elapsed", epoch, updates_per_epoch))
}

fn total_updates(epochs: u64, updates_per_epoch: u64) -> Result<u64, DdeError> {
    epochs
        .checked_mul(updates_per_epoch)
        .ok_or_else(|| update_overflow("total_updates", epochs, updates_per_epoch))
}

/// Loads one run directory and derives every output row from it.
///
/// Any error means the run must be skipped; nothing is written here.
pub fn derive_run(run_dir: &Path, profile: &AggregationProfile) -> Result<RunOutput, DdeError> {
    let name = run_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| run_dir.display().to_string());
    let logs = run_logs(run_dir);
    let rule = profile.coverage_rule();

    let config = Configuration::resolve(&read_table(&logs.join(RUN_CONFIG_FILE))?)?;
    let params = RunParameters::from_config(&config)?;
    let keys = key_fields(&config, &profile.key_config_fields)?;
    let target = params.epochs;

    let systematics = if params.track_systematics {
        let table = read_table(&logs.join(SYSTEMATICS_FILE))?;
        let row = extract_unique(&table, "epoch", target)?;
        Some(carry_fields(row, &profile.systematics_fields)?)
    } else {
        None
    };

    // world evaluation: target checkpoint, run-wide selection averages, series
    let evaluation_table = read_table(&logs.join(WORLD_EVALUATION_FILE))?;
    let target_row = extract_unique(&evaluation_table, "epoch", target)?;
    let evaluation = carry_fields(target_row, &profile.world_eval_fields)?;
    let target_metrics = checkpoint_metrics(target_row, rule)?;

    let mut keyed = evaluation_table
        .rows()
        .iter()
        .map(|row| Ok((row.parse::<u64>("epoch")?, row)))
        .collect::<Result<Vec<(u64, &Row)>, DdeError>>()?;
    keyed.sort_by_key(|(epoch, _)| *epoch);

    let mut unique_selected = Vec::new();
    let mut entropies = Vec::new();
    for (epoch, row) in &keyed {
        if *epoch > target {
            continue;
        }
        unique_selected.push(row.parse::<f64>("num_unique_selected")?);
        entropies.push(selection_entropy(row)?);
    }
    let avg_unique_selected =
        mean(&unique_selected).ok_or_else(|| derived_empty("num_unique_selected"))?;
    let avg_entropy_selected = mean(&entropies).ok_or_else(|| derived_empty("selected"))?;

    // world summary: per-epoch averages and the per-population target checkpoint
    let summary_table = read_table(&logs.join(WORLD_SUMMARY_FILE))?;
    let summary_update = profile.summary_update(params.updates_per_epoch, params.track_systematics);
    let world_summary = WorldSummary::new(&summary_table, summary_update)?;
    let total_gens_approx = world_summary.total_generations()?;
    let population_rows = extract_group(
        &summary_table,
        &[
            KeyMatch::new("epoch", target),
            KeyMatch::new("world_update", summary_update),
        ],
        params.num_pops,
    )?;
    let world = world_averages(&population_rows)?;

    let series_keys = keyed
        .iter()
        .map(|(epoch, _)| match profile.units {
            ResampleUnit::Update => updates_elapsed(*epoch, params.updates_per_epoch),
            _ => Ok(*epoch),
        })
        .collect::<Result<Vec<u64>, DdeError>>()?;
    let kept = select_indices(&series_keys, profile.units, profile.resolution)?;
    debug!(run = %name, records = keyed.len(), kept = kept.len(), "resampled evaluation series");
    let mut time_series = Vec::with_capacity(kept.len());
    let mut generations_elapsed = 0.0;
    let mut previous_epoch: Option<u64> = None;
    for idx in kept {
        let (epoch, row) = keyed[idx];
        let averages = world_summary.at(epoch)?;
        generations_elapsed = match previous_epoch {
            None => averages.avg_gens * (epoch as f64 + 1.0),
            Some(previous) => generations_elapsed + averages.avg_gens * (epoch - previous) as f64,
        };
        previous_epoch = Some(epoch);
        time_series.push(TimeSeriesPoint {
            keys: keys.clone(),
            epoch: i64::try_from(epoch).unwrap_or(i64::MAX),
            updates_elapsed: updates_elapsed(epoch, params.updates_per_epoch)?,
            num_unique_selected: row.parse::<u64>("num_unique_selected")?,
            entropy_selected: selection_entropy(row)?,
            metrics: checkpoint_metrics(row, rule)?,
            world: averages,
            generations_elapsed,
        });
    }

    // population profiles, similarity order, pairwise distances
    let task_profiles = population_rows
        .iter()
        .enumerate()
        .map(|(pop_id, row)| {
            let raw = row.require("task_performance")?;
            let scores = decode_task_performance("task_performance", raw)?;
            Ok(TaskProfile::new(pop_id, scores))
        })
        .collect::<Result<Vec<_>, DdeError>>()?;
    let compared_tasks = match &params.world_tasks {
        Some(tasks) => tasks.clone(),
        None => task_profiles
            .iter()
            .flat_map(|profile| profile.task_names().map(str::to_string))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect(),
    };
    let ordering = order_populations(&task_profiles, &compared_tasks, rule)?;
    let world_task_set: BTreeSet<&str> = compared_tasks.iter().map(String::as_str).collect();
    let indiv_task_set: BTreeSet<&str> = params.indiv_tasks.iter().map(String::as_str).collect();

    let mut profiles = Vec::new();
    for (pop_order, &pop_id) in ordering.order.iter().enumerate() {
        let profile_scores = &task_profiles[pop_id];
        for (task_id, (task_name, &task_score)) in profile_scores.scores.iter().enumerate() {
            profiles.push(ProfileRow {
                keys: keys.clone(),
                epoch: target,
                pop_id,
                pop_order,
                task_id,
                task_name: task_name.clone(),
                pathway: pathway_of(task_name).to_string(),
                task_score,
                task_coverage: rule.covers(task_score),
                indiv_level: indiv_task_set.contains(task_name.as_str()),
                pop_level: world_task_set.contains(task_name.as_str()),
            });
        }
    }
    let pairwise = ordering
        .pairs
        .iter()
        .map(|comparison| PairwiseRow {
            keys: keys.clone(),
            comparison: *comparison,
        })
        .collect();

    let snapshot_path = logs.join(POPULATION_SNAPSHOT_FILE);
    let mut snapshot = if snapshot_path.is_file() {
        snapshot_series(&read_table(&snapshot_path)?, &keys)?
    } else {
        Vec::new()
    };

    if profile.zero_origin {
        prepend_origin(&mut time_series, &keys);
    }
    if let Some(grid) = &profile.fill_grid {
        time_series = forward_fill(&time_series, grid)?;
        snapshot = forward_fill(&snapshot, grid)?;
        debug!(run = %name, points = time_series.len(), "filled series onto update grid");
    }

    let summary = SummaryRow {
        config: config
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect(),
        trait_cov_thresh: profile.trait_cov_thresh,
        total_updates: total_updates(params.epochs, params.updates_per_epoch)?,
        systematics,
        evaluation,
        metrics: target_metrics,
        avg_unique_selected,
        avg_entropy_selected,
        total_gens_approx,
        world,
        avg_cosine_dist_from_centroid: avg_centroid_distance(&ordering.vectors),
    };

    Ok(RunOutput {
        name,
        summary,
        time_series,
        profiles,
        pairwise,
        snapshot,
    })
}
