use dde_core::errors::{DdeError, ErrorInfo};

use crate::checkpoint::group_by;
use crate::fields::decode_f64_list;
use crate::metrics::{avg_centroid_distance, coverage_count, label_counts, max_value, CoverageRule};
use crate::rows::{KeyFields, SnapshotPoint};
use crate::table::RawTable;

/// Organism-level metrics for every update of a population snapshot log.
///
/// Rows are grouped by `update`; each organism contributes its `scores_by_task`
/// vector and `aggregate_score`. Updates are emitted in ascending order.
pub fn snapshot_series(table: &RawTable, keys: &KeyFields) -> Result<Vec<SnapshotPoint>, DdeError> {
    let rule = CoverageRule::Positive;
    let mut points = Vec::new();
    for (update, organisms) in group_by(table, "update")? {
        let mut vectors = Vec::with_capacity(organisms.len());
        let mut aggregate_scores = Vec::with_capacity(organisms.len());
        for organism in &organisms {
            vectors.push(decode_f64_list(
                "scores_by_task",
                organism.require("scores_by_task")?,
            )?);
            aggregate_scores.push(organism.parse::<f64>("aggregate_score")?);
        }

        let width = vectors.first().map(Vec::len).unwrap_or(0);
        if let Some(ragged) = vectors.iter().position(|scores| scores.len() != width) {
            return Err(DdeError::Field(
                ErrorInfo::new("field_ragged", "organism score lists differ in length")
                    .with_context("field", "scores_by_task")
                    .with_context("update", update.to_string())
                    .with_context("expected", width.to_string())
                    .with_context("found", vectors[ragged].len().to_string()),
            ));
        }
        let population_task_coverage = (0..width)
            .filter(|&task| {
                vectors
                    .iter()
                    .any(|scores| scores.get(task).is_some_and(|&score| rule.covers(score)))
            })
            .count();
        let max_org_task_coverage = vectors
            .iter()
            .map(|scores| coverage_count(scores, rule))
            .max()
            .unwrap_or(0);
        let max_org_aggregate_score = max_value(&aggregate_scores).ok_or_else(|| {
            DdeError::Field(
                ErrorInfo::new("snapshot_empty", "update has no organisms")
                    .with_context("update", update.to_string()),
            )
        })?;
        let profiles = label_counts(vectors.iter().map(|scores| {
            scores
                .iter()
                .map(|score| format!("{score}"))
                .collect::<Vec<_>>()
                .join(",")
        }));

        points.push(SnapshotPoint {
            keys: keys.clone(),
            update,
            population_task_coverage,
            max_org_task_coverage,
            max_org_aggregate_score,
            num_unique_task_profiles: profiles.len(),
            avg_cosine_dist_from_centroid: avg_centroid_distance(&vectors),
        });
    }
    Ok(points)
}
