//! Completion of per-run series onto a common update grid.

use dde_core::errors::DdeError;
use serde::{Deserialize, Serialize};

use crate::resample::ensure_ordered;
use crate::rows::{
    CheckpointMetrics, KeyFields, SnapshotPoint, TimeSeriesPoint, WorldAverages, ORIGIN_EPOCH,
};

/// Evenly spaced updates `0, step, 2*step, ..` up to and including `max_update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillGrid {
    /// Spacing between grid updates; at least 1.
    pub step: u64,
    /// Last update of the grid.
    pub max_update: u64,
}

impl FillGrid {
    /// Grid updates in ascending order.
    pub fn updates(&self) -> impl Iterator<Item = u64> {
        let step = usize::try_from(self.step.max(1)).unwrap_or(usize::MAX);
        (0..=self.max_update).step_by(step)
    }
}

/// A series point addressed by an update count.
pub trait GridPoint: Clone {
    /// Update the point describes.
    fn grid_update(&self) -> u64;
    /// Copy of the point moved to `update`.
    fn at_update(&self, update: u64) -> Self;
}

impl GridPoint for TimeSeriesPoint {
    fn grid_update(&self) -> u64 {
        self.updates_elapsed
    }

    fn at_update(&self, update: u64) -> Self {
        Self {
            updates_elapsed: update,
            ..self.clone()
        }
    }
}

impl GridPoint for SnapshotPoint {
    fn grid_update(&self) -> u64 {
        self.update
    }

    fn at_update(&self, update: u64) -> Self {
        Self {
            update,
            ..self.clone()
        }
    }
}

/// Resamples `points` onto `grid`, carrying the latest point forward.
///
/// Each grid update takes the last point recorded at or before it, moved to
/// the grid update. Grid updates before the first point are left out, so a
/// run that stopped early is extended with its final state.
pub fn forward_fill<P: GridPoint>(points: &[P], grid: &FillGrid) -> Result<Vec<P>, DdeError> {
    let updates: Vec<u64> = points.iter().map(GridPoint::grid_update).collect();
    ensure_ordered(&updates)?;
    let mut filled = Vec::new();
    for update in grid.updates() {
        let recorded = updates.partition_point(|&point| point <= update);
        if recorded == 0 {
            continue;
        }
        let latest = &points[recorded - 1];
        if latest.grid_update() == update {
            filled.push(latest.clone());
        } else {
            filled.push(latest.at_update(update));
        }
    }
    Ok(filled)
}

/// A time-series point at update 0 with every metric zeroed.
pub fn origin_point(keys: &KeyFields) -> TimeSeriesPoint {
    TimeSeriesPoint {
        keys: keys.clone(),
        epoch: ORIGIN_EPOCH,
        updates_elapsed: 0,
        num_unique_selected: 0,
        entropy_selected: 0.0,
        metrics: CheckpointMetrics {
            num_pop_trait_profiles: 0,
            pop_trait_profile_entropy: 0.0,
            max_aggregate_score: 0.0,
            total_trait_coverage: 0,
            max_trait_coverage: 0,
        },
        world: WorldAverages {
            avg_num_orgs: 0.0,
            avg_gens: 0.0,
            avg_cpu_cycles_per_replication: 0.0,
            avg_org_fitness: 0.0,
        },
        generations_elapsed: 0.0,
    }
}

/// Prepends [`origin_point`] unless the series is empty or already starts at update 0.
pub fn prepend_origin(series: &mut Vec<TimeSeriesPoint>, keys: &KeyFields) {
    match series.first() {
        Some(first) if first.updates_elapsed > 0 => series.insert(0, origin_point(keys)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(update: u64, coverage: usize) -> SnapshotPoint {
        SnapshotPoint {
            keys: KeyFields(vec![("SEED".into(), "1".into())]),
            update,
            population_task_coverage: coverage,
            max_org_task_coverage: coverage,
            max_org_aggregate_score: coverage as f64,
            num_unique_task_profiles: 1,
            avg_cosine_dist_from_centroid: None,
        }
    }

    #[test]
    fn grid_includes_max_update() {
        let grid = FillGrid {
            step: 1000,
            max_update: 3000,
        };
        assert_eq!(grid.updates().collect::<Vec<_>>(), vec![0, 1000, 2000, 3000]);
    }

    #[test]
    fn early_stop_is_extended_with_final_state() {
        let points = vec![snapshot(0, 0), snapshot(1000, 2), snapshot(2000, 5)];
        let grid = FillGrid {
            step: 1000,
            max_update: 4000,
        };
        let filled = forward_fill(&points, &grid).unwrap();
        let updates: Vec<u64> = filled.iter().map(|p| p.update).collect();
        assert_eq!(updates, vec![0, 1000, 2000, 3000, 4000]);
        assert_eq!(filled[3].population_task_coverage, 5);
        assert_eq!(filled[4].population_task_coverage, 5);
    }

    #[test]
    fn updates_before_first_point_are_left_out() {
        let points = vec![snapshot(1500, 1), snapshot(2500, 3)];
        let grid = FillGrid {
            step: 1000,
            max_update: 3000,
        };
        let filled = forward_fill(&points, &grid).unwrap();
        let updates: Vec<u64> = filled.iter().map(|p| p.update).collect();
        assert_eq!(updates, vec![2000, 3000]);
        assert_eq!(filled[0].population_task_coverage, 1);
        assert_eq!(filled[1].population_task_coverage, 3);
    }

    #[test]
    fn unordered_points_are_rejected() {
        let points = vec![snapshot(2000, 1), snapshot(1000, 3)];
        let grid = FillGrid {
            step: 1000,
            max_update: 2000,
        };
        let err = forward_fill(&points, &grid).unwrap_err();
        assert_eq!(err.info().code, "resample_unordered");
    }

    #[test]
    fn origin_is_prepended_once() {
        let keys = KeyFields(vec![("SEED".into(), "1".into())]);
        let mut series = Vec::new();
        prepend_origin(&mut series, &keys);
        assert!(series.is_empty());

        let mut first = origin_point(&keys);
        first.epoch = 0;
        first.updates_elapsed = 200;
        first.entropy_selected = 1.0;
        series.push(first);
        prepend_origin(&mut series, &keys);
        prepend_origin(&mut series, &keys);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].epoch, ORIGIN_EPOCH);
        assert_eq!(series[0].updates_elapsed, 0);
        assert_eq!(series[0].entropy_selected, 0.0);
    }
}
