use std::fs;
use std::path::Path;

use dde_core::errors::{DdeError, ErrorInfo};
use serde::{Deserialize, Serialize};

use crate::fill::FillGrid;
use crate::metrics::CoverageRule;
use crate::resample::ResampleUnit;
use crate::serde::{from_yaml_slice, to_yaml_string};

/// Options controlling one aggregation, loadable from YAML.
///
/// Every field has a default, so an empty document is a valid profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationProfile {
    /// Substrings identifying run directories.
    #[serde(default = "AggregationProfile::default_run_markers")]
    pub run_markers: Vec<String>,
    /// Configuration parameters copied into every per-run row.
    #[serde(default = "AggregationProfile::default_key_config_fields")]
    pub key_config_fields: Vec<String>,
    /// Systematics columns copied into the summary when systematics are tracked.
    #[serde(default = "AggregationProfile::default_systematics_fields")]
    pub systematics_fields: Vec<String>,
    /// World-evaluation columns copied verbatim into the summary.
    #[serde(default = "AggregationProfile::default_world_eval_fields")]
    pub world_eval_fields: Vec<String>,
    /// Minimum score for a task to count as covered.
    #[serde(default = "AggregationProfile::default_trait_cov_thresh")]
    pub trait_cov_thresh: f64,
    #[serde(default = "AggregationProfile::default_units")]
    pub units: ResampleUnit,
    #[serde(default = "AggregationProfile::default_resolution")]
    pub resolution: u64,
    /// Added to `UPDATES_PER_EPOCH` when matching world summary rows of runs
    /// that do not track systematics.
    #[serde(default = "AggregationProfile::default_untracked_update_offset")]
    pub untracked_update_offset: u64,
    /// Runs derived in parallel per batch; 1 derives sequentially.
    #[serde(default = "AggregationProfile::default_concurrency")]
    pub concurrency: usize,
    /// Prepends a zeroed update-0 point to each run's evaluation series.
    #[serde(default)]
    pub zero_origin: bool,
    /// Forward-fills each run's evaluation and snapshot series onto this grid.
    #[serde(default)]
    pub fill_grid: Option<FillGrid>,
}

impl AggregationProfile {
    fn default_run_markers() -> Vec<String> {
        vec!["RUN_".to_string()]
    }

    fn default_key_config_fields() -> Vec<String> {
        ["SEED", "SELECTION_METHOD"].map(String::from).to_vec()
    }

    fn default_systematics_fields() -> Vec<String> {
        [
            "num_taxa",
            "total_orgs",
            "ave_depth",
            "num_roots",
            "mrca_depth",
            "diversity",
            "mean_genotype_pairwise_distance",
            "min_genotype_pairwise_distance",
            "max_genotype_pairwise_distance",
            "variance_genotype_pairwise_distance",
            "genotype_current_phylogenetic_diversity",
        ]
        .map(String::from)
        .to_vec()
    }

    fn default_world_eval_fields() -> Vec<String> {
        [
            "epoch",
            "aggregate_scores",
            "scores",
            "selected",
            "num_unique_selected",
        ]
        .map(String::from)
        .to_vec()
    }

    const fn default_trait_cov_thresh() -> f64 {
        100.0
    }

    const fn default_units() -> ResampleUnit {
        ResampleUnit::Epoch
    }

    const fn default_resolution() -> u64 {
        1
    }

    const fn default_untracked_update_offset() -> u64 {
        1
    }

    const fn default_concurrency() -> usize {
        1
    }

    /// Rejects option combinations that cannot drive an aggregation.
    pub fn validate(&self) -> Result<(), DdeError> {
        let invalid = |option: &str, message: &str| {
            DdeError::Config(
                ErrorInfo::new("profile_invalid", message).with_context("option", option),
            )
        };
        if self.resolution < 1 {
            return Err(invalid("resolution", "resolution must be at least 1"));
        }
        if self.concurrency < 1 {
            return Err(invalid("concurrency", "concurrency must be at least 1"));
        }
        if self.run_markers.is_empty() || self.run_markers.iter().any(String::is_empty) {
            return Err(invalid(
                "run_markers",
                "at least one non-empty run marker is required",
            ));
        }
        if !self.trait_cov_thresh.is_finite() {
            return Err(invalid(
                "trait_cov_thresh",
                "coverage threshold must be a finite number",
            ));
        }
        if self.fill_grid.is_some_and(|grid| grid.step < 1) {
            return Err(invalid("fill_grid.step", "fill grid step must be at least 1"));
        }
        Ok(())
    }

    /// Coverage rule applied to population task scores.
    pub fn coverage_rule(&self) -> CoverageRule {
        CoverageRule::AtLeast(self.trait_cov_thresh)
    }

    /// World update at which a run's per-epoch world summary rows are read.
    pub fn summary_update(&self, updates_per_epoch: u64, track_systematics: bool) -> u64 {
        if track_systematics {
            updates_per_epoch
        } else {
            updates_per_epoch.saturating_add(self.untracked_update_offset)
        }
    }

    /// Returns true when the directory name carries a run marker.
    pub fn is_run_dir(&self, name: &str) -> bool {
        self.run_markers.iter().any(|marker| name.contains(marker.as_str()))
    }
}

impl Default for AggregationProfile {
    fn default() -> Self {
        Self {
            run_markers: Self::default_run_markers(),
            key_config_fields: Self::default_key_config_fields(),
            systematics_fields: Self::default_systematics_fields(),
            world_eval_fields: Self::default_world_eval_fields(),
            trait_cov_thresh: Self::default_trait_cov_thresh(),
            units: Self::default_units(),
            resolution: Self::default_resolution(),
            untracked_update_offset: Self::default_untracked_update_offset(),
            concurrency: Self::default_concurrency(),
            zero_origin: false,
            fill_grid: None,
        }
    }
}

/// Loads a profile from a YAML file.
pub fn load_profile(path: &Path) -> Result<AggregationProfile, DdeError> {
    let bytes = fs::read(path).map_err(|err| {
        DdeError::Io(
            ErrorInfo::new("profile_read", "failed to read aggregation profile")
                .with_context("path", path.display().to_string())
                .with_hint(err.to_string()),
        )
    })?;
    from_yaml_slice(&bytes)
}

/// Renders a profile as YAML.
pub fn profile_to_yaml(profile: &AggregationProfile) -> Result<String, DdeError> {
    to_yaml_string(profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let profile: AggregationProfile = from_yaml_slice(b"{}").unwrap();
        assert_eq!(profile, AggregationProfile::default());
        assert_eq!(profile.systematics_fields.len(), 11);
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn partial_document_overrides_named_fields() {
        let profile: AggregationProfile =
            from_yaml_slice(b"units: total\nresolution: 25\nrun_markers: [REP_]\n").unwrap();
        assert_eq!(profile.units, ResampleUnit::Total);
        assert_eq!(profile.resolution, 25);
        assert!(profile.is_run_dir("REP_7"));
        assert!(!profile.is_run_dir("RUN_7"));
    }

    #[test]
    fn invalid_options_are_rejected() {
        let mut profile = AggregationProfile {
            resolution: 0,
            ..AggregationProfile::default()
        };
        assert_eq!(profile.validate().unwrap_err().info().context["option"], "resolution");
        profile.resolution = 1;
        profile.run_markers.clear();
        assert!(profile.validate().is_err());
    }

    #[test]
    fn fill_grid_is_optional_and_checked() {
        let profile: AggregationProfile =
            from_yaml_slice(b"zero_origin: true\nfill_grid: {step: 1000, max_update: 55000}\n")
                .unwrap();
        assert!(profile.zero_origin);
        assert_eq!(
            profile.fill_grid,
            Some(FillGrid {
                step: 1000,
                max_update: 55000
            })
        );
        assert!(profile.validate().is_ok());

        let zero_step = AggregationProfile {
            fill_grid: Some(FillGrid {
                step: 0,
                max_update: 10,
            }),
            ..AggregationProfile::default()
        };
        assert_eq!(
            zero_step.validate().unwrap_err().info().context["option"],
            "fill_grid.step"
        );
    }

    #[test]
    fn untracked_runs_use_offset_update() {
        let profile = AggregationProfile::default();
        assert_eq!(profile.summary_update(100, true), 100);
        assert_eq!(profile.summary_update(100, false), 101);
    }
}
