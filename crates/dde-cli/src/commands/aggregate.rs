use std::error::Error;
use std::path::PathBuf;

use clap::{Args, ValueEnum};
use dde_agg::{aggregate, load_profile, AggregationProfile, FillGrid, ResampleUnit};

/// Resampling unit accepted on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitsArg {
    Epoch,
    Update,
    Interval,
    Total,
}

impl From<UnitsArg> for ResampleUnit {
    fn from(value: UnitsArg) -> Self {
        match value {
            UnitsArg::Epoch => ResampleUnit::Epoch,
            UnitsArg::Update => ResampleUnit::Update,
            UnitsArg::Interval => ResampleUnit::Interval,
            UnitsArg::Total => ResampleUnit::Total,
        }
    }
}

#[derive(Args, Debug)]
pub struct AggregateArgs {
    /// Directory holding one sub-directory per run.
    #[arg(long)]
    pub data_dir: PathBuf,
    /// Directory receiving the aggregated tables.
    #[arg(long, default_value = ".")]
    pub dump: PathBuf,
    /// YAML aggregation profile; flags below override its values.
    #[arg(long)]
    pub profile: Option<PathBuf>,
    /// Minimum task score counted as coverage.
    #[arg(long)]
    pub trait_cov_thresh: Option<f64>,
    /// Unit of the time-series resolution.
    #[arg(long, value_enum)]
    pub units: Option<UnitsArg>,
    /// Time-series resolution (must be at least 1).
    #[arg(long)]
    pub resolution: Option<u64>,
    /// Substring identifying run directories; repeatable.
    #[arg(long = "run-marker", value_name = "MARKER")]
    pub run_markers: Vec<String>,
    /// Runs derived in parallel.
    #[arg(long)]
    pub concurrency: Option<usize>,
    /// Prepend a zeroed update-0 point to every evaluation series.
    #[arg(long)]
    pub zero_origin: bool,
    /// Update spacing of the fill grid.
    #[arg(long, requires = "fill_max_update")]
    pub fill_step: Option<u64>,
    /// Last update of the fill grid.
    #[arg(long, requires = "fill_step")]
    pub fill_max_update: Option<u64>,
}

impl AggregateArgs {
    /// Builds the effective profile from the optional file and the flags.
    pub fn resolve_profile(&self) -> Result<AggregationProfile, Box<dyn Error>> {
        let mut profile = match &self.profile {
            Some(path) => load_profile(path)?,
            None => AggregationProfile::default(),
        };
        if let Some(thresh) = self.trait_cov_thresh {
            profile.trait_cov_thresh = thresh;
        }
        if let Some(units) = self.units {
            profile.units = units.into();
        }
        if let Some(resolution) = self.resolution {
            profile.resolution = resolution;
        }
        if !self.run_markers.is_empty() {
            profile.run_markers = self.run_markers.clone();
        }
        if let Some(concurrency) = self.concurrency {
            profile.concurrency = concurrency;
        }
        if self.zero_origin {
            profile.zero_origin = true;
        }
        if let (Some(step), Some(max_update)) = (self.fill_step, self.fill_max_update) {
            profile.fill_grid = Some(FillGrid { step, max_update });
        }
        profile.validate()?;
        Ok(profile)
    }
}

pub fn run(args: &AggregateArgs) -> Result<(), Box<dyn Error>> {
    let profile = args.resolve_profile()?;
    let report = aggregate(&args.data_dir, &args.dump, &profile)?;
    println!(
        "Processed {} of {} runs.",
        report.processed.len(),
        report.total_runs()
    );
    println!("Skipped ({}):", report.skipped.len());
    for skipped in &report.skipped {
        println!(" - {}: {}", skipped.name, skipped.reason);
    }
    Ok(())
}
