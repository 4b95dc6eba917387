use std::fs;
use std::path::{Path, PathBuf};

use dde_core::errors::{DdeError, ErrorInfo};
use dde_core::provenance::{AggregateProvenance, SchemaVersion};
use rayon::prelude::*;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::profile::AggregationProfile;
use crate::report::{AggregateReport, SkippedRun};
use crate::run::{derive_run, RunOutput};
use crate::writer::MultiTableWriter;

fn io_error(code: &str, path: &Path, err: impl ToString) -> DdeError {
    DdeError::Io(
        ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
    )
}

/// Lists run directories directly under `data_dir`, sorted by name.
pub fn discover_runs(data_dir: &Path, profile: &AggregationProfile) -> Result<Vec<PathBuf>, DdeError> {
    if !data_dir.is_dir() {
        return Err(DdeError::Io(
            ErrorInfo::new("data_dir_missing", "data directory does not exist")
                .with_context("path", data_dir.display().to_string()),
        ));
    }
    let mut runs = Vec::new();
    for entry in WalkDir::new(data_dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|err| io_error("data_dir_walk", data_dir, err))?;
        if !entry.file_type().is_dir() {
            continue;
        }
        if profile.is_run_dir(&entry.file_name().to_string_lossy()) {
            runs.push(entry.into_path());
        }
    }
    runs.sort();
    Ok(runs)
}

fn derive_batch(
    runs: &[PathBuf],
    profile: &AggregationProfile,
    pool: Option<&rayon::ThreadPool>,
) -> Vec<Result<RunOutput, DdeError>> {
    match pool {
        None => runs.iter().map(|run| derive_run(run, profile)).collect(),
        Some(pool) => {
            let mut ordered: Vec<(usize, Result<RunOutput, DdeError>)> = pool.install(|| {
                runs.par_iter()
                    .enumerate()
                    .map(|(index, run)| (index, derive_run(run, profile)))
                    .collect()
            });
            ordered.sort_by_key(|(index, _)| *index);
            ordered.into_iter().map(|(_, result)| result).collect()
        }
    }
}

fn run_name(run: &Path) -> String {
    run.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| run.display().to_string())
}

/// Aggregates every run under `data_dir` into the tables in `dump_dir`.
///
/// Runs whose logs cannot be derived are skipped and reported; writer
/// failures, including schema mismatches, abort the aggregation.
pub fn aggregate(
    data_dir: &Path,
    dump_dir: &Path,
    profile: &AggregationProfile,
) -> Result<AggregateReport, DdeError> {
    profile.validate()?;
    let runs = discover_runs(data_dir, profile)?;
    info!(runs = runs.len(), data_dir = %data_dir.display(), "found run directories");
    fs::create_dir_all(dump_dir).map_err(|err| io_error("dump_dir_create", dump_dir, err))?;
    let mut writer = MultiTableWriter::create(dump_dir)?;

    let pool = if profile.concurrency > 1 {
        Some(
            rayon::ThreadPoolBuilder::new()
                .num_threads(profile.concurrency)
                .build()
                .map_err(|err| io_error("thread_pool", dump_dir, err))?,
        )
    } else {
        None
    };

    let total = runs.len();
    let mut processed = Vec::new();
    let mut skipped = Vec::new();
    let mut position = 0;
    for chunk in runs.chunks(profile.concurrency.max(1)) {
        for (run, result) in chunk.iter().zip(derive_batch(chunk, profile, pool.as_ref())) {
            position += 1;
            let name = run_name(run);
            match result {
                Ok(output) => {
                    writer.append_run(&output.to_batch())?;
                    info!(run = %name, position, total, "processed run");
                    processed.push(name);
                }
                Err(err) => {
                    warn!(run = %name, position, total, reason = %err, "skipped run");
                    skipped.push(SkippedRun::new(name, err));
                }
            }
        }
    }

    info!(
        processed = processed.len(),
        skipped = skipped.len(),
        "aggregation finished"
    );
    let report = AggregateReport {
        schema_version: SchemaVersion::default(),
        provenance: AggregateProvenance::capture(data_dir)
            .with_tool("dde-agg", env!("CARGO_PKG_VERSION")),
        processed,
        skipped,
        tables: writer.summaries(),
    };
    report.persist(dump_dir)?;
    Ok(report)
}
