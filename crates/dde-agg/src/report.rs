use std::fs;
use std::path::Path;

use dde_core::errors::{DdeError, ErrorInfo};
use dde_core::provenance::{AggregateProvenance, SchemaVersion};
use serde::{Deserialize, Serialize};

use crate::serde::{from_json_slice, to_canonical_json_bytes};
use crate::writer::TableSummary;

/// File name of the report inside the dump directory.
pub const REPORT_FILE: &str = "aggregate_report.json";

/// A run excluded from every output table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRun {
    /// Run directory name.
    pub name: String,
    /// One-line reason suitable for logs.
    pub reason: String,
    /// Structured error that caused the skip.
    pub error: DdeError,
}

impl SkippedRun {
    /// Records a run skipped because of `error`.
    pub fn new(name: impl Into<String>, error: DdeError) -> Self {
        Self {
            name: name.into(),
            reason: error.to_string(),
            error,
        }
    }
}

/// Outcome of one aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub schema_version: SchemaVersion,
    pub provenance: AggregateProvenance,
    /// Runs that contributed rows, in processing order.
    pub processed: Vec<String>,
    /// Runs that were skipped, in processing order.
    pub skipped: Vec<SkippedRun>,
    /// Final schema and row count of every output table.
    pub tables: Vec<TableSummary>,
}

impl AggregateReport {
    /// Number of runs considered.
    pub fn total_runs(&self) -> usize {
        self.processed.len() + self.skipped.len()
    }

    /// Writes the report as canonical JSON.
    pub fn persist(&self, dump_dir: &Path) -> Result<(), DdeError> {
        let path = dump_dir.join(REPORT_FILE);
        let bytes = to_canonical_json_bytes(self)?;
        fs::write(&path, bytes).map_err(|err| {
            DdeError::Io(
                ErrorInfo::new("report_write", "failed to write aggregation report")
                    .with_context("path", path.display().to_string())
                    .with_hint(err.to_string()),
            )
        })
    }

    /// Reads a report written by [`AggregateReport::persist`].
    pub fn load(dump_dir: &Path) -> Result<Self, DdeError> {
        let path = dump_dir.join(REPORT_FILE);
        let bytes = fs::read(&path).map_err(|err| {
            DdeError::Io(
                ErrorInfo::new("report_read", "failed to read aggregation report")
                    .with_context("path", path.display().to_string())
                    .with_hint(err.to_string()),
            )
        })?;
        from_json_slice(&bytes)
    }
}
