use std::fs::{self, File, OpenOptions};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, Terminator, WriterBuilder};
use dde_core::errors::{DdeError, ErrorInfo};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::rows::Fields;

/// Logical output tables, in the order they are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    /// One row per run at the target checkpoint.
    Summary,
    /// Resampled per-run evaluation series.
    TimeSeries,
    /// Per-task population profiles in similarity order.
    Profiles,
    /// Distances between every pair of populations.
    Pairwise,
    /// Organism-level population snapshot series.
    Snapshot,
}

impl TableKind {
    /// Every table kind, in write order.
    pub const ALL: [TableKind; 5] = [
        TableKind::Summary,
        TableKind::TimeSeries,
        TableKind::Profiles,
        TableKind::Pairwise,
        TableKind::Snapshot,
    ];

    /// File name of the table inside the dump directory.
    pub fn file_name(self) -> &'static str {
        match self {
            TableKind::Summary => "experiment_summary.csv",
            TableKind::TimeSeries => "evaluation_time_series.csv",
            TableKind::Profiles => "population_profiles.csv",
            TableKind::Pairwise => "pairwise_population_comps.csv",
            TableKind::Snapshot => "pop_snapshot_time_series.csv",
        }
    }
}

fn io_error(code: &str, path: &Path, err: impl ToString) -> DdeError {
    DdeError::Io(
        ErrorInfo::new(code, "output table I/O failure")
            .with_context("path", path.display().to_string())
            .with_hint(err.to_string()),
    )
}

fn schema_mismatch(table: &str, expected: &[String], found: &[String]) -> DdeError {
    DdeError::SchemaMismatch(
        ErrorInfo::new("schema_mismatch", "output columns differ from the locked schema")
            .with_context("table", table)
            .with_context("expected", expected.join(","))
            .with_context("found", found.join(",")),
    )
}

/// Column names shared by every row of a batch; `None` for an empty batch.
pub fn batch_schema(table: &str, batch: &[Fields]) -> Result<Option<Vec<String>>, DdeError> {
    let Some(first) = batch.first() else {
        return Ok(None);
    };
    let schema: Vec<String> = first.keys().cloned().collect();
    for row in &batch[1..] {
        if !row.keys().eq(schema.iter()) {
            let found: Vec<String> = row.keys().cloned().collect();
            return Err(schema_mismatch(table, &schema, &found));
        }
    }
    Ok(Some(schema))
}

/// An append-only CSV table whose columns are fixed by the first batch written.
#[derive(Debug)]
pub struct OutputTable {
    name: String,
    path: PathBuf,
    schema: Option<Vec<String>>,
    rows_written: usize,
}

impl OutputTable {
    /// Creates (or truncates) the table file at `path`.
    pub fn create(name: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self, DdeError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| io_error("output_dir_create", parent, err))?;
        }
        File::create(&path).map_err(|err| io_error("output_truncate", &path, err))?;
        Ok(Self {
            name: name.into(),
            path,
            schema: None,
            rows_written: 0,
        })
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Locked column names, once the first batch has been written.
    pub fn schema(&self) -> Option<&[String]> {
        self.schema.as_deref()
    }

    /// Data rows written so far.
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Validates a batch against the locked schema without writing it.
    pub fn check(&self, batch: &[Fields]) -> Result<Option<Vec<String>>, DdeError> {
        let found = batch_schema(&self.name, batch)?;
        if let (Some(expected), Some(found)) = (&self.schema, &found) {
            if expected != found {
                return Err(schema_mismatch(&self.name, expected, found));
            }
        }
        Ok(found)
    }

    /// Appends a batch, writing the header first when the schema is not yet locked.
    pub fn append(&mut self, batch: &[Fields]) -> Result<usize, DdeError> {
        let Some(schema) = self.check(batch)? else {
            return Ok(0);
        };
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|err| io_error("output_open", &self.path, err))?;
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .quote_style(QuoteStyle::Necessary)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(BufWriter::new(file));
        if self.schema.is_none() {
            writer
                .write_record(&schema)
                .map_err(|err| io_error("output_write_header", &self.path, err))?;
            debug!(table = %self.name, columns = schema.len(), "locked table schema");
            self.schema = Some(schema);
        }
        for row in batch {
            writer
                .write_record(row.values().map(|cell| cell.to_string()))
                .map_err(|err| io_error("output_write_row", &self.path, err))?;
        }
        writer
            .flush()
            .map_err(|err| io_error("output_flush", &self.path, err))?;
        self.rows_written += batch.len();
        Ok(batch.len())
    }

    /// Schema and row count of the table.
    pub fn summary(&self) -> TableSummary {
        TableSummary {
            name: self.name.clone(),
            path: self.path.display().to_string(),
            columns: self.schema.clone().unwrap_or_default(),
            rows: self.rows_written,
        }
    }
}

/// Final state of one output table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSummary {
    pub name: String,
    pub path: String,
    pub columns: Vec<String>,
    pub rows: usize,
}

/// Rows derived from one run, grouped by destination table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunBatch {
    tables: Vec<(TableKind, Vec<Fields>)>,
}

impl RunBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds rows destined for `kind`.
    pub fn push(&mut self, kind: TableKind, rows: Vec<Fields>) {
        match self.tables.iter_mut().find(|(existing, _)| *existing == kind) {
            Some((_, existing)) => existing.extend(rows),
            None => self.tables.push((kind, rows)),
        }
    }

    /// Rows destined for `kind`.
    pub fn rows(&self, kind: TableKind) -> &[Fields] {
        self.tables
            .iter()
            .find(|(existing, _)| *existing == kind)
            .map(|(_, rows)| rows.as_slice())
            .unwrap_or(&[])
    }
}

/// The set of output tables of one aggregation.
#[derive(Debug)]
pub struct MultiTableWriter {
    tables: Vec<(TableKind, OutputTable)>,
}

impl MultiTableWriter {
    /// Creates every table file in `dump_dir`, truncating existing ones.
    pub fn create(dump_dir: &Path) -> Result<Self, DdeError> {
        let tables = TableKind::ALL
            .into_iter()
            .map(|kind| {
                OutputTable::create(kind.file_name(), dump_dir.join(kind.file_name()))
                    .map(|table| (kind, table))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { tables })
    }

    /// Appends every table of one run.
    ///
    /// All schemas are checked first, so a mismatch leaves every file untouched.
    pub fn append_run(&mut self, batch: &RunBatch) -> Result<(), DdeError> {
        for (kind, table) in &self.tables {
            table.check(batch.rows(*kind))?;
        }
        for (kind, table) in &mut self.tables {
            table.append(batch.rows(*kind))?;
        }
        Ok(())
    }

    /// Table of the given kind.
    pub fn table(&self, kind: TableKind) -> Option<&OutputTable> {
        self.tables
            .iter()
            .find(|(existing, _)| *existing == kind)
            .map(|(_, table)| table)
    }

    /// Summaries of every table in write order.
    pub fn summaries(&self) -> Vec<TableSummary> {
        self.tables.iter().map(|(_, table)| table.summary()).collect()
    }
}
