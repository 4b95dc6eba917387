use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use csv::{ReaderBuilder, StringRecord, Trim};
use dde_core::errors::{DdeError, ErrorInfo};

fn malformed(code: &str, message: impl Into<String>) -> DdeError {
    DdeError::MalformedTable(ErrorInfo::new(code, message))
}

fn field_error(code: &str, column: &str, message: impl Into<String>) -> DdeError {
    DdeError::Field(ErrorInfo::new(code, message).with_context("column", column))
}

#[derive(Debug)]
struct Header {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

/// Immutable table parsed from a quoted, comma-delimited log with a header row.
#[derive(Debug, Clone)]
pub struct RawTable {
    header: Arc<Header>,
    rows: Vec<Row>,
}

/// One record of a [`RawTable`], addressable by column name.
#[derive(Debug, Clone)]
pub struct Row {
    header: Arc<Header>,
    values: Vec<String>,
}

impl RawTable {
    /// Column names in header order.
    pub fn columns(&self) -> &[String] {
        &self.header.names
    }

    /// Returns true when the header declares the column.
    pub fn has_column(&self, column: &str) -> bool {
        self.header.index.contains_key(column)
    }

    /// Rows in file order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true when the table has a header but no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every value of a column, in row order.
    pub fn column_values(&self, column: &str) -> Result<Vec<&str>, DdeError> {
        self.require_column(column)?;
        self.rows.iter().map(|row| row.require(column)).collect()
    }

    /// Fails with a field error when the header lacks `column`.
    pub fn require_column(&self, column: &str) -> Result<(), DdeError> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(field_error(
                "column_missing",
                column,
                format!("table has no column '{column}'"),
            ))
        }
    }
}

impl Row {
    /// Returns the value of `column`, if the table declares it.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.header
            .index
            .get(column)
            .map(|&idx| self.values[idx].as_str())
    }

    /// Returns the value of `column` or a field error naming it.
    pub fn require(&self, column: &str) -> Result<&str, DdeError> {
        self.get(column).ok_or_else(|| {
            field_error(
                "column_missing",
                column,
                format!("row has no column '{column}'"),
            )
        })
    }

    /// Parses the value of `column` into `T`.
    pub fn parse<T>(&self, column: &str) -> Result<T, DdeError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.require(column)?;
        raw.trim().parse::<T>().map_err(|err| {
            field_error("field_parse", column, format!("cannot parse '{raw}': {err}"))
        })
    }

    /// Iterates over `(column, value)` pairs in header order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.header
            .names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }
}

fn is_blank(record: &StringRecord) -> bool {
    record.is_empty() || (record.len() == 1 && record[0].is_empty())
}

/// Parses a table from text. The first non-blank line is the header.
///
/// Rows whose field count differs from the header are rejected rather than
/// padded or truncated.
pub fn parse_table(text: &str) -> Result<RawTable, DdeError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut header: Option<Arc<Header>> = None;
    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|err| malformed("table_parse", err.to_string()))?;
        if is_blank(&record) {
            continue;
        }
        let line = record
            .position()
            .map(|pos| pos.line().to_string())
            .unwrap_or_else(|| "?".to_string());
        match &header {
            None => header = Some(Arc::new(build_header(&record)?)),
            Some(current) => {
                if record.len() != current.names.len() {
                    return Err(DdeError::MalformedTable(
                        ErrorInfo::new(
                            "table_row_width",
                            "row column count differs from header",
                        )
                        .with_context("line", line)
                        .with_context("expected", current.names.len().to_string())
                        .with_context("found", record.len().to_string()),
                    ));
                }
                rows.push(Row {
                    header: Arc::clone(current),
                    values: record.iter().map(str::to_string).collect(),
                });
            }
        }
    }
    let header = header.ok_or_else(|| malformed("table_empty", "table has no header line"))?;
    Ok(RawTable { header, rows })
}

fn build_header(record: &StringRecord) -> Result<Header, DdeError> {
    let mut names = Vec::with_capacity(record.len());
    let mut index = HashMap::with_capacity(record.len());
    for (idx, name) in record.iter().enumerate() {
        if index.insert(name.to_string(), idx).is_some() {
            return Err(DdeError::MalformedTable(
                ErrorInfo::new("table_header_duplicate", "header repeats a column name")
                    .with_context("column", name),
            ));
        }
        names.push(name.to_string());
    }
    Ok(Header { names, index })
}

/// Reads and parses a table from disk.
pub fn read_table(path: &Path) -> Result<RawTable, DdeError> {
    let text = fs::read_to_string(path).map_err(|err| {
        DdeError::Io(
            ErrorInfo::new("table_read", "failed to read log table")
                .with_context("path", path.display().to_string())
                .with_hint(err.to_string()),
        )
    })?;
    parse_table(&text).map_err(|err| match err {
        DdeError::MalformedTable(info) => {
            DdeError::MalformedTable(info.with_context("path", path.display().to_string()))
        }
        other => other,
    })
}
