use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use dde_core::errors::{DdeError, ErrorInfo};

use crate::table::RawTable;

/// Source label marking experiment-wide parameters in `run_config`.
pub const EXPERIMENT_SOURCE: &str = "experiment";

fn config_error(code: &str, parameter: &str, message: impl Into<String>) -> DdeError {
    DdeError::Config(ErrorInfo::new(code, message).with_context("parameter", parameter))
}

/// Logical configuration of a single run.
///
/// Experiment-scoped parameters are always kept. Parameters reported by the
/// individual populations are kept only when every population reported the
/// same value; any disagreement drops the parameter entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    values: BTreeMap<String, String>,
}

impl Configuration {
    /// Resolves a configuration from `(source, parameter, value)` records.
    pub fn resolve(table: &RawTable) -> Result<Self, DdeError> {
        for column in ["source", "parameter", "value"] {
            if !table.has_column(column) {
                return Err(config_error(
                    "config_column_missing",
                    column,
                    "run configuration table lacks a required column",
                ));
            }
        }

        let mut values = BTreeMap::new();
        let mut scoped: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for row in table.rows() {
            let source = row.require("source")?;
            let parameter = row.require("parameter")?;
            let value = row.require("value")?;
            if source == EXPERIMENT_SOURCE {
                values.insert(parameter.to_string(), value.to_string());
            } else {
                scoped.entry(parameter).or_default().insert(value);
            }
        }

        for (parameter, distinct) in scoped {
            if distinct.len() != 1 || values.contains_key(parameter) {
                continue;
            }
            if let Some(value) = distinct.into_iter().next() {
                values.insert(parameter.to_string(), value.to_string());
            }
        }
        Ok(Self { values })
    }

    /// Builds a configuration directly from resolved pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns the value of `parameter`, if retained.
    pub fn get(&self, parameter: &str) -> Option<&str> {
        self.values.get(parameter).map(String::as_str)
    }

    /// Returns the value of `parameter` or a configuration error.
    pub fn require(&self, parameter: &str) -> Result<&str, DdeError> {
        self.get(parameter).ok_or_else(|| {
            config_error(
                "config_missing",
                parameter,
                format!("configuration parameter '{parameter}' is missing or not shared by all populations"),
            )
        })
    }

    /// Parses the value of `parameter` into `T`.
    pub fn require_parse<T>(&self, parameter: &str) -> Result<T, DdeError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.require(parameter)?;
        raw.trim().parse::<T>().map_err(|err| {
            config_error(
                "config_parse",
                parameter,
                format!("cannot parse '{raw}': {err}"),
            )
        })
    }

    /// Interprets `parameter` as a boolean flag (`0`/`1`/`true`/`false`).
    pub fn require_flag(&self, parameter: &str) -> Result<bool, DdeError> {
        let raw = self.require(parameter)?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" => Ok(true),
            "0" | "false" => Ok(false),
            other => Err(config_error(
                "config_flag",
                parameter,
                format!("'{other}' is not a boolean flag"),
            )),
        }
    }

    /// Iterates over retained parameters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of retained parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when no parameter was retained.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
