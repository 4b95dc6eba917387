//! Structured error types shared across dde crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`DdeError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (paths, columns, counts, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the aggregation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum DdeError {
    /// A raw log table whose rows disagree with its header.
    #[error("malformed table: {0}")]
    MalformedTable(ErrorInfo),
    /// Missing or unparsable run configuration parameters.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Target checkpoint missing or ambiguous.
    #[error("checkpoint error: {0}")]
    Checkpoint(ErrorInfo),
    /// A list-valued or numeric log field that could not be decoded.
    #[error("field error: {0}")]
    Field(ErrorInfo),
    /// Invalid resampling request or unordered input series.
    #[error("resample error: {0}")]
    Resample(ErrorInfo),
    /// Output table schema drifted between runs.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(ErrorInfo),
    /// Filesystem failures.
    #[error("io error: {0}")]
    Io(ErrorInfo),
    /// Serialization failures.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl DdeError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            DdeError::MalformedTable(info)
            | DdeError::Config(info)
            | DdeError::Checkpoint(info)
            | DdeError::Field(info)
            | DdeError::Resample(info)
            | DdeError::SchemaMismatch(info)
            | DdeError::Io(info)
            | DdeError::Serde(info) => info,
        }
    }
}
