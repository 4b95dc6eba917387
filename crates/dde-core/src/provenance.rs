//! Provenance and schema descriptors attached to aggregation artefacts.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Semantic version describing the schema of serialized payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Major version incremented for breaking changes.
    pub major: u32,
    /// Minor version incremented for additive changes.
    pub minor: u32,
    /// Patch version incremented for bug fixes and documentation updates.
    pub patch: u32,
}

impl SchemaVersion {
    /// Creates a new schema version descriptor.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::new(1, 0, 0)
    }
}

/// Provenance information recorded alongside every aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AggregateProvenance {
    /// Directory that was scanned for run directories.
    pub data_dir: String,
    /// ISO-8601 timestamp recording when the aggregation ran.
    pub created_at: String,
    /// Version map for all tools involved in the aggregation.
    pub tool_versions: BTreeMap<String, String>,
}

impl AggregateProvenance {
    /// Captures provenance for an aggregation over `data_dir` at the current time.
    pub fn capture(data_dir: &Path) -> Self {
        let mut tool_versions = BTreeMap::new();
        tool_versions.insert(
            "dde-core".to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );
        Self {
            data_dir: data_dir.display().to_string(),
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            tool_versions,
        }
    }

    /// Records the version of an additional tool.
    pub fn with_tool(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.tool_versions.insert(name.into(), version.into());
        self
    }
}
