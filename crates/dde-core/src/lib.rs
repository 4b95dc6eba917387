#![deny(missing_docs)]
#![doc = "Shared error and provenance types for the dde replicate-log aggregation tools."]

pub mod errors;
pub mod provenance;

pub use errors::{DdeError, ErrorInfo};
pub use provenance::{AggregateProvenance, SchemaVersion};
