//! Shared data model, configuration, and error types for the pricescout
//! discovery and ingestion pipeline.

#![deny(warnings)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod batch;
pub mod classification;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod mapping;
pub mod normalize;
pub mod report;

pub use batch::{Batch, BatchStatus};
pub use classification::{ClassificationResult, DocumentKind, Evidence};
pub use config::Config;
pub use descriptor::FileDescriptor;
pub use error::{Error, Result};
pub use mapping::{ColumnMapping, MappingConfidence, MappingProvenance, SemanticField};
pub use report::{
    BatchOutcome, FileErrorKind, FileErrorRecord, RunReport, RunTotals, WalkSummary,
};
