//! Import dispatch to the external ingestion collaborator.
//!
//! The dispatcher's own responsibility is invocation, timeout enforcement,
//! and outcome normalization; structural parsing and persistence belong to
//! the collaborator behind the HTTP endpoint.

#![deny(warnings)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod endpoint;
mod error;
mod http;
mod mock;

pub use endpoint::{ImportCounts, ImportOptions, ImportOutcome, IngestEndpoint};
pub use error::IngestError;
pub use http::HttpIngestClient;
pub use mock::MockIngestEndpoint;
