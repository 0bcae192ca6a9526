//! Trait definition for the ingestion endpoint.

use crate::error::IngestError;
use async_trait::async_trait;
use pricescout_core::{ColumnMapping, DocumentKind};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-file dispatch options.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Instruct the collaborator to skip persistence; the call path is
    /// otherwise identical and counts report what would have been created
    pub dry_run: bool,
    /// Forward the detected kind to assist the collaborator's parsing
    pub classify_assist: bool,
    pub document_kind: Option<DocumentKind>,
    /// Resolved column mapping, forwarded when available
    pub mapping: Option<ColumnMapping>,
}

/// Structured counts returned by the collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportCounts {
    #[serde(default)]
    pub records_created: usize,
    #[serde(default)]
    pub records_reused: usize,
    #[serde(default)]
    pub errors: usize,
}

/// Normalized outcome of one file's import.
///
/// A failed import is data, not an error: the batch continues with the
/// next file.
#[derive(Debug, Clone, Default)]
pub struct ImportOutcome {
    pub success: bool,
    pub counts: ImportCounts,
    pub error: Option<String>,
}

impl ImportOutcome {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            counts: ImportCounts::default(),
            error: Some(message.into()),
        }
    }
}

/// The ingestion collaborator's interface.
#[async_trait]
pub trait IngestEndpoint: Send + Sync {
    /// Dispatch one downloaded file. `Err` is reserved for dispatch-level
    /// faults (endpoint unreachable, unreadable local file); HTTP-level
    /// rejections normalize into a failed [`ImportOutcome`].
    async fn import_file(
        &self,
        file: &Path,
        options: &ImportOptions,
    ) -> Result<ImportOutcome, IngestError>;

    /// Cheap reachability probe, run once before the batch loop starts.
    async fn health_check(&self) -> Result<(), IngestError>;
}
