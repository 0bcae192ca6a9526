//! Recording mock of the ingestion endpoint.

use crate::endpoint::{ImportCounts, ImportOptions, ImportOutcome, IngestEndpoint};
use crate::error::IngestError;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One recorded dispatch.
#[derive(Debug, Clone)]
pub struct RecordedImport {
    pub file: PathBuf,
    pub dry_run: bool,
}

#[derive(Default)]
struct MockIngestState {
    calls: Vec<RecordedImport>,
    /// File names that should report a failed import
    failing_files: HashSet<String>,
    /// Records actually persisted (never incremented by dry runs)
    persisted_records: usize,
    unreachable: bool,
}

/// In-memory collaborator double: records calls, simulates per-file
/// failures, and tracks persisted record counts so dry-run tests can
/// assert nothing changed.
#[derive(Default)]
pub struct MockIngestEndpoint {
    state: Mutex<MockIngestState>,
    /// Counts reported per successful file
    pub records_per_file: usize,
}

impl MockIngestEndpoint {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockIngestState::default()),
            records_per_file: 5,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockIngestState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Make imports of files with this name report failure.
    pub fn fail_file(&self, file_name: &str) {
        self.lock().failing_files.insert(file_name.to_string());
    }

    /// Simulate the endpoint going away entirely.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().unreachable = unreachable;
    }

    pub fn calls(&self) -> Vec<RecordedImport> {
        self.lock().calls.clone()
    }

    pub fn persisted_records(&self) -> usize {
        self.lock().persisted_records
    }
}

#[async_trait]
impl IngestEndpoint for MockIngestEndpoint {
    async fn import_file(
        &self,
        file: &Path,
        options: &ImportOptions,
    ) -> Result<ImportOutcome, IngestError> {
        let mut state = self.lock();
        if state.unreachable {
            return Err(IngestError::Unreachable("connection refused".to_string()));
        }
        state.calls.push(RecordedImport {
            file: file.to_path_buf(),
            dry_run: options.dry_run,
        });

        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if state.failing_files.contains(&name) {
            return Ok(ImportOutcome::failure("simulated import failure"));
        }

        if !options.dry_run {
            state.persisted_records += self.records_per_file;
        }
        Ok(ImportOutcome {
            success: true,
            counts: ImportCounts {
                records_created: self.records_per_file,
                records_reused: 0,
                errors: 0,
            },
            error: None,
        })
    }

    async fn health_check(&self) -> Result<(), IngestError> {
        if self.lock().unreachable {
            return Err(IngestError::Unreachable("connection refused".to_string()));
        }
        Ok(())
    }
}
