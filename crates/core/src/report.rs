//! The RunReport: the sole artifact persisted for audit.

use crate::batch::BatchStatus;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Cumulative counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTotals {
    pub files_discovered: usize,
    pub files_accepted: usize,
    pub files_below_threshold: usize,
    pub files_downloaded: usize,
    pub bytes_downloaded: u64,
    pub files_imported: usize,
    pub files_failed: usize,
    pub files_skipped_resource_limit: usize,
    pub records_created: usize,
    pub records_reused: usize,
    /// Files ingested under an unconfirmed LOW-confidence column mapping
    pub low_confidence_mappings: usize,
}

/// What the tree walker saw, independent of classification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkSummary {
    pub folders_visited: usize,
    pub folders_failed: usize,
    pub folders_excluded: usize,
    pub files_seen: usize,
    pub files_skipped_extension: usize,
    pub files_skipped_by_cap: usize,
}

impl WalkSummary {
    pub fn merge(&mut self, other: &WalkSummary) {
        self.folders_visited += other.folders_visited;
        self.folders_failed += other.folders_failed;
        self.folders_excluded += other.folders_excluded;
        self.files_seen += other.files_seen;
        self.files_skipped_extension += other.files_skipped_extension;
        self.files_skipped_by_cap += other.files_skipped_by_cap;
    }
}

/// Category of a per-file error record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileErrorKind {
    Download,
    Import,
    Classification,
    Mapping,
}

/// One recorded per-file failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileErrorRecord {
    pub timestamp: DateTime<Utc>,
    /// Remote path of the affected file
    pub path: String,
    pub kind: FileErrorKind,
    pub message: String,
}

/// Outcome of one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub batch_index: usize,
    pub status: BatchStatus,
    pub files: usize,
    pub downloaded: usize,
    pub imported: usize,
    pub failed: usize,
    pub skipped_resource_limit: usize,
    pub bytes_downloaded: u64,
    pub duration_ms: u64,
}

/// Structured report for one pipeline run.
///
/// Built incrementally by the orchestrator (the single writer), written to
/// the reports directory at run end and on fatal abort, immutable after.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Remote root the walk started from
    pub root_path: String,
    pub dry_run: bool,
    /// Set when a critical error aborted the run
    pub fatal: bool,
    pub fatal_error: Option<String>,
    pub totals: RunTotals,
    pub walk: WalkSummary,
    pub batches: Vec<BatchOutcome>,
    pub file_errors: Vec<FileErrorRecord>,
}

impl RunReport {
    pub fn new(root_path: impl Into<String>, dry_run: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            root_path: root_path.into(),
            dry_run,
            fatal: false,
            fatal_error: None,
            totals: RunTotals::default(),
            walk: WalkSummary::default(),
            batches: Vec::new(),
            file_errors: Vec::new(),
        }
    }

    pub fn record_file_error(
        &mut self,
        path: impl Into<String>,
        kind: FileErrorKind,
        message: impl Into<String>,
    ) {
        self.file_errors.push(FileErrorRecord {
            timestamp: Utc::now(),
            path: path.into(),
            kind,
            message: message.into(),
        });
    }

    pub fn mark_fatal(&mut self, message: impl Into<String>) {
        self.fatal = true;
        self.fatal_error = Some(message.into());
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Serialize the report as JSON into `reports_dir`, creating the
    /// directory if needed. Returns the written path.
    pub fn write_json(&self, reports_dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(reports_dir)?;
        let path = reports_dir.join(format!("run_{}.json", self.run_id));
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to serialize run report: {e}")))?;
        std::fs::write(&path, json)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn report_roundtrips_through_json() {
        let mut report = RunReport::new("/Documents partages", true);
        report.totals.files_discovered = 12;
        report.record_file_error(
            "/Documents partages/DPGF Lot 1.xlsx",
            FileErrorKind::Download,
            "timeout",
        );
        report.finish();

        let dir = tempfile::tempdir().unwrap();
        let path = report.write_json(dir.path()).unwrap();
        let raw = std::fs::read_to_string(path).unwrap();
        let back: RunReport = serde_json::from_str(&raw).unwrap();

        assert_eq!(back.run_id, report.run_id);
        assert_eq!(back.totals.files_discovered, 12);
        assert_eq!(back.file_errors.len(), 1);
        assert_eq!(back.file_errors[0].kind, FileErrorKind::Download);
    }

    #[test]
    fn fatal_reports_keep_partial_totals() {
        let mut report = RunReport::new("/root", false);
        report.totals.files_discovered = 3;
        report.mark_fatal("authentication rejected (401)");

        assert!(report.fatal);
        assert_eq!(report.totals.files_discovered, 3);
        assert_eq!(
            report.fatal_error.as_deref(),
            Some("authentication rejected (401)")
        );
    }
}
