//! Batches: the unit of resource accounting and cleanup.

use crate::classification::ClassificationResult;
use serde::{Deserialize, Serialize};

/// Lifecycle of a batch through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Pending,
    Downloading,
    Importing,
    Cleaned,
    Failed,
}

/// An ordered group of accepted files processed together.
///
/// Constructed once by the planner; cumulative declared size stays within
/// the configured byte ceiling and the count within the file ceiling
/// (except for a single file that alone exceeds the byte ceiling, which is
/// placed in a batch of its own).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    /// Monotonically increasing index within the run's plan
    pub index: usize,
    pub files: Vec<ClassificationResult>,
    /// Sum of the declared sizes of `files`
    pub total_bytes: u64,
    pub status: BatchStatus,
}

impl Batch {
    pub fn new(index: usize, files: Vec<ClassificationResult>) -> Self {
        let total_bytes = files.iter().map(|f| f.descriptor.size).sum();
        Self {
            index,
            files,
            total_bytes,
            status: BatchStatus::Pending,
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
