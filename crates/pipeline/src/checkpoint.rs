//! Resume checkpoints, written after each batch's cleanup.

use chrono::{DateTime, Utc};
use pricescout_core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Progress marker surviving process restarts.
///
/// `completed_batches` is the index of the first batch a resumed run
/// should execute; `plan_fingerprint` lets the resume path detect that the
/// remote content (and therefore the deterministic plan) changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub run_id: Uuid,
    pub root_path: String,
    pub plan_fingerprint: String,
    pub completed_batches: usize,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::config(format!("cannot serialize checkpoint: {e}")))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Read a checkpoint if one exists; a corrupt file reads as `None`.
    pub fn read(path: &Path) -> Result<Option<Checkpoint>> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Ok(serde_json::from_str(&raw).ok()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn checkpoint_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state/checkpoint.json");

        let checkpoint = Checkpoint {
            run_id: Uuid::new_v4(),
            root_path: "/Documents partages".to_string(),
            plan_fingerprint: "abc123".to_string(),
            completed_batches: 3,
            updated_at: Utc::now(),
        };
        checkpoint.write(&path).unwrap();

        let loaded = Checkpoint::read(&path).unwrap().unwrap();
        assert_eq!(loaded, checkpoint);
    }

    #[test]
    fn missing_checkpoint_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Checkpoint::read(&dir.path().join("nope.json"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn corrupt_checkpoint_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        std::fs::write(&path, "{garbage").unwrap();
        assert!(Checkpoint::read(&path).unwrap().is_none());
    }
}
