//! Local-directory implementation of [`RemoteStore`].
//!
//! Lets the same pipeline run against an already-synced folder tree, and
//! gives integration tests a store with real I/O. File ids are paths
//! relative to the root.

use crate::error::RemoteError;
use crate::store::{RemoteEntry, RemoteStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, remote_path: &str) -> PathBuf {
        let trimmed = remote_path.trim_matches('/');
        if trimmed.is_empty() {
            self.root.clone()
        } else {
            self.root.join(trimmed)
        }
    }
}

#[async_trait]
impl RemoteStore for LocalDirStore {
    async fn list_children(&self, folder_path: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
        let dir = self.resolve(folder_path);
        let mut read_dir = tokio::fs::read_dir(&dir).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RemoteError::NotFound(folder_path.to_string())
            } else {
                RemoteError::Transport(format!("read_dir {}: {e}", dir.display()))
            }
        })?;

        let mut entries = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| RemoteError::Transport(format!("read_dir {}: {e}", dir.display())))?
        {
            let metadata = entry
                .metadata()
                .await
                .map_err(|e| RemoteError::Transport(format!("metadata: {e}")))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let id = crate::store::join_remote_path(folder_path, &name);
            let modified_at = metadata.modified().ok().map(DateTime::<Utc>::from);
            entries.push(RemoteEntry {
                id,
                name,
                is_folder: metadata.is_dir(),
                size: if metadata.is_dir() { 0 } else { metadata.len() },
                modified_at,
            });
        }

        // Directory iteration order is platform-dependent; sort for the
        // deterministic planning the resume path relies on.
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn download(&self, file_id: &str, dest: &Path) -> Result<u64, RemoteError> {
        let src = self.resolve(file_id);
        match tokio::fs::copy(&src, dest).await {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                let _ = tokio::fs::remove_file(dest).await;
                if e.kind() == std::io::ErrorKind::NotFound {
                    Err(RemoteError::NotFound(file_id.to_string()))
                } else {
                    Err(RemoteError::Transport(format!(
                        "copy {} -> {}: {e}",
                        src.display(),
                        dest.display()
                    )))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[tokio::test]
    async fn lists_and_downloads_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("lots")).unwrap();
        std::fs::write(dir.path().join("lots/DPGF Lot 1.xlsx"), b"abc").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let store = LocalDirStore::new(dir.path());
        let root = store.list_children("/").await.unwrap();
        assert_eq!(root.len(), 2);
        let lots = root.iter().find(|e| e.name == "lots").unwrap();
        assert!(lots.is_folder);

        let children = store.list_children("/lots").await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].size, 3);

        let scratch = tempfile::tempdir().unwrap();
        let dest = scratch.path().join("copy.xlsx");
        let bytes = store.download(&children[0].id, &dest).await.unwrap();
        assert_eq!(bytes, 3);
        assert_eq!(std::fs::read(dest).unwrap(), b"abc");
    }

    #[tokio::test]
    async fn missing_folder_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDirStore::new(dir.path());
        let err = store.list_children("/nope").await.unwrap_err();
        assert!(matches!(err, RemoteError::NotFound(_)));
    }
}
