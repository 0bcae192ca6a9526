//! Trait definition for remote document stores.

use crate::error::RemoteError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;

/// One child of a remote folder, as reported by a listing call.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEntry {
    /// Stable identifier, usable with [`RemoteStore::download`]
    pub id: String,
    pub name: String,
    pub is_folder: bool,
    /// Declared size in bytes (0 for folders)
    pub size: u64,
    pub modified_at: Option<DateTime<Utc>>,
}

/// Capability over the remote document store.
///
/// Implementations handle their own pagination inside `list_children` and
/// surface errors classified per [`RemoteError`]; retry is the caller's
/// concern (see [`crate::with_retry`]).
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// List the immediate children of a folder path (`/` for the root).
    async fn list_children(&self, folder_path: &str) -> Result<Vec<RemoteEntry>, RemoteError>;

    /// Download one file's bytes into `dest`. Returns the bytes written.
    ///
    /// On failure implementations must not leave a partial file at `dest`.
    async fn download(&self, file_id: &str, dest: &Path) -> Result<u64, RemoteError>;
}

/// Join a folder path and a child name without doubling separators.
pub(crate) fn join_remote_path(folder: &str, name: &str) -> String {
    if folder == "/" || folder.is_empty() {
        format!("/{name}")
    } else {
        format!("{}/{name}", folder.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_handles_root_and_nested() {
        assert_eq!(join_remote_path("/", "a.xlsx"), "/a.xlsx");
        assert_eq!(join_remote_path("", "a.xlsx"), "/a.xlsx");
        assert_eq!(join_remote_path("/docs/", "a.xlsx"), "/docs/a.xlsx");
        assert_eq!(join_remote_path("/docs/sub", "a.xlsx"), "/docs/sub/a.xlsx");
    }
}
