//! In-memory mock store with scriptable failures.

use crate::error::RemoteError;
use crate::store::{join_remote_path, RemoteEntry, RemoteStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
struct MockState {
    /// folder path → children
    folders: HashMap<String, Vec<RemoteEntry>>,
    /// file id → content bytes
    contents: HashMap<String, Vec<u8>>,
    /// folder path → remaining transient listing failures
    listing_failures: HashMap<String, usize>,
    /// file id → remaining transient download failures
    download_failures: HashMap<String, usize>,
}

/// Scriptable in-memory [`RemoteStore`] for tests.
#[derive(Default)]
pub struct MockRemoteStore {
    state: Mutex<MockState>,
    list_calls: AtomicUsize,
    download_calls: AtomicUsize,
}

impl MockRemoteStore {
    pub fn new() -> Self {
        let mut store = Self::default();
        store
            .state
            .get_mut()
            .unwrap_or_else(|p| p.into_inner())
            .folders
            .insert("/".to_string(), Vec::new());
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Register a folder under `parent`. Returns the new folder's path.
    pub fn add_folder(&self, parent: &str, name: &str) -> String {
        let path = join_remote_path(parent, name);
        let mut state = self.lock();
        state.folders.entry(path.clone()).or_default();
        state
            .folders
            .entry(parent.to_string())
            .or_default()
            .push(RemoteEntry {
                id: path.clone(),
                name: name.to_string(),
                is_folder: true,
                size: 0,
                modified_at: None,
            });
        path
    }

    /// Register a file under `folder` with the given content. Returns its id.
    pub fn add_file(&self, folder: &str, name: &str, content: &[u8]) -> String {
        let id = join_remote_path(folder, name);
        let mut state = self.lock();
        state.contents.insert(id.clone(), content.to_vec());
        state
            .folders
            .entry(folder.to_string())
            .or_default()
            .push(RemoteEntry {
                id: id.clone(),
                name: name.to_string(),
                is_folder: false,
                size: content.len() as u64,
                modified_at: None,
            });
        id
    }

    /// Register a file whose declared size differs from its content (or has
    /// no content at all) — useful for planner-only tests.
    pub fn add_file_with_size(&self, folder: &str, name: &str, size: u64) -> String {
        let id = join_remote_path(folder, name);
        let mut state = self.lock();
        state.contents.insert(id.clone(), vec![0u8; size as usize]);
        state
            .folders
            .entry(folder.to_string())
            .or_default()
            .push(RemoteEntry {
                id: id.clone(),
                name: name.to_string(),
                is_folder: false,
                size,
                modified_at: None,
            });
        id
    }

    /// Make the next `count` listings of `folder` fail with a 503.
    pub fn fail_next_listings(&self, folder: &str, count: usize) {
        self.lock()
            .listing_failures
            .insert(folder.to_string(), count);
    }

    /// Make the next `count` downloads of `file_id` fail with a timeout.
    pub fn fail_next_downloads(&self, file_id: &str, count: usize) {
        self.lock()
            .download_failures
            .insert(file_id.to_string(), count);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteStore for MockRemoteStore {
    async fn list_children(&self, folder_path: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock();
        if let Some(remaining) = state.listing_failures.get_mut(folder_path) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(RemoteError::Server {
                    status: 503,
                    message: "injected listing failure".to_string(),
                });
            }
        }
        state
            .folders
            .get(folder_path)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(folder_path.to_string()))
    }

    async fn download(&self, file_id: &str, dest: &Path) -> Result<u64, RemoteError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        let content = {
            let mut state = self.lock();
            if let Some(remaining) = state.download_failures.get_mut(file_id) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(RemoteError::Timeout(format!("download {file_id}")));
                }
            }
            state
                .contents
                .get(file_id)
                .cloned()
                .ok_or_else(|| RemoteError::NotFound(file_id.to_string()))?
        };
        tokio::fs::write(dest, &content)
            .await
            .map_err(|e| RemoteError::Transport(format!("write {}: {e}", dest.display())))?;
        Ok(content.len() as u64)
    }
}
