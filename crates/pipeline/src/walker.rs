//! Remote tree walker: lazy enumeration of candidate spreadsheets.
//!
//! Streams [`FileDescriptor`]s through a bounded channel so the consumer
//! controls how much of the tree is materialized; the walk stops early the
//! moment the receiver is dropped.

use pricescout_core::error::{Error, Result};
use pricescout_core::normalize::fold;
use pricescout_core::{FileDescriptor, WalkSummary};
use pricescout_remote::{with_retry, RemoteStore, RetryPolicy};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// File extensions the pipeline considers candidates.
pub const EXCEL_EXTENSIONS: [&str; 3] = ["xlsx", "xls", "xlsm"];

/// Walker knobs, derived from the discovery configuration.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Folder names to skip, matched case- and accent-insensitively
    pub excluded_folders: Vec<String>,
    /// Cap on enumerated candidate files per folder; files beyond it are
    /// counted as skipped, not an error
    pub max_files_per_folder: usize,
    pub retry: RetryPolicy,
}

fn join_path(folder: &str, name: &str) -> String {
    if folder == "/" || folder.is_empty() {
        format!("/{name}")
    } else {
        format!("{}/{name}", folder.trim_end_matches('/'))
    }
}

/// Walk the remote tree depth-first from `root_path`, sending candidate
/// descriptors into `tx`. Restartable from any sub-path.
///
/// A failed folder listing (after retries) never aborts the walk; the
/// folder is counted failed and siblings continue. Only an inaccessible
/// root or an authentication rejection is fatal.
pub async fn walk_tree(
    store: Arc<dyn RemoteStore>,
    root_path: &str,
    config: &WalkerConfig,
    tx: mpsc::Sender<FileDescriptor>,
) -> Result<WalkSummary> {
    let excluded: HashSet<String> = config.excluded_folders.iter().map(|f| fold(f)).collect();
    let mut summary = WalkSummary::default();
    let mut stack: Vec<String> = vec![root_path.to_string()];
    let mut is_root = true;

    while let Some(folder) = stack.pop() {
        let listing = with_retry(&config.retry, &format!("listing {folder}"), || {
            store.list_children(&folder)
        })
        .await;

        let entries = match listing {
            Ok(entries) => entries,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) if is_root => {
                return Err(Error::fatal(format!(
                    "root folder {root_path} inaccessible: {e}"
                )))
            }
            Err(e) => {
                warn!(folder = %folder, error = %e, "Folder listing failed, skipping");
                summary.folders_failed += 1;
                is_root = false;
                continue;
            }
        };
        is_root = false;
        summary.folders_visited += 1;

        let mut yielded_here = 0usize;
        for entry in entries {
            if entry.is_folder {
                if excluded.contains(&fold(&entry.name)) {
                    debug!(folder = %entry.name, "Excluded folder");
                    summary.folders_excluded += 1;
                } else {
                    stack.push(join_path(&folder, &entry.name));
                }
                continue;
            }

            summary.files_seen += 1;
            let extension = FileDescriptor::extension_of(&entry.name);
            if !EXCEL_EXTENSIONS.contains(&extension.as_str()) {
                summary.files_skipped_extension += 1;
                continue;
            }
            if yielded_here >= config.max_files_per_folder {
                summary.files_skipped_by_cap += 1;
                continue;
            }
            yielded_here += 1;

            let descriptor = FileDescriptor {
                id: entry.id,
                path: join_path(&folder, &entry.name),
                name: entry.name,
                folder_path: folder.clone(),
                extension,
                size: entry.size,
                modified_at: entry.modified_at,
            };
            if tx.send(descriptor).await.is_err() {
                // receiver reached its overall cap; stop enumerating
                debug!("Descriptor channel closed, ending walk early");
                return Ok(summary);
            }
        }
    }

    info!(
        folders = summary.folders_visited,
        files_seen = summary.files_seen,
        skipped_by_cap = summary.files_skipped_by_cap,
        "Remote walk complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use pricescout_remote::MockRemoteStore;
    use std::time::Duration;

    fn fast_config() -> WalkerConfig {
        WalkerConfig {
            excluded_folders: vec!["Archive".to_string()],
            max_files_per_folder: 50,
            retry: RetryPolicy::new(2, Duration::from_millis(1), Duration::from_millis(5)),
        }
    }

    async fn collect_walk(
        store: Arc<MockRemoteStore>,
        config: &WalkerConfig,
    ) -> (Vec<FileDescriptor>, WalkSummary) {
        let (tx, mut rx) = mpsc::channel(1024);
        let walk = walk_tree(store, "/", config, tx);
        let collector = async {
            let mut out = Vec::new();
            while let Some(d) = rx.recv().await {
                out.push(d);
            }
            out
        };
        let (summary, descriptors) = tokio::join!(walk, collector);
        (descriptors, summary.unwrap())
    }

    #[tokio::test]
    async fn walks_nested_folders_and_filters_extensions() {
        let store = Arc::new(MockRemoteStore::new());
        store.add_file("/", "DPGF Lot 1.xlsx", b"a");
        store.add_file("/", "readme.txt", b"b");
        let sub = store.add_folder("/", "Etudes");
        store.add_file(&sub, "BPU Lot 2.xls", b"c");

        let (descriptors, summary) = collect_walk(store, &fast_config()).await;

        let names: Vec<_> = descriptors.iter().map(|d| d.name.as_str()).collect();
        assert!(names.contains(&"DPGF Lot 1.xlsx"));
        assert!(names.contains(&"BPU Lot 2.xls"));
        assert_eq!(descriptors.len(), 2);
        assert_eq!(summary.files_seen, 3);
        assert_eq!(summary.files_skipped_extension, 1);
        assert_eq!(summary.folders_visited, 2);
    }

    #[tokio::test]
    async fn excluded_folders_are_skipped() {
        let store = Arc::new(MockRemoteStore::new());
        let archive = store.add_folder("/", "ARCHIVE");
        store.add_file(&archive, "old.xlsx", b"x");
        store.add_file("/", "current.xlsx", b"y");

        let (descriptors, summary) = collect_walk(store, &fast_config()).await;

        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].name, "current.xlsx");
        assert_eq!(summary.folders_excluded, 1);
    }

    #[tokio::test]
    async fn per_folder_cap_records_skipped_files() {
        let store = Arc::new(MockRemoteStore::new());
        for i in 0..120 {
            store.add_file("/", &format!("dpgf lot {i:03}.xlsx"), b"x");
        }
        let config = WalkerConfig {
            max_files_per_folder: 50,
            ..fast_config()
        };

        let (descriptors, summary) = collect_walk(store, &config).await;

        assert_eq!(descriptors.len(), 50);
        assert_eq!(summary.files_skipped_by_cap, 70);
    }

    #[tokio::test]
    async fn transient_listing_failure_is_retried() {
        let store = Arc::new(MockRemoteStore::new());
        store.add_file("/", "a.xlsx", b"x");
        store.fail_next_listings("/", 1);

        let (descriptors, summary) = collect_walk(store, &fast_config()).await;
        assert_eq!(descriptors.len(), 1);
        assert_eq!(summary.folders_failed, 0);
    }

    #[tokio::test]
    async fn failed_subfolder_does_not_abort_walk() {
        let store = Arc::new(MockRemoteStore::new());
        let bad = store.add_folder("/", "bad");
        store.add_file(&bad, "hidden.xlsx", b"x");
        store.add_file("/", "ok.xlsx", b"y");
        // more failures than retries
        store.fail_next_listings(&bad, 10);

        let (descriptors, summary) = collect_walk(store, &fast_config()).await;

        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].name, "ok.xlsx");
        assert_eq!(summary.folders_failed, 1);
    }

    #[tokio::test]
    async fn inaccessible_root_is_fatal() {
        let store = Arc::new(MockRemoteStore::new());
        store.fail_next_listings("/", 10);

        let (tx, _rx) = mpsc::channel(16);
        let result = walk_tree(store, "/", &fast_config(), tx).await;
        assert!(matches!(result, Err(e) if e.is_fatal()));
    }

    #[tokio::test]
    async fn dropped_receiver_ends_walk_gracefully() {
        let store = Arc::new(MockRemoteStore::new());
        for i in 0..100 {
            store.add_file("/", &format!("dpgf {i}.xlsx"), b"x");
        }

        let (tx, mut rx) = mpsc::channel(4);
        let handle = tokio::spawn({
            let store = store.clone();
            let config = fast_config();
            async move { walk_tree(store, "/", &config, tx).await }
        });

        // take a few then hang up
        for _ in 0..3 {
            rx.recv().await.unwrap();
        }
        drop(rx);

        let summary = handle.await.unwrap().unwrap();
        assert!(summary.files_seen < 100);
    }
}
