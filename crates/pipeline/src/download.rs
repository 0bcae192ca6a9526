//! Download/cleanup manager: one batch at a time, bounded concurrency,
//! guaranteed scratch removal.

use crate::cancel::CancelFlag;
use pricescout_core::error::{Error, Result};
use pricescout_core::{Batch, ClassificationResult};
use pricescout_remote::{with_retry, RemoteStore, RetryPolicy};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, warn};

/// Download manager knobs, derived from the download configuration.
#[derive(Debug, Clone)]
pub struct DownloadSettings {
    pub worker_pool_size: usize,
    pub retry: RetryPolicy,
    /// Disk ceiling for one batch's scratch area, checked against declared
    /// sizes before each download starts
    pub max_scratch_bytes: u64,
    /// Soft wall-clock ceiling for one batch
    pub batch_deadline: Duration,
    pub scratch_root: PathBuf,
}

/// Per-file result of the download phase.
pub enum FileFetch {
    Downloaded {
        result: ClassificationResult,
        local_path: PathBuf,
        bytes: u64,
    },
    /// Retries exhausted; excluded from this batch's import phase
    Failed {
        result: ClassificationResult,
        message: String,
        /// Credential rejections invalidate the whole run, not one file
        fatal: bool,
    },
    /// Not attempted: resource ceiling, batch deadline, or cancellation
    SkippedResourceLimit {
        result: ClassificationResult,
        reason: String,
    },
}

/// A batch's downloaded files plus the scratch area holding them.
///
/// The scratch `TempDir` is removed on [`BatchDownload::cleanup`] and,
/// failing that, when the value drops — local disk usage never exceeds one
/// batch's worth of files on any exit path.
pub struct BatchDownload {
    scratch: Option<TempDir>,
    pub fetched: Vec<FileFetch>,
}

impl BatchDownload {
    pub fn scratch_path(&self) -> Option<&Path> {
        self.scratch.as_ref().map(|d| d.path())
    }

    /// Remove the batch's scratch area, surfacing I/O problems.
    pub fn cleanup(mut self) -> Result<()> {
        if let Some(dir) = self.scratch.take() {
            dir.close()?;
        }
        Ok(())
    }
}

/// Downloads the files of one batch into a fresh scratch directory.
pub struct DownloadManager {
    store: Arc<dyn RemoteStore>,
    settings: DownloadSettings,
}

impl DownloadManager {
    pub fn new(store: Arc<dyn RemoteStore>, settings: DownloadSettings) -> Self {
        Self { store, settings }
    }

    /// Fetch every file of `batch`, concurrently up to the worker pool
    /// size. Per-file failures and resource skips are data in the returned
    /// [`FileFetch`] list, not errors.
    pub async fn fetch_batch(&self, batch: &Batch, cancel: &CancelFlag) -> Result<BatchDownload> {
        std::fs::create_dir_all(&self.settings.scratch_root)?;
        let scratch = TempDir::with_prefix_in(
            format!("batch-{:04}-", batch.index),
            &self.settings.scratch_root,
        )
        .map_err(|e| Error::resource_limit(format!("cannot create scratch area: {e}")))?;

        // Reserve declared sizes up front; files that would push the batch
        // over the disk ceiling are skipped, not failed.
        let mut to_fetch = Vec::new();
        let mut skipped = Vec::new();
        let mut reserved: u64 = 0;
        for file in &batch.files {
            let size = file.descriptor.size;
            if reserved + size > self.settings.max_scratch_bytes {
                warn!(
                    file = %file.descriptor.path,
                    reserved,
                    size,
                    ceiling = self.settings.max_scratch_bytes,
                    "Skipping download for scratch ceiling"
                );
                skipped.push(FileFetch::SkippedResourceLimit {
                    result: file.clone(),
                    reason: format!(
                        "scratch ceiling: {reserved} + {size} > {}",
                        self.settings.max_scratch_bytes
                    ),
                });
            } else {
                reserved += size;
                to_fetch.push(file.clone());
            }
        }

        let deadline = tokio::time::Instant::now() + self.settings.batch_deadline;
        let scratch_path = scratch.path().to_path_buf();

        let mut fetched: Vec<FileFetch> = stream::iter(to_fetch.into_iter().enumerate())
            .map(|(i, result)| {
                let store = self.store.clone();
                let retry = self.settings.retry.clone();
                let cancel = cancel.clone();
                let dest = scratch_path.join(format!(
                    "{i:04}_{}",
                    sanitize_file_name(&result.descriptor.name)
                ));
                async move {
                    if cancel.is_cancelled() {
                        return FileFetch::SkippedResourceLimit {
                            result,
                            reason: "run cancelled".to_string(),
                        };
                    }
                    if tokio::time::Instant::now() >= deadline {
                        return FileFetch::SkippedResourceLimit {
                            result,
                            reason: "batch deadline exceeded".to_string(),
                        };
                    }
                    let what = format!("download {}", result.descriptor.path);
                    match with_retry(&retry, &what, || store.download(&result.descriptor.id, &dest))
                        .await
                    {
                        Ok(bytes) => {
                            debug!(file = %result.descriptor.path, bytes, "Downloaded");
                            FileFetch::Downloaded {
                                result,
                                local_path: dest,
                                bytes,
                            }
                        }
                        Err(e) => FileFetch::Failed {
                            result,
                            fatal: e.is_fatal(),
                            message: e.to_string(),
                        },
                    }
                }
            })
            .buffer_unordered(self.settings.worker_pool_size)
            .collect()
            .await;

        fetched.extend(skipped);
        Ok(BatchDownload {
            scratch: Some(scratch),
            fetched,
        })
    }
}

/// Keep scratch file names shell- and filesystem-safe.
fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use pricescout_core::{DocumentKind, Evidence, FileDescriptor};
    use pricescout_remote::MockRemoteStore;

    fn result_for(id: &str, name: &str, size: u64) -> ClassificationResult {
        ClassificationResult {
            descriptor: FileDescriptor {
                id: id.to_string(),
                path: id.to_string(),
                name: name.to_string(),
                folder_path: "/".to_string(),
                extension: "xlsx".to_string(),
                size,
                modified_at: None,
            },
            document_kind: DocumentKind::PricingBreakdown,
            confidence: 0.8,
            name_score: 0.8,
            content_score: 0.0,
            evidence: Evidence::default(),
        }
    }

    fn settings(scratch_root: &Path) -> DownloadSettings {
        DownloadSettings {
            worker_pool_size: 2,
            retry: RetryPolicy::new(2, Duration::from_millis(1), Duration::from_millis(5)),
            max_scratch_bytes: 1024 * 1024,
            batch_deadline: Duration::from_secs(60),
            scratch_root: scratch_root.to_path_buf(),
        }
    }

    #[tokio::test]
    async fn downloads_batch_and_cleanup_removes_scratch() {
        let store = Arc::new(MockRemoteStore::new());
        let a = store.add_file("/", "a.xlsx", b"aaa");
        let b = store.add_file("/", "b.xlsx", b"bbbb");
        let root = tempfile::tempdir().unwrap();

        let manager = DownloadManager::new(store, settings(root.path()));
        let batch = Batch::new(0, vec![result_for(&a, "a.xlsx", 3), result_for(&b, "b.xlsx", 4)]);

        let download = manager
            .fetch_batch(&batch, &CancelFlag::new())
            .await
            .unwrap();

        let scratch = download.scratch_path().unwrap().to_path_buf();
        assert!(scratch.exists());
        let downloaded: Vec<_> = download
            .fetched
            .iter()
            .filter_map(|f| match f {
                FileFetch::Downloaded { local_path, bytes, .. } => {
                    Some((local_path.clone(), *bytes))
                }
                _ => None,
            })
            .collect();
        assert_eq!(downloaded.len(), 2);
        for (path, _) in &downloaded {
            assert!(path.exists());
        }

        download.cleanup().unwrap();
        assert!(!scratch.exists());
    }

    #[tokio::test]
    async fn transient_download_failure_is_retried() {
        let store = Arc::new(MockRemoteStore::new());
        let a = store.add_file("/", "a.xlsx", b"aaa");
        store.fail_next_downloads(&a, 1);
        let root = tempfile::tempdir().unwrap();

        let manager = DownloadManager::new(store.clone(), settings(root.path()));
        let batch = Batch::new(0, vec![result_for(&a, "a.xlsx", 3)]);

        let download = manager
            .fetch_batch(&batch, &CancelFlag::new())
            .await
            .unwrap();
        assert!(matches!(download.fetched[0], FileFetch::Downloaded { .. }));
        assert_eq!(store.download_calls(), 2);
        download.cleanup().unwrap();
    }

    #[tokio::test]
    async fn exhausted_retries_record_failure_without_aborting_batch() {
        let store = Arc::new(MockRemoteStore::new());
        let a = store.add_file("/", "a.xlsx", b"aaa");
        let b = store.add_file("/", "b.xlsx", b"bb");
        store.fail_next_downloads(&a, 10);
        let root = tempfile::tempdir().unwrap();

        let manager = DownloadManager::new(store, settings(root.path()));
        let batch = Batch::new(0, vec![result_for(&a, "a.xlsx", 3), result_for(&b, "b.xlsx", 2)]);

        let download = manager
            .fetch_batch(&batch, &CancelFlag::new())
            .await
            .unwrap();

        let failed = download
            .fetched
            .iter()
            .filter(|f| matches!(f, FileFetch::Failed { .. }))
            .count();
        let ok = download
            .fetched
            .iter()
            .filter(|f| matches!(f, FileFetch::Downloaded { .. }))
            .count();
        assert_eq!((failed, ok), (1, 1));
        download.cleanup().unwrap();
    }

    #[tokio::test]
    async fn scratch_ceiling_skips_remaining_files() {
        let store = Arc::new(MockRemoteStore::new());
        let a = store.add_file_with_size("/", "a.xlsx", 800);
        let b = store.add_file_with_size("/", "b.xlsx", 600);
        let root = tempfile::tempdir().unwrap();

        let mut s = settings(root.path());
        s.max_scratch_bytes = 1000;
        let manager = DownloadManager::new(store, s);
        let batch = Batch::new(
            0,
            vec![result_for(&a, "a.xlsx", 800), result_for(&b, "b.xlsx", 600)],
        );

        let download = manager
            .fetch_batch(&batch, &CancelFlag::new())
            .await
            .unwrap();

        let skipped = download
            .fetched
            .iter()
            .filter(|f| matches!(f, FileFetch::SkippedResourceLimit { .. }))
            .count();
        assert_eq!(skipped, 1);
        download.cleanup().unwrap();
    }

    #[tokio::test]
    async fn cancelled_batch_still_cleans_up() {
        let store = Arc::new(MockRemoteStore::new());
        let a = store.add_file("/", "a.xlsx", b"aaa");
        let root = tempfile::tempdir().unwrap();

        let manager = DownloadManager::new(store, settings(root.path()));
        let batch = Batch::new(0, vec![result_for(&a, "a.xlsx", 3)]);
        let cancel = CancelFlag::new();
        cancel.cancel();

        let download = manager.fetch_batch(&batch, &cancel).await.unwrap();
        let scratch = download.scratch_path().unwrap().to_path_buf();
        assert!(matches!(
            download.fetched[0],
            FileFetch::SkippedResourceLimit { .. }
        ));
        download.cleanup().unwrap();
        assert!(!scratch.exists());
    }

    #[test]
    fn sanitize_keeps_readable_names() {
        assert_eq!(
            sanitize_file_name("DPGF Lot 04 - Gros Oeuvre.xlsx"),
            "DPGF Lot 04 - Gros Oeuvre.xlsx"
        );
        assert_eq!(sanitize_file_name("a/b\\c.xlsx"), "a_b_c.xlsx");
    }
}
