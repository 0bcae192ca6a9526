//! Run orchestrator: drives walker → classifier → planner once, then
//! processes batches strictly sequentially (download → import → cleanup →
//! checkpoint), aggregating everything into the RunReport.

use crate::cancel::CancelFlag;
use crate::checkpoint::Checkpoint;
use crate::download::{DownloadManager, DownloadSettings, FileFetch};
use crate::planner::{plan, plan_fingerprint};
use crate::walker::{walk_tree, WalkerConfig};
use anyhow::anyhow;
use chrono::Utc;
use pricescout_classifier::{find_header_row, read_sample, Classifier, ContentStatus, SheetSample};
use pricescout_core::error::{Error, Result};
use pricescout_core::{
    Batch, BatchOutcome, BatchStatus, ClassificationResult, Config, FileDescriptor, FileErrorKind,
    RunReport,
};
use pricescout_ingest::{ImportOptions, IngestEndpoint};
use pricescout_mapping::{MappingResolver, ResolvedMapping};
use pricescout_remote::{with_retry, RemoteStore, RetryPolicy};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[derive(Default)]
struct BatchTally {
    downloaded: usize,
    imported: usize,
    failed: usize,
    skipped: usize,
    bytes: u64,
}

/// Owns the RunReport and the current batch; everything else is injected.
pub struct Orchestrator {
    store: Arc<dyn RemoteStore>,
    endpoint: Arc<dyn IngestEndpoint>,
    classifier: Classifier,
    resolver: Arc<MappingResolver>,
    downloads: DownloadManager,
    config: Config,
    cancel: CancelFlag,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        endpoint: Arc<dyn IngestEndpoint>,
        classifier: Classifier,
        resolver: Arc<MappingResolver>,
        config: Config,
    ) -> Self {
        let settings = DownloadSettings {
            worker_pool_size: config.download.worker_pool_size,
            retry: retry_policy(&config),
            max_scratch_bytes: config.download.max_scratch_bytes,
            batch_deadline: Duration::from_secs(config.download.batch_deadline_secs),
            scratch_root: config.download.scratch_dir.clone(),
        };
        Self {
            downloads: DownloadManager::new(store.clone(), settings),
            store,
            endpoint,
            classifier,
            resolver,
            config,
            cancel: CancelFlag::new(),
        }
    }

    /// Flag an operator interrupt can trip; honored between batches at the
    /// latest.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Execute a full run. The returned report is always also written to
    /// the reports directory, fatal aborts included; `fatal` on the report
    /// tells the caller how the run ended.
    pub async fn run(&self, root_path: &str) -> Result<RunReport> {
        let mut report = RunReport::new(root_path, self.config.ingest.dry_run);
        info!(
            root = root_path,
            dry_run = self.config.ingest.dry_run,
            deep_scan = self.config.discovery.deep_scan,
            "Starting discovery and ingestion run"
        );

        if let Err(e) = self.run_inner(root_path, &mut report).await {
            error!(error = %e, "Run aborted");
            report.mark_fatal(e.to_string());
        }
        report.finish();

        match report.write_json(&self.config.reports.reports_dir) {
            Ok(path) => info!(report = %path.display(), "Run report written"),
            Err(e) => error!(error = %e, "Failed to write run report"),
        }
        Ok(report)
    }

    async fn run_inner(&self, root: &str, report: &mut RunReport) -> Result<()> {
        // An unreachable ingestion collaborator invalidates the whole run.
        self.endpoint.health_check().await.map_err(Error::from)?;

        let accepted = self.discover(root, report).await?;
        let batches = plan(
            accepted,
            self.config.batching.max_count,
            self.config.batching.max_bytes,
        );
        let fingerprint = plan_fingerprint(&batches);
        info!(
            batches = batches.len(),
            fingerprint = %fingerprint,
            "Batch plan materialized"
        );

        let start = self.config.reports.resume_from_batch.unwrap_or(0);
        if start > 0 {
            info!(resume_from_batch = start, "Resuming, earlier batches skipped");
            if let Ok(Some(checkpoint)) = Checkpoint::read(&self.config.reports.checkpoint_path) {
                if checkpoint.plan_fingerprint != fingerprint {
                    warn!(
                        "Plan differs from the checkpointed run; remote content may have changed"
                    );
                }
            }
        }

        for mut batch in batches {
            if batch.index < start {
                continue;
            }
            if self.cancel.is_cancelled() {
                info!(batch = batch.index, "Cancelled between batches");
                break;
            }
            self.process_batch(&mut batch, report).await?;

            let checkpoint = Checkpoint {
                run_id: report.run_id,
                root_path: root.to_string(),
                plan_fingerprint: fingerprint.clone(),
                completed_batches: batch.index + 1,
                updated_at: Utc::now(),
            };
            if let Err(e) = checkpoint.write(&self.config.reports.checkpoint_path) {
                warn!(error = %e, "Failed to write checkpoint");
            }
        }
        Ok(())
    }

    /// Stream the remote tree through the classifier, bounded by the
    /// overall file cap.
    async fn discover(&self, root: &str, report: &mut RunReport) -> Result<Vec<ClassificationResult>> {
        let (tx, mut rx) = mpsc::channel(self.config.download.channel_capacity);
        let walker_config = WalkerConfig {
            excluded_folders: self.config.discovery.excluded_folders.clone(),
            max_files_per_folder: self.config.discovery.max_files_per_folder,
            retry: retry_policy(&self.config),
        };
        let store = self.store.clone();
        let root_owned = root.to_string();
        let walker =
            tokio::spawn(async move { walk_tree(store, &root_owned, &walker_config, tx).await });

        let mut accepted = Vec::new();
        let mut discovered = 0usize;
        while let Some(descriptor) = rx.recv().await {
            discovered += 1;
            let result = self.classify_descriptor(&descriptor, report).await?;
            if self.classifier.accepts(&result) {
                debug!(
                    file = %result.descriptor.path,
                    kind = %result.document_kind,
                    confidence = result.confidence,
                    "Accepted candidate"
                );
                accepted.push(result);
            } else {
                report.totals.files_below_threshold += 1;
            }
            if discovered >= self.config.discovery.max_files {
                info!(
                    max_files = self.config.discovery.max_files,
                    "Overall file cap reached, stopping discovery"
                );
                break;
            }
        }
        drop(rx);

        report.walk = walker
            .await
            .map_err(|e| Error::Other(anyhow!("walker task panicked: {e}")))??;
        report.totals.files_discovered = discovered;
        report.totals.files_accepted = accepted.len();
        info!(
            discovered,
            accepted = accepted.len(),
            below_threshold = report.totals.files_below_threshold,
            "Discovery complete"
        );
        Ok(accepted)
    }

    async fn classify_descriptor(
        &self,
        descriptor: &FileDescriptor,
        report: &mut RunReport,
    ) -> Result<ClassificationResult> {
        if !self.config.discovery.deep_scan {
            return Ok(self
                .classifier
                .classify(descriptor, ContentStatus::NotRequested));
        }
        match self.sample_remote(descriptor).await {
            Ok(sample) => Ok(self
                .classifier
                .classify(descriptor, ContentStatus::Sample(&sample))),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                // unparsable or undownloadable content is a soft condition:
                // classification proceeds on the name alone
                warn!(file = %descriptor.path, error = %e, "Deep scan failed, scoring on name alone");
                report.record_file_error(
                    &descriptor.path,
                    FileErrorKind::Classification,
                    e.to_string(),
                );
                Ok(self
                    .classifier
                    .classify(descriptor, ContentStatus::Unreadable))
            }
        }
    }

    /// Pull a candidate into a throwaway scratch file and sample its first
    /// sheet. The scratch is gone when this returns.
    async fn sample_remote(&self, descriptor: &FileDescriptor) -> Result<SheetSample> {
        std::fs::create_dir_all(&self.config.download.scratch_dir)?;
        let dir = tempfile::TempDir::with_prefix_in("scan-", &self.config.download.scratch_dir)?;
        let dest = dir.path().join(format!("sample.{}", descriptor.extension));

        let retry = retry_policy(&self.config);
        with_retry(&retry, &format!("deep-scan {}", descriptor.path), || {
            self.store.download(&descriptor.id, &dest)
        })
        .await
        .map_err(Error::from)?;

        let rows = self.config.discovery.content_sample_rows;
        let sample_path = dest.clone();
        let sample = tokio::task::spawn_blocking(move || read_sample(&sample_path, rows))
            .await
            .map_err(|e| Error::Other(anyhow!("sheet sampling task panicked: {e}")))??;
        Ok(sample)
    }

    /// Download, import, and clean one batch. Cleanup runs on every path;
    /// only fatal ingest errors propagate, after cleanup.
    async fn process_batch(&self, batch: &mut Batch, report: &mut RunReport) -> Result<()> {
        let started = Instant::now();
        info!(
            batch = batch.index,
            files = batch.len(),
            declared_bytes = batch.total_bytes,
            "Processing batch"
        );

        batch.status = BatchStatus::Downloading;
        let download = self.downloads.fetch_batch(batch, &self.cancel).await?;

        batch.status = BatchStatus::Importing;
        let mut tally = BatchTally::default();
        let import_result = self
            .import_phase(&download.fetched, report, &mut tally)
            .await;

        match download.cleanup() {
            Ok(()) => {
                batch.status = if import_result.is_ok() {
                    BatchStatus::Cleaned
                } else {
                    BatchStatus::Failed
                };
            }
            Err(e) => {
                warn!(batch = batch.index, error = %e, "Scratch cleanup failed");
                batch.status = BatchStatus::Failed;
            }
        }

        report.batches.push(BatchOutcome {
            batch_index: batch.index,
            status: batch.status,
            files: batch.len(),
            downloaded: tally.downloaded,
            imported: tally.imported,
            failed: tally.failed,
            skipped_resource_limit: tally.skipped,
            bytes_downloaded: tally.bytes,
            duration_ms: started.elapsed().as_millis() as u64,
        });
        info!(
            batch = batch.index,
            downloaded = tally.downloaded,
            imported = tally.imported,
            failed = tally.failed,
            skipped = tally.skipped,
            "Batch complete"
        );
        import_result
    }

    async fn import_phase(
        &self,
        fetched: &[FileFetch],
        report: &mut RunReport,
        tally: &mut BatchTally,
    ) -> Result<()> {
        for fetch in fetched {
            match fetch {
                FileFetch::Downloaded {
                    result,
                    local_path,
                    bytes,
                } => {
                    tally.downloaded += 1;
                    tally.bytes += bytes;
                    report.totals.files_downloaded += 1;
                    report.totals.bytes_downloaded += bytes;
                    if !self.config.ingest.auto_import {
                        debug!(
                            file = %result.descriptor.path,
                            "Auto-import disabled, file left to scratch cleanup"
                        );
                        continue;
                    }
                    if self.import_one(result, local_path, report).await? {
                        tally.imported += 1;
                    } else {
                        tally.failed += 1;
                    }
                }
                FileFetch::Failed {
                    result,
                    message,
                    fatal,
                } => {
                    report.record_file_error(
                        &result.descriptor.path,
                        FileErrorKind::Download,
                        message.clone(),
                    );
                    report.totals.files_failed += 1;
                    tally.failed += 1;
                    if *fatal {
                        return Err(Error::fatal(message.clone()));
                    }
                }
                FileFetch::SkippedResourceLimit { result, reason } => {
                    warn!(file = %result.descriptor.path, reason = %reason, "File skipped");
                    report.totals.files_skipped_resource_limit += 1;
                    tally.skipped += 1;
                }
            }
        }
        Ok(())
    }

    /// Dispatch one downloaded file. `Ok(false)` is a recorded per-file
    /// failure; `Err` is reserved for faults that abort the run.
    async fn import_one(
        &self,
        result: &ClassificationResult,
        local_path: &Path,
        report: &mut RunReport,
    ) -> Result<bool> {
        let remote_path = result.descriptor.path.clone();
        let resolved = self.resolve_mapping(local_path, &remote_path, report).await;
        if resolved.as_ref().map(|r| r.low_confidence).unwrap_or(false) {
            report.totals.low_confidence_mappings += 1;
            warn!(file = %remote_path, "Ingesting under unconfirmed low-confidence mapping");
        }

        let options = ImportOptions {
            dry_run: self.config.ingest.dry_run,
            classify_assist: self.config.ingest.classify_assist,
            document_kind: Some(result.document_kind),
            mapping: resolved.map(|r| r.mapping),
        };

        match self.endpoint.import_file(local_path, &options).await {
            Ok(outcome) if outcome.success => {
                report.totals.files_imported += 1;
                report.totals.records_created += outcome.counts.records_created;
                report.totals.records_reused += outcome.counts.records_reused;
                Ok(true)
            }
            Ok(outcome) => {
                report.record_file_error(
                    &remote_path,
                    FileErrorKind::Import,
                    outcome
                        .error
                        .unwrap_or_else(|| "import failed".to_string()),
                );
                report.totals.files_failed += 1;
                Ok(false)
            }
            Err(e) if e.is_fatal() => Err(e.into()),
            Err(e) => {
                report.record_file_error(&remote_path, FileErrorKind::Import, e.to_string());
                report.totals.files_failed += 1;
                Ok(false)
            }
        }
    }

    /// Resolve the column mapping for a downloaded file. Any problem here
    /// is a soft warning; ingestion proceeds without a mapping.
    async fn resolve_mapping(
        &self,
        local_path: &Path,
        remote_path: &str,
        report: &mut RunReport,
    ) -> Option<ResolvedMapping> {
        let rows = self.config.discovery.content_sample_rows;
        let sample_path = local_path.to_path_buf();
        let sample = match tokio::task::spawn_blocking(move || read_sample(&sample_path, rows)).await
        {
            Ok(Ok(sample)) => sample,
            Ok(Err(e)) => {
                report.record_file_error(
                    remote_path,
                    FileErrorKind::Mapping,
                    format!("cannot sample sheet: {e}"),
                );
                return None;
            }
            Err(e) => {
                report.record_file_error(
                    remote_path,
                    FileErrorKind::Mapping,
                    format!("sampling task panicked: {e}"),
                );
                return None;
            }
        };

        let header_idx = find_header_row(&sample)?;
        let headers = sample.rows[header_idx].clone();
        let resolver = self.resolver.clone();
        let file = local_path.to_path_buf();
        // the resolver may block on the confirmation port
        match tokio::task::spawn_blocking(move || resolver.resolve(&file, &headers)).await {
            Ok(Ok(resolved)) => Some(resolved),
            Ok(Err(e)) => {
                report.record_file_error(remote_path, FileErrorKind::Mapping, e.to_string());
                None
            }
            Err(e) => {
                report.record_file_error(
                    remote_path,
                    FileErrorKind::Mapping,
                    format!("mapping task panicked: {e}"),
                );
                None
            }
        }
    }
}

fn retry_policy(config: &Config) -> RetryPolicy {
    RetryPolicy::new(
        config.download.retry_attempts,
        Duration::from_millis(config.download.retry_base_delay_ms),
        Duration::from_millis(config.download.retry_max_delay_ms),
    )
}
