//! pricescout CLI - discovery and batched ingestion of procurement
//! pricing spreadsheets from a remote document store.

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

mod confirm;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use confirm::DialoguerConfirm;
use pricescout_classifier::{Classifier, ClassifierConfig, ContentStatus};
use pricescout_core::{Config, RunReport};
use pricescout_ingest::HttpIngestClient;
use pricescout_mapping::{
    AutoDeclineConfirm, ConfirmMapping, JsonFileMappingStore, MappingResolver, MappingStore,
};
use pricescout_pipeline::{plan, walk_tree, Checkpoint, Orchestrator, WalkerConfig};
use pricescout_remote::{
    GraphDriveStore, LocalDirStore, RemoteStore, RetryPolicy, StaticTokenSource,
};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

#[derive(Parser)]
#[command(name = "pricescout")]
#[command(about = "Discovers, scores, and ingests procurement pricing spreadsheets")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover, download, and import pricing documents batch by batch
    Run {
        /// Remote root folder to walk
        #[arg(long, default_value = "/")]
        root: String,

        /// Identical pipeline, but the collaborator skips persistence
        #[arg(long)]
        dry_run: bool,

        /// Also score file contents (downloads each candidate once)
        #[arg(long)]
        deep_scan: bool,

        /// Minimum combined confidence for acceptance
        #[arg(long)]
        min_confidence: Option<f64>,

        /// Overall cap on discovered files
        #[arg(long)]
        max_files: Option<usize>,

        /// Continue from the last checkpoint
        #[arg(long)]
        resume: bool,

        /// Skip batches below this index of the deterministic plan
        #[arg(long, conflicts_with = "resume")]
        resume_from_batch: Option<usize>,

        /// Never prompt; unconfirmed mappings proceed tagged
        #[arg(long)]
        non_interactive: bool,

        /// Download and classify only, skip import dispatch
        #[arg(long)]
        download_only: bool,
    },
    /// Discover and print the batch plan without downloading anything
    Plan {
        #[arg(long, default_value = "/")]
        root: String,

        #[arg(long)]
        min_confidence: Option<f64>,

        #[arg(long)]
        max_files: Option<usize>,
    },
    /// Inspect or clear the persisted column-mapping store
    #[command(subcommand)]
    Mappings(MappingCommands),
}

#[derive(Subcommand)]
enum MappingCommands {
    /// Show store statistics
    Stats,
    /// Remove every persisted mapping (requires confirmation)
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Run {
            root,
            dry_run,
            deep_scan,
            min_confidence,
            max_files,
            resume,
            resume_from_batch,
            non_interactive,
            download_only,
        }) => {
            let mut config = Config::load(cli.config.as_deref())?;
            config.ingest.dry_run |= dry_run;
            config.discovery.deep_scan |= deep_scan;
            if let Some(value) = min_confidence {
                config.discovery.min_confidence = value;
            }
            if let Some(value) = max_files {
                config.discovery.max_files = value;
            }
            if download_only {
                config.ingest.auto_import = false;
            }
            if let Some(index) = resume_from_batch {
                config.reports.resume_from_batch = Some(index);
            } else if resume {
                let checkpoint = Checkpoint::read(&config.reports.checkpoint_path)?
                    .ok_or_else(|| anyhow!("no checkpoint found to resume from"))?;
                config.reports.resume_from_batch = Some(checkpoint.completed_batches);
            }
            config.validate()?;
            run(&root, config, non_interactive).await
        }
        Some(Commands::Plan {
            root,
            min_confidence,
            max_files,
        }) => {
            let mut config = Config::load(cli.config.as_deref())?;
            if let Some(value) = min_confidence {
                config.discovery.min_confidence = value;
            }
            if let Some(value) = max_files {
                config.discovery.max_files = value;
            }
            config.validate()?;
            print_plan(&root, config).await
        }
        Some(Commands::Mappings(command)) => {
            let config = Config::load(cli.config.as_deref())?;
            handle_mappings(command, config)
        }
        None => {
            println!("Run 'pricescout run' to start a discovery run, or --help for options");
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("pricescout={level},pricescout_core={level},pricescout_remote={level},pricescout_classifier={level},pricescout_mapping={level},pricescout_ingest={level},pricescout_pipeline={level}"))
        .init();
}

async fn run(root: &str, config: Config, non_interactive: bool) -> Result<()> {
    let store = build_store(&config)?;
    let endpoint = Arc::new(
        HttpIngestClient::new(
            &config.ingest.endpoint_url,
            Duration::from_secs(config.ingest.timeout_secs),
        )
        .map_err(|e| anyhow!("cannot build ingest client: {e}"))?,
    );
    let classifier = build_classifier(&config)?;

    let mapping_store: Arc<dyn MappingStore> =
        Arc::new(JsonFileMappingStore::open(&config.mapping.store_path)?);
    let confirm: Arc<dyn ConfirmMapping> = if non_interactive {
        Arc::new(AutoDeclineConfirm)
    } else {
        Arc::new(DialoguerConfirm)
    };
    let resolver = Arc::new(MappingResolver::new(
        mapping_store,
        confirm,
        config.mapping.fuzzy_threshold,
    ));

    let orchestrator = Orchestrator::new(store, endpoint, classifier, resolver, config);

    let cancel = orchestrator.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; finishing the current batch then stopping");
            cancel.cancel();
        }
    });

    let report = orchestrator.run(root).await?;
    print_summary(&report);

    if report.fatal {
        bail!(
            "run aborted: {}",
            report.fatal_error.as_deref().unwrap_or("unknown fatal error")
        );
    }
    Ok(())
}

async fn print_plan(root: &str, config: Config) -> Result<()> {
    let store = build_store(&config)?;
    let classifier = build_classifier(&config)?;

    let (tx, mut rx) = mpsc::channel(config.download.channel_capacity);
    let walker_config = WalkerConfig {
        excluded_folders: config.discovery.excluded_folders.clone(),
        max_files_per_folder: config.discovery.max_files_per_folder,
        retry: RetryPolicy::new(
            config.download.retry_attempts,
            Duration::from_millis(config.download.retry_base_delay_ms),
            Duration::from_millis(config.download.retry_max_delay_ms),
        ),
    };
    let walker_store = store.clone();
    let walker_root = root.to_string();
    let walker = tokio::spawn(async move {
        walk_tree(walker_store, &walker_root, &walker_config, tx).await
    });

    let mut accepted = Vec::new();
    let mut discovered = 0usize;
    while let Some(descriptor) = rx.recv().await {
        discovered += 1;
        let result = classifier.classify(&descriptor, ContentStatus::NotRequested);
        if classifier.accepts(&result) {
            accepted.push(result);
        }
        if discovered >= config.discovery.max_files {
            break;
        }
    }
    drop(rx);
    let summary = walker
        .await
        .map_err(|e| anyhow!("walker task panicked: {e}"))??;

    let batches = plan(
        accepted,
        config.batching.max_count,
        config.batching.max_bytes,
    );

    println!(
        "Discovered {discovered} candidate files in {} folders ({} accepted)",
        summary.folders_visited,
        batches.iter().map(|b| b.len()).sum::<usize>()
    );
    for batch in &batches {
        println!(
            "  batch {:>3}: {:>3} files, {:>8} KB",
            batch.index,
            batch.len(),
            batch.total_bytes / 1024
        );
        for file in &batch.files {
            println!(
                "      {:.2}  {:<22} {}",
                file.confidence,
                file.document_kind.as_str(),
                file.descriptor.path
            );
        }
    }
    if summary.files_skipped_by_cap > 0 {
        println!(
            "note: {} files skipped by the per-folder cap",
            summary.files_skipped_by_cap
        );
    }
    Ok(())
}

fn handle_mappings(command: MappingCommands, config: Config) -> Result<()> {
    match command {
        MappingCommands::Stats => {
            let store = JsonFileMappingStore::open(&config.mapping.store_path)?;
            println!(
                "{} persisted mapping(s) in {}",
                store.len(),
                config.mapping.store_path.display()
            );
            Ok(())
        }
        MappingCommands::Clear => {
            let store = JsonFileMappingStore::open(&config.mapping.store_path)?;
            if store.is_empty() {
                println!("mapping store is already empty");
                return Ok(());
            }
            let confirmed = dialoguer::Confirm::new()
                .with_prompt(format!("Delete {} persisted mapping(s)?", store.len()))
                .default(false)
                .interact()
                .unwrap_or(false);
            if !confirmed {
                println!("aborted");
                return Ok(());
            }
            match std::fs::remove_file(&config.mapping.store_path) {
                Ok(()) => println!("mapping store cleared"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    println!("mapping store is already empty")
                }
                Err(e) => return Err(e.into()),
            }
            Ok(())
        }
    }
}

fn build_store(config: &Config) -> Result<Arc<dyn RemoteStore>> {
    match config.remote.source.as_str() {
        "local" => {
            let root = config
                .remote
                .local_root
                .clone()
                .ok_or_else(|| anyhow!("remote.local_root is required for the local source"))?;
            Ok(Arc::new(LocalDirStore::new(root)))
        }
        _ => {
            if config.remote.drive_id.is_empty() {
                bail!("remote.drive_id must be configured for the graph source");
            }
            let token = env::var(&config.remote.token_env).with_context(|| {
                format!(
                    "environment variable {} must hold the remote access token",
                    config.remote.token_env
                )
            })?;
            let store = GraphDriveStore::new(
                &config.remote.base_url,
                &config.remote.drive_id,
                Box::new(StaticTokenSource::new(token)),
                Duration::from_secs(config.download.call_timeout_secs),
            )
            .map_err(|e| anyhow!("cannot build remote client: {e}"))?;
            Ok(Arc::new(store))
        }
    }
}

fn build_classifier(config: &Config) -> Result<Classifier> {
    Classifier::new(ClassifierConfig {
        min_confidence: config.discovery.min_confidence,
        name_weight: config.discovery.name_weight,
        content_weight: config.discovery.content_weight,
        fuzzy_threshold: config.mapping.fuzzy_threshold,
    })
    .map_err(|e| anyhow!("cannot build classifier: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}

fn print_summary(report: &RunReport) {
    println!();
    println!("run {} — {}", report.run_id, if report.fatal { "FATAL" } else { "complete" });
    println!("  discovered:        {}", report.totals.files_discovered);
    println!("  accepted:          {}", report.totals.files_accepted);
    println!("  below threshold:   {}", report.totals.files_below_threshold);
    println!("  downloaded:        {} ({} bytes)", report.totals.files_downloaded, report.totals.bytes_downloaded);
    println!("  imported:          {}", report.totals.files_imported);
    println!("  failed:            {}", report.totals.files_failed);
    println!("  skipped (limits):  {}", report.totals.files_skipped_resource_limit);
    println!("  records created:   {}", report.totals.records_created);
    println!("  records reused:    {}", report.totals.records_reused);
    if report.totals.low_confidence_mappings > 0 {
        println!(
            "  WARNING: {} file(s) ingested under unconfirmed low-confidence mappings",
            report.totals.low_confidence_mappings
        );
    }
    if report.dry_run {
        println!("  (dry run: nothing was persisted)");
    }
}
