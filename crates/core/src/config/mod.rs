//! Configuration for the pricescout pipeline.
//!
//! Configuration can be loaded from a TOML file and/or environment
//! variables; every knob the orchestrator consumes lives here so that the
//! CLI stays a thin override layer.

mod defaults;
mod loading;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use defaults::*;

/// Returns the path to the global configuration file
///
/// The global config is stored at `~/.pricescout/config.toml`.
pub fn global_config_path() -> Result<PathBuf> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| Error::config("Unable to determine home directory".to_string()))?;
    Ok(home_dir.join(".pricescout").join("config.toml"))
}

/// Discovery and classification knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Minimum combined confidence for a file to be accepted
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Download candidate files during discovery to score their content
    #[serde(default = "default_deep_scan")]
    pub deep_scan: bool,

    /// Overall cap on discovered files for one run
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Cap on enumerated files per remote folder
    #[serde(default = "default_max_files_per_folder")]
    pub max_files_per_folder: usize,

    /// Folder names skipped during the walk (case-insensitive)
    #[serde(default = "default_excluded_folders")]
    pub excluded_folders: Vec<String>,

    /// Weight of the name-based sub-score in the combined confidence
    #[serde(default = "default_name_weight")]
    pub name_weight: f64,

    /// Weight of the content-based sub-score in the combined confidence
    #[serde(default = "default_content_weight")]
    pub content_weight: f64,

    /// Rows sampled from the first sheet for content scoring
    #[serde(default = "default_content_sample_rows")]
    pub content_sample_rows: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            deep_scan: default_deep_scan(),
            max_files: default_max_files(),
            max_files_per_folder: default_max_files_per_folder(),
            excluded_folders: default_excluded_folders(),
            name_weight: default_name_weight(),
            content_weight: default_content_weight(),
            content_sample_rows: default_content_sample_rows(),
        }
    }
}

/// Batch planning ceilings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchingConfig {
    /// Maximum files per batch
    #[serde(default = "default_batch_max_count")]
    pub max_count: usize,

    /// Maximum cumulative declared bytes per batch
    #[serde(default = "default_batch_max_bytes")]
    pub max_bytes: u64,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            max_count: default_batch_max_count(),
            max_bytes: default_batch_max_bytes(),
        }
    }
}

/// Download manager and retry knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Concurrent downloads within one batch
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,

    /// Retry attempts for one remote call after the first failure
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: usize,

    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,

    /// Per remote call timeout (listing, download)
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Soft ceiling on one batch's wall-clock; exceeding it triggers the
    /// resource-abort path
    #[serde(default = "default_batch_deadline_secs")]
    pub batch_deadline_secs: u64,

    /// Disk ceiling for one batch's scratch area
    #[serde(default = "default_max_scratch_bytes")]
    pub max_scratch_bytes: u64,

    /// Root directory for per-batch scratch areas
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Buffer capacity of the walker → classifier channel
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: default_worker_pool_size(),
            retry_attempts: default_retry_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            call_timeout_secs: default_call_timeout_secs(),
            batch_deadline_secs: default_batch_deadline_secs(),
            max_scratch_bytes: default_max_scratch_bytes(),
            scratch_dir: default_scratch_dir(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Remote store connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// `graph` for a Graph-style drive API, `local` for a local directory
    #[serde(default = "default_source")]
    pub source: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Drive identifier for the `graph` source
    #[serde(default)]
    pub drive_id: String,

    /// Environment variable holding the pre-acquired access token;
    /// token acquisition and refresh are the collaborator's concern
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Root directory for the `local` source
    #[serde(default)]
    pub local_root: Option<PathBuf>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            base_url: default_base_url(),
            drive_id: String::new(),
            token_env: default_token_env(),
            local_root: None,
        }
    }
}

/// Ingestion endpoint knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_endpoint_url")]
    pub endpoint_url: String,

    #[serde(default = "default_ingest_timeout_secs")]
    pub timeout_secs: u64,

    /// When false, downloaded files are classified and mapped but never
    /// dispatched to the ingestion endpoint
    #[serde(default = "default_auto_import")]
    pub auto_import: bool,

    /// Instruct the collaborator to skip persistence
    #[serde(default)]
    pub dry_run: bool,

    /// Forward the detected document kind to the collaborator
    #[serde(default)]
    pub classify_assist: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            endpoint_url: default_endpoint_url(),
            timeout_secs: default_ingest_timeout_secs(),
            auto_import: default_auto_import(),
            dry_run: false,
            classify_assist: false,
        }
    }
}

/// Column-mapping resolver knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Durable keyed store for confirmed mappings
    #[serde(default = "default_mapping_store_path")]
    pub store_path: PathBuf,

    /// Jaro-Winkler threshold for fuzzy header matching
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            store_path: default_mapping_store_path(),
            fuzzy_threshold: default_fuzzy_threshold(),
        }
    }
}

/// Report and checkpoint locations, plus resume control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsConfig {
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,

    #[serde(default = "default_checkpoint_path")]
    pub checkpoint_path: PathBuf,

    /// Skip batches below this index, replaying the same deterministic plan
    #[serde(default)]
    pub resume_from_batch: Option<usize>,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            reports_dir: default_reports_dir(),
            checkpoint_path: default_checkpoint_path(),
            resume_from_batch: None,
        }
    }
}

/// Main configuration structure for the pricescout pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    #[serde(default)]
    pub batching: BatchingConfig,

    #[serde(default)]
    pub download: DownloadConfig,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub mapping: MappingConfig,

    #[serde(default)]
    pub reports: ReportsConfig,
}

impl Config {
    /// Validate cross-field invariants the type system cannot express.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.discovery.min_confidence) {
            return Err(Error::config(format!(
                "discovery.min_confidence must be in [0, 1], got {}",
                self.discovery.min_confidence
            )));
        }
        if self.discovery.name_weight < 0.0 || self.discovery.content_weight < 0.0 {
            return Err(Error::config(
                "classifier weights must be non-negative".to_string(),
            ));
        }
        if self.batching.max_count == 0 {
            return Err(Error::config("batching.max_count must be > 0".to_string()));
        }
        if self.batching.max_bytes == 0 {
            return Err(Error::config("batching.max_bytes must be > 0".to_string()));
        }
        if self.download.worker_pool_size == 0 {
            return Err(Error::config(
                "download.worker_pool_size must be > 0".to_string(),
            ));
        }
        if self.remote.source != "graph" && self.remote.source != "local" {
            return Err(Error::config(format!(
                "remote.source must be 'graph' or 'local', got '{}'",
                self.remote.source
            )));
        }
        if self.remote.source == "local" && self.remote.local_root.is_none() {
            return Err(Error::config(
                "remote.local_root is required when remote.source = 'local'".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn defaults_validate() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn local_source_requires_root() {
        let mut config = Config::default();
        config.remote.source = "local".to_string();
        assert!(config.validate().is_err());

        config.remote.local_root = Some(PathBuf::from("/tmp/docs"));
        config.validate().unwrap();
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        let mut config = Config::default();
        config.discovery.min_confidence = 1.5;
        assert!(config.validate().is_err());
    }
}
