//! Default values and functions for configuration

use std::path::PathBuf;

pub(crate) fn default_min_confidence() -> f64 {
    0.35
}

pub(crate) fn default_deep_scan() -> bool {
    false
}

pub(crate) fn default_max_files() -> usize {
    10_000
}

pub(crate) fn default_max_files_per_folder() -> usize {
    500
}

pub(crate) fn default_excluded_folders() -> Vec<String> {
    vec![
        "archive".to_string(),
        "archives".to_string(),
        "backup".to_string(),
        "old".to_string(),
        "temp".to_string(),
        "tmp".to_string(),
        "corbeille".to_string(),
    ]
}

pub(crate) fn default_name_weight() -> f64 {
    0.5
}

pub(crate) fn default_content_weight() -> f64 {
    0.7
}

pub(crate) fn default_content_sample_rows() -> usize {
    100
}

pub(crate) fn default_batch_max_count() -> usize {
    10
}

pub(crate) fn default_batch_max_bytes() -> u64 {
    100 * 1024 * 1024
}

pub(crate) fn default_worker_pool_size() -> usize {
    4
}

pub(crate) fn default_retry_attempts() -> usize {
    3
}

pub(crate) fn default_retry_base_delay_ms() -> u64 {
    500
}

pub(crate) fn default_retry_max_delay_ms() -> u64 {
    30_000
}

pub(crate) fn default_call_timeout_secs() -> u64 {
    60
}

pub(crate) fn default_batch_deadline_secs() -> u64 {
    900
}

pub(crate) fn default_max_scratch_bytes() -> u64 {
    1024 * 1024 * 1024
}

pub(crate) fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir().join("pricescout")
}

pub(crate) fn default_channel_capacity() -> usize {
    256
}

pub(crate) fn default_source() -> String {
    "graph".to_string()
}

pub(crate) fn default_base_url() -> String {
    "https://graph.microsoft.com/v1.0".to_string()
}

pub(crate) fn default_token_env() -> String {
    "PRICESCOUT_GRAPH_TOKEN".to_string()
}

pub(crate) fn default_endpoint_url() -> String {
    "http://localhost:8000/api/v1/imports".to_string()
}

pub(crate) fn default_ingest_timeout_secs() -> u64 {
    120
}

pub(crate) fn default_auto_import() -> bool {
    true
}

pub(crate) fn default_mapping_store_path() -> PathBuf {
    PathBuf::from("mappings.json")
}

pub(crate) fn default_fuzzy_threshold() -> f64 {
    0.88
}

pub(crate) fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}

pub(crate) fn default_checkpoint_path() -> PathBuf {
    PathBuf::from(".pricescout-checkpoint.json")
}
