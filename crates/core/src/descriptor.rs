//! Remote file descriptors produced by the tree walker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity and metadata of one remote file, as enumerated by the walker.
///
/// Immutable after creation. The `id` doubles as the download handle for
/// the remote store. Descriptors are owned by the pipeline for the lifetime
/// of the batch they end up in and discarded once the batch completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// Stable remote identifier, usable with `RemoteStore::download`
    pub id: String,
    /// Full remote path including the file name
    pub path: String,
    /// Display name (base name)
    pub name: String,
    /// Remote folder this file was enumerated under
    pub folder_path: String,
    /// Lowercase extension without the leading dot (`xlsx`, `xls`, `xlsm`)
    pub extension: String,
    /// Declared size in bytes
    pub size: u64,
    /// Last-modified timestamp, when the store reports one
    pub modified_at: Option<DateTime<Utc>>,
}

impl FileDescriptor {
    /// Lowercase extension of a file name, without the dot.
    pub fn extension_of(name: &str) -> String {
        name.rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default()
    }
}
