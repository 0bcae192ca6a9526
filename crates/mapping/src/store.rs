//! Persisted keyed store for column mappings.

use pricescout_core::error::{Error, Result};
use pricescout_core::ColumnMapping;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Keyed record store: header hash → mapping.
///
/// Loaded fully at process start, flushed on each write. Writers for
/// different hashes never conflict; the store serializes writes per
/// instance.
pub trait MappingStore: Send + Sync {
    fn get(&self, header_hash: &str) -> Option<ColumnMapping>;

    /// Insert or replace the entry for the mapping's hash and flush.
    fn put(&self, mapping: ColumnMapping) -> Result<()>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// JSON-file backed store surviving process restarts.
pub struct JsonFileMappingStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, ColumnMapping>>,
}

impl JsonFileMappingStore {
    /// Open the store, loading any existing file. A corrupt file is treated
    /// as empty with a warning rather than an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<HashMap<String, ColumnMapping>>(&raw) {
                Ok(map) => {
                    debug!(path = %path.display(), entries = map.len(), "Loaded mapping store");
                    map
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Mapping store unreadable, starting empty");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(Error::mapping(format!("cannot read mapping store: {e}"))),
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn flush(&self, entries: &HashMap<String, ColumnMapping>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| Error::mapping(format!("cannot serialize mapping store: {e}")))?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl MappingStore for JsonFileMappingStore {
    fn get(&self, header_hash: &str) -> Option<ColumnMapping> {
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(header_hash)
            .cloned()
    }

    fn put(&self, mapping: ColumnMapping) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.insert(mapping.header_hash.clone(), mapping);
        self.flush(&entries)
    }

    fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .len()
    }
}

/// Volatile store for tests and one-off runs.
#[derive(Default)]
pub struct InMemoryMappingStore {
    entries: Mutex<HashMap<String, ColumnMapping>>,
}

impl InMemoryMappingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MappingStore for InMemoryMappingStore {
    fn get(&self, header_hash: &str) -> Option<ColumnMapping> {
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(header_hash)
            .cloned()
    }

    fn put(&self, mapping: ColumnMapping) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(mapping.header_hash.clone(), mapping);
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .len()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use pricescout_core::{MappingConfidence, MappingProvenance, SemanticField};
    use std::collections::BTreeMap;

    fn mapping(hash: &str) -> ColumnMapping {
        let mut columns = BTreeMap::new();
        columns.insert(SemanticField::Designation, 1);
        columns.insert(SemanticField::Quantity, 3);
        ColumnMapping {
            header_hash: hash.to_string(),
            columns,
            confidence: MappingConfidence::High,
            provenance: MappingProvenance::OperatorConfirmed,
        }
    }

    #[test]
    fn json_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mappings.json");

        let store = JsonFileMappingStore::open(&path).unwrap();
        assert!(store.is_empty());
        store.put(mapping("hdr-abc")).unwrap();

        let reopened = JsonFileMappingStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 1);
        let loaded = reopened.get("hdr-abc").unwrap();
        assert_eq!(loaded.columns.get(&SemanticField::Designation), Some(&1));
        assert_eq!(loaded.provenance, MappingProvenance::OperatorConfirmed);
    }

    #[test]
    fn corrupt_store_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mappings.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = JsonFileMappingStore::open(&path).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn put_replaces_entry_for_same_hash() {
        let store = InMemoryMappingStore::new();
        store.put(mapping("hdr-1")).unwrap();

        let mut updated = mapping("hdr-1");
        updated.columns.insert(SemanticField::Unit, 2);
        store.put(updated).unwrap();

        assert_eq!(store.len(), 1);
        let loaded = store.get("hdr-1").unwrap();
        assert_eq!(loaded.columns.get(&SemanticField::Unit), Some(&2));
    }
}
