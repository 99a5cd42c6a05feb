#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]

//! Atomic JSON-file persistence for the strike ledger.
//!
//! The ledger is a single flat JSON object mapping string keys to either item
//! or indexer-failure records. Loads tolerate a missing or corrupt file
//! (returning an empty map); saves are atomic (`<path>.tmp` then rename).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use janitor_core::LedgerRecord;
use tracing::warn;

/// In-memory ledger backed by a JSON file on disk.
///
/// Loads happen once at startup; `save` is guarded by an internal mutex so
/// concurrent manager tasks writing after their own page never interleave a
/// partial file.
pub struct Ledger {
    path: PathBuf,
    save_lock: Mutex<()>,
}

/// Failure writing the ledger back to disk. Loads never fail: a missing or
/// corrupt file degrades to an empty map with a logged warning.
#[derive(Debug, thiserror::Error)]
#[error("failed to save strike ledger to {path}: {source}")]
pub struct SaveError {
    path: PathBuf,
    #[source]
    source: std::io::Error,
}

impl Ledger {
    /// Open a ledger backed by `path`, without yet touching the filesystem.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), save_lock: Mutex::new(()) }
    }

    /// Path this ledger persists to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the ledger map, tolerating a missing or corrupt file (I3).
    #[must_use]
    pub fn load(&self) -> HashMap<String, LedgerRecord> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to read strike ledger, starting empty");
                return HashMap::new();
            }
        };
        match serde_json::from_str::<HashMap<String, serde_json::Value>>(&raw) {
            Ok(map) => map
                .into_iter()
                .map(|(key, value)| {
                    let record = if key.contains(janitor_core::INDEXER_KEY_INFIX) {
                        serde_json::from_value(value.clone())
                            .map(LedgerRecord::Indexer)
                            .unwrap_or_else(|_| LedgerRecord::Item(janitor_core::normalize_item_entry(&value)))
                    } else {
                        LedgerRecord::Item(janitor_core::normalize_item_entry(&value))
                    };
                    (key, record)
                })
                .collect(),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "strike ledger is not valid JSON, starting empty");
                HashMap::new()
            }
        }
    }

    /// Atomically persist `map` to disk: write `<path>.tmp`, then rename over
    /// `path` (I4).
    ///
    /// # Errors
    ///
    /// Returns [`SaveError`] when the temp file cannot be written or the
    /// rename fails; the previous on-disk contents are left untouched.
    pub fn save(&self, map: &HashMap<String, LedgerRecord>) -> Result<(), SaveError> {
        let _guard = self.save_lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                let _ = fs::create_dir_all(parent);
            }
        }

        let tmp_path = self.path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(map).unwrap_or_else(|_| "{}".to_string());
        fs::write(&tmp_path, body).map_err(|source| SaveError { path: self.path.clone(), source })?;
        fs::rename(&tmp_path, &self.path).map_err(|source| SaveError { path: self.path.clone(), source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use janitor_core::{IndexerEntry, ItemEntry};
    use tempfile::tempdir;

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::new(dir.path().join("strikes.json"));
        assert!(ledger.load().is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty_with_warning() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("strikes.json");
        fs::write(&path, "not json").unwrap();
        let ledger = Ledger::new(path);
        assert!(ledger.load().is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::new(dir.path().join("strikes.json"));

        let mut map = HashMap::new();
        map.insert(
            "Sonarr:101".to_string(),
            LedgerRecord::Item(ItemEntry { count: 2, first_seen_ts: 1000, ..ItemEntry::default() }),
        );
        map.insert(
            "Sonarr:_indexer:NZBgeek".to_string(),
            LedgerRecord::Indexer(IndexerEntry { failures: 1, last_ts: 1000 }),
        );

        ledger.save(&map).unwrap();
        let loaded = ledger.load();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get("Sonarr:101").unwrap().as_item().unwrap().count, 2);
        assert_eq!(loaded.get("Sonarr:_indexer:NZBgeek").unwrap().as_indexer().unwrap().failures, 1);
    }

    #[test]
    fn save_is_atomic_via_tmp_rename() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("strikes.json");
        let ledger = Ledger::new(path.clone());
        ledger.save(&HashMap::new()).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn legacy_integer_entry_normalizes_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("strikes.json");
        fs::write(&path, r#"{"Sonarr:5": 3}"#).unwrap();
        let ledger = Ledger::new(path);
        let loaded = ledger.load();
        assert_eq!(loaded.get("Sonarr:5").unwrap().as_item().unwrap().count, 3);
    }
}
