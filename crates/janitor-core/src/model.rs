//! Strike ledger entry shapes, keyed per spec: `"<manager>:<id>"` for items and
//! `"<manager>:_indexer:<name>"` for per-indexer failure counters.

use serde::{Deserialize, Serialize};

/// Prefix that disambiguates an indexer-failure key from an item key within
/// the single flat ledger map.
pub const INDEXER_KEY_INFIX: &str = ":_indexer:";

/// Build the ledger key for a queue item: `"<manager>:<id>"`.
#[must_use]
pub fn ledger_key(manager: &str, id: i64) -> String {
    format!("{manager}:{id}")
}

/// Build the ledger key for a per-indexer failure counter.
#[must_use]
pub fn indexer_key(manager: &str, indexer: &str) -> String {
    format!("{manager}{INDEXER_KEY_INFIX}{indexer}")
}

/// Cross-cycle bookkeeping for one queue item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemEntry {
    /// Current strike count.
    #[serde(default)]
    pub count: u32,
    /// Bytes downloaded at the last observation.
    #[serde(default)]
    pub last_dl: Option<u64>,
    /// Unix seconds of first observation; set once, never reset.
    #[serde(default)]
    pub first_seen_ts: i64,
    /// Unix seconds of the last observed byte-delta.
    #[serde(default)]
    pub last_progress_ts: Option<i64>,
    /// Seeder count at the last observation.
    #[serde(default)]
    pub last_seen_seeders: Option<i64>,
    /// Last decision reason recorded for this item.
    #[serde(default)]
    pub last_reason: Option<String>,
    /// Unix seconds of the last reannounce attempt.
    #[serde(default)]
    pub last_reannounce_ts: Option<i64>,
    /// Count of reannounce attempts made so far.
    #[serde(default)]
    pub reannounce_attempts: u32,
    /// Tracker-error persistence counter.
    #[serde(default)]
    pub error_strikes: u32,
}

impl Default for ItemEntry {
    fn default() -> Self {
        Self {
            count: 0,
            last_dl: None,
            first_seen_ts: 0,
            last_progress_ts: None,
            last_seen_seeders: None,
            last_reason: None,
            last_reannounce_ts: None,
            reannounce_attempts: 0,
            error_strikes: 0,
        }
    }
}

impl ItemEntry {
    /// Build a fresh entry observed for the first time at `now`.
    #[must_use]
    pub const fn first_seen(now: i64) -> Self {
        Self {
            count: 0,
            last_dl: None,
            first_seen_ts: now,
            last_progress_ts: None,
            last_seen_seeders: None,
            last_reason: None,
            last_reannounce_ts: None,
            reannounce_attempts: 0,
            error_strikes: 0,
        }
    }
}

/// Per-indexer failure counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IndexerEntry {
    /// Cumulative failure count attributed to this indexer.
    #[serde(default)]
    pub failures: u32,
    /// Unix seconds of the most recent failure.
    #[serde(default)]
    pub last_ts: i64,
}

/// One entry in the ledger map: either a per-item record or a per-indexer
/// failure counter, disambiguated by key prefix rather than a serde tag so
/// the on-disk shape stays a flat `string -> object` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LedgerRecord {
    /// A per-item strike record.
    Item(ItemEntry),
    /// A per-indexer failure counter.
    Indexer(IndexerEntry),
}

impl LedgerRecord {
    /// View this record as an item entry, if it is one.
    #[must_use]
    pub const fn as_item(&self) -> Option<&ItemEntry> {
        match self {
            Self::Item(entry) => Some(entry),
            Self::Indexer(_) => None,
        }
    }

    /// View this record as an indexer entry, if it is one.
    #[must_use]
    pub const fn as_indexer(&self) -> Option<&IndexerEntry> {
        match self {
            Self::Indexer(entry) => Some(entry),
            Self::Item(_) => None,
        }
    }
}

/// Parse a legacy or current-shape JSON value into an `ItemEntry`.
///
/// The ledger's very first shape stored a bare integer strike count; this
/// coerces that (and any entry missing newer fields) into the current shape,
/// filling defaults. Idempotent: normalizing an already-normalized entry is a
/// no-op.
#[must_use]
pub fn normalize_item_entry(raw: &serde_json::Value) -> ItemEntry {
    if let Some(count) = raw.as_i64() {
        return ItemEntry {
            count: u32::try_from(count.max(0)).unwrap_or(u32::MAX),
            ..ItemEntry::default()
        };
    }
    serde_json::from_value(raw.clone()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ledger_key_shape() {
        assert_eq!(ledger_key("Sonarr", 101), "Sonarr:101");
        assert_eq!(indexer_key("Sonarr", "NZBgeek"), "Sonarr:_indexer:NZBgeek");
    }

    #[test]
    fn normalize_legacy_integer_shape() {
        let entry = normalize_item_entry(&json!(3));
        assert_eq!(entry.count, 3);
        assert_eq!(entry.first_seen_ts, 0);
    }

    #[test]
    fn normalize_is_idempotent() {
        let entry = normalize_item_entry(&json!({"count": 2, "first_seen_ts": 100}));
        let once = serde_json::to_value(&entry).unwrap();
        let twice = normalize_item_entry(&once);
        assert_eq!(entry, twice);
    }

    #[test]
    fn normalize_fills_defaults_for_missing_fields() {
        let entry = normalize_item_entry(&json!({"count": 1}));
        assert_eq!(entry.error_strikes, 0);
        assert_eq!(entry.reannounce_attempts, 0);
        assert!(entry.last_dl.is_none());
    }
}
