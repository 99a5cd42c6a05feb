//! Decision engine: wraps the rule evaluator with whitelist/completed-item
//! guards, grace, reannounce scheduling, and strike accounting, and owns all
//! ledger mutation.

use std::collections::{HashMap, HashSet};

use crate::accessor::ItemSnapshot;
use crate::model::{IndexerEntry, ItemEntry, LedgerRecord, indexer_key, ledger_key};
use crate::rules::{self, Reason};
use crate::settings::EffectiveSettings;

/// Import-failure substrings checked against an item's combined status text
/// when an item has finished downloading but the manager still reports a
/// problem.
const IMPORT_FAILURE_PHRASES: [&str; 7] = [
    "import failed",
    "failed to import",
    "manual import",
    "manually import",
    "manual intervention",
    "waiting to import",
    "waiting for import",
];

const IMPORT_FAILURE_WORDS: [&str; 4] = ["fail", "manual", "intervention", "waiting"];

/// Tracker-error substrings checked against status/tracker text.
const TRACKER_ERROR_PHRASES: [&str; 4] = [
    "unregistered",
    "not registered",
    "torrent not found",
    "not found on tracker",
];

/// Title/id/download-id allow-list; matching items are never struck or removed.
#[derive(Debug, Clone, Default)]
pub struct Whitelist {
    /// Item ids exempt regardless of title.
    pub ids: HashSet<i64>,
    /// Download ids exempt regardless of title.
    pub download_ids: HashSet<String>,
    /// Lowercased title substrings; any match exempts the item.
    pub title_contains: Vec<String>,
}

impl Whitelist {
    /// Whether `item` matches this whitelist by id, download id, or title.
    #[must_use]
    pub fn matches(&self, item: &ItemSnapshot) -> bool {
        if let Some(id) = item.id() {
            if self.ids.contains(&id) {
                return true;
            }
        }
        if let Some(download_id) = item.download_id() {
            if self.download_ids.contains(&download_id) {
                return true;
            }
        }
        let title = item.title().to_lowercase();
        self.title_contains.iter().any(|needle| title.contains(needle.as_str()))
    }
}

/// Outcome of evaluating one item for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Whether the runner should remove and blacklist the item.
    pub should_remove: bool,
    /// Whether removal should also trigger a replacement search.
    pub trigger_search: bool,
    /// Whether the runner should attempt a reannounce instead of striking.
    pub reannounce_requested: bool,
    /// The canonical reason recorded for this decision, if any.
    pub reason: Option<Reason>,
}

impl Decision {
    const fn no_op() -> Self {
        Self {
            should_remove: false,
            trigger_search: false,
            reannounce_requested: false,
            reason: None,
        }
    }
}

fn get_item_entry(ledger: &HashMap<String, LedgerRecord>, key: &str, now: i64) -> ItemEntry {
    ledger
        .get(key)
        .and_then(LedgerRecord::as_item)
        .cloned()
        .unwrap_or_else(|| ItemEntry::first_seen(now))
}

fn get_indexer_entry(ledger: &HashMap<String, LedgerRecord>, key: &str) -> IndexerEntry {
    ledger.get(key).and_then(LedgerRecord::as_indexer).copied().unwrap_or_default()
}

fn put_item_entry(ledger: &mut HashMap<String, LedgerRecord>, key: String, entry: ItemEntry) {
    ledger.insert(key, LedgerRecord::Item(entry));
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

fn is_import_failure(status_text: &str) -> bool {
    contains_any(status_text, &IMPORT_FAILURE_PHRASES)
        || (status_text.contains("import") && IMPORT_FAILURE_WORDS.iter().any(|w| status_text.contains(w)))
}

fn reannounce_eligible(entry: &ItemEntry, item: &ItemSnapshot, settings: &EffectiveSettings, now: i64) -> bool {
    if !settings.reannounce_enabled || !item.is_torrent() {
        return false;
    }
    if settings.reannounce_only_when_seeds_zero && item.seeders() != Some(0) {
        return false;
    }
    if entry.reannounce_attempts >= settings.reannounce_max_attempts {
        return false;
    }
    match entry.last_reannounce_ts {
        Some(last) => now - last >= i64::try_from(settings.reannounce_cooldown_minutes * 60).unwrap_or(i64::MAX),
        None => true,
    }
}

/// Evaluate and mutate the ledger for one item. `indexer_seeder_override` is
/// the per-indexer `seeder_stall_threshold`, if `indexer_policies` names an
/// override for this item's indexer.
#[must_use]
pub fn decide(
    manager: &str,
    item: &ItemSnapshot,
    ledger: &mut HashMap<String, LedgerRecord>,
    whitelist: &Whitelist,
    settings: &EffectiveSettings,
    indexer_seeder_override: Option<i64>,
    now: i64,
) -> Decision {
    let Some(id) = item.id() else {
        return Decision::no_op();
    };
    let key = ledger_key(manager, id);

    // 2. fully_downloaded.
    let fully_downloaded = item.fully_downloaded();

    // 3. Per-indexer failure policy.
    if settings.failure_remove_after > 0 {
        if let Some(indexer) = item.indexer_name() {
            let idx_key = indexer_key(manager, &indexer);
            let indexer_entry = get_indexer_entry(ledger, &idx_key);
            if indexer_entry.failures >= settings.failure_remove_after {
                if fully_downloaded {
                    let mut entry = get_item_entry(ledger, &key, now);
                    entry.last_reason = Some(Reason::CompletedPreservedIndexerFailure.as_str().to_string());
                    put_item_entry(ledger, key, entry);
                    return Decision {
                        reason: Some(Reason::CompletedPreservedIndexerFailure),
                        ..Decision::no_op()
                    };
                }
                ledger.remove(&key);
                return Decision {
                    should_remove: true,
                    trigger_search: settings.auto_search,
                    reannounce_requested: false,
                    reason: Some(Reason::IndexerFailurePolicy),
                };
            }
        }
    }

    // 4. Whitelist.
    if whitelist.matches(item) {
        let mut entry = get_item_entry(ledger, &key, now);
        entry.last_reason = Some(Reason::Whitelisted.as_str().to_string());
        put_item_entry(ledger, key, entry);
        return Decision {
            reason: Some(Reason::Whitelisted),
            ..Decision::no_op()
        };
    }

    // 5. Completed-but-errored guard.
    if fully_downloaded && (item.has_warning_or_error_state() || is_import_failure(&item.status_text())) {
        let mut entry = get_item_entry(ledger, &key, now);
        entry.last_reason = Some(Reason::DownloadedButErrored.as_str().to_string());
        put_item_entry(ledger, key, entry);
        return Decision {
            reason: Some(Reason::DownloadedButErrored),
            ..Decision::no_op()
        };
    }

    let mut entry = get_item_entry(ledger, &key, now);

    // 6. Pre-progress max age hard cap.
    if settings.max_queue_age_hours > 0
        && now - entry.first_seen_ts >= i64::try_from(settings.max_queue_age_hours * 3600).unwrap_or(i64::MAX)
    {
        ledger.remove(&key);
        return Decision {
            should_remove: true,
            trigger_search: settings.auto_search,
            reannounce_requested: false,
            reason: Some(Reason::MaxAge),
        };
    }

    // 7. Tracker-error persistence.
    if settings.tracker_error_strikes > 0 {
        let combined = format!("{} {}", item.status_text(), item.client_trackers_text());
        if contains_any(&combined, &TRACKER_ERROR_PHRASES) {
            entry.error_strikes += 1;
            if entry.error_strikes >= settings.tracker_error_strikes {
                if fully_downloaded {
                    entry.last_reason = Some(Reason::CompletedPreservedTrackerError.as_str().to_string());
                    put_item_entry(ledger, key, entry);
                    return Decision {
                        reason: Some(Reason::CompletedPreservedTrackerError),
                        ..Decision::no_op()
                    };
                }
                if let Some(indexer) = item.indexer_name() {
                    let idx_key = indexer_key(manager, &indexer);
                    let mut indexer_entry = get_indexer_entry(ledger, &idx_key);
                    indexer_entry.failures += 1;
                    indexer_entry.last_ts = now;
                    ledger.insert(idx_key, LedgerRecord::Indexer(indexer_entry));
                }
                ledger.remove(&key);
                return Decision {
                    should_remove: true,
                    trigger_search: settings.auto_search,
                    reannounce_requested: false,
                    reason: Some(Reason::TrackerError),
                };
            }
        }
    }

    // 8. Reannounce scheduling (pre-strike).
    if reannounce_eligible(&entry, item, settings, now) {
        entry.last_reason = Some(Reason::ReannounceScheduled.as_str().to_string());
        put_item_entry(ledger, key, entry);
        return Decision {
            reannounce_requested: true,
            reason: Some(Reason::ReannounceScheduled),
            ..Decision::no_op()
        };
    }

    // 9. Progress detection.
    let downloaded = item.downloaded_bytes();
    let mut progressed = match (downloaded, entry.last_dl) {
        (Some(d), Some(last)) => d > last,
        (Some(_), None) => item.status_text().contains("downloading"),
        (None, _) => false,
    };
    if settings.client_zero_activity_minutes > 0
        && item.is_torrent()
        && item.client_peers() == Some(0)
        && item.client_seeds() == Some(0)
    {
        let since = entry.last_progress_ts.unwrap_or(entry.first_seen_ts);
        if now - since >= i64::try_from(settings.client_zero_activity_minutes * 60).unwrap_or(i64::MAX) {
            progressed = false;
        }
    }

    // 11. Progress path.
    if progressed {
        entry.count = match settings.reset_strikes_on_progress {
            None => 0,
            Some(n) => entry.count.saturating_sub(n),
        };
        entry.last_dl = downloaded;
        entry.last_progress_ts = Some(now);
        entry.last_seen_seeders = item.seeders();
        entry.last_reason = Some(Reason::Progress.as_str().to_string());
        put_item_entry(ledger, key, entry);
        return Decision {
            reason: Some(Reason::Progress),
            ..Decision::no_op()
        };
    }

    // 12. Queued path.
    if item.is_queued() {
        entry.last_reason = Some(Reason::Queued.as_str().to_string());
        put_item_entry(ledger, key, entry);
        return Decision {
            reason: Some(Reason::Queued),
            ..Decision::no_op()
        };
    }

    // 13. Evaluator call.
    let Some(reason) = rules::evaluate(item, &entry, progressed, settings, indexer_seeder_override, now) else {
        entry.last_dl = downloaded;
        entry.last_seen_seeders = item.seeders();
        put_item_entry(ledger, key, entry);
        return Decision::no_op();
    };

    // 14. Reannounce-after-reason gate.
    if reannounce_eligible(&entry, item, settings, now) {
        entry.last_reason = Some(Reason::ReannounceScheduled.as_str().to_string());
        put_item_entry(ledger, key, entry);
        return Decision {
            reannounce_requested: true,
            reason: Some(Reason::ReannounceScheduled),
            ..Decision::no_op()
        };
    }

    // 15. Immediate no-progress-timeout removal.
    if reason == Reason::NoProgressTimeout {
        ledger.remove(&key);
        return Decision {
            should_remove: true,
            trigger_search: settings.auto_search,
            reannounce_requested: false,
            reason: Some(reason),
        };
    }

    // 16. Strike increment and limit check.
    entry.count += 1;
    if entry.count >= settings.stall_limit {
        ledger.remove(&key);
        return Decision {
            should_remove: true,
            trigger_search: settings.auto_search,
            reannounce_requested: false,
            reason: Some(reason),
        };
    }
    entry.last_reason = Some(reason.as_str().to_string());
    put_item_entry(ledger, key, entry);
    Decision {
        reason: Some(reason),
        ..Decision::no_op()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings() -> EffectiveSettings {
        EffectiveSettings::default()
    }

    #[test]
    fn zero_seeder_low_progress_removal() {
        // spec.md §8 scenario 1.
        let item = ItemSnapshot::new(
            json!({"id": 101, "title": "Z", "protocol": "torrent", "size": 1000, "sizeleft": 900, "release": {"seeders": 0}}),
        );
        let mut ledger = HashMap::new();
        let mut effective = settings();
        effective.seeder_stall_threshold = 0;
        effective.progress_ceiling_percent = 25.0;
        effective.stall_limit = 1;
        effective.auto_search = true;

        let decision = decide("Sonarr", &item, &mut ledger, &Whitelist::default(), &effective, None, 1_000_000);
        assert!(decision.should_remove);
        assert!(decision.trigger_search);
        assert_eq!(decision.reason, Some(Reason::LowSeeders));
        assert!(!ledger.contains_key("Sonarr:101"));
    }

    #[test]
    fn max_age_hard_removal() {
        // spec.md §8 scenario 2.
        let item = ItemSnapshot::new(json!({"id": 600, "protocol": "torrent", "size": 1000, "sizeleft": 900}));
        let mut ledger = HashMap::new();
        ledger.insert(
            "Sonarr:600".to_string(),
            LedgerRecord::Item(ItemEntry {
                first_seen_ts: 1_000_000 - 7200,
                ..ItemEntry::default()
            }),
        );
        let mut effective = settings();
        effective.max_queue_age_hours = 1;

        let decision = decide("Sonarr", &item, &mut ledger, &Whitelist::default(), &effective, None, 1_000_000);
        assert!(decision.should_remove);
        assert_eq!(decision.reason, Some(Reason::MaxAge));
    }

    #[test]
    fn progress_resets_strikes_all() {
        // spec.md §8 scenario 3.
        let item = ItemSnapshot::new(json!({"id": 200, "size": 1000, "sizeleft": 800}));
        let mut ledger = HashMap::new();
        ledger.insert(
            "Sonarr:200".to_string(),
            LedgerRecord::Item(ItemEntry {
                count: 3,
                last_dl: Some(100),
                ..ItemEntry::default()
            }),
        );
        let effective = settings();

        let decision = decide("Sonarr", &item, &mut ledger, &Whitelist::default(), &effective, None, 1_000_000);
        assert_eq!(decision, Decision::no_op());
        let entry = ledger.get("Sonarr:200").unwrap().as_item().unwrap();
        assert_eq!(entry.count, 0);
        assert_eq!(entry.last_dl, Some(200));
        assert_eq!(entry.last_reason.as_deref(), Some("progress"));
    }

    #[test]
    fn reannounce_scheduled_before_strike() {
        // spec.md §8 scenario 4.
        let item = ItemSnapshot::new(
            json!({"id": 900, "downloadId": "abc", "protocol": "torrent", "size": 1000, "sizeleft": 900, "release": {"seeders": 0}}),
        );
        let mut ledger = HashMap::new();
        let mut effective = settings();
        effective.reannounce_enabled = true;
        effective.reannounce_only_when_seeds_zero = true;
        effective.reannounce_max_attempts = 1;
        effective.reannounce_cooldown_minutes = 60;

        let decision = decide("S", &item, &mut ledger, &Whitelist::default(), &effective, None, 1_000_000);
        assert!(!decision.should_remove);
        assert!(decision.reannounce_requested);
        assert_eq!(decision.reason, Some(Reason::ReannounceScheduled));
    }

    #[test]
    fn tracker_error_persists_across_two_cycles() {
        // spec.md §8 scenario 5.
        let item = ItemSnapshot::new(
            json!({"id": 300, "protocol": "torrent", "size": 1000, "sizeleft": 900, "statusMessages": ["Unregistered torrent"]}),
        );
        let mut ledger = HashMap::new();
        let mut effective = settings();
        effective.tracker_error_strikes = 2;
        effective.stall_limit = 100;

        let first = decide("Sonarr", &item, &mut ledger, &Whitelist::default(), &effective, None, 1_000_000);
        assert!(!first.should_remove);
        let entry = ledger.get("Sonarr:300").unwrap().as_item().unwrap();
        assert_eq!(entry.error_strikes, 1);

        let second = decide("Sonarr", &item, &mut ledger, &Whitelist::default(), &effective, None, 1_000_060);
        assert!(second.should_remove);
        assert_eq!(second.reason, Some(Reason::TrackerError));
    }

    #[test]
    fn indexer_failure_policy_preserves_completed() {
        // spec.md §8 scenario 6.
        let item = ItemSnapshot::new(
            json!({"id": 400, "protocol": "torrent", "size": 1000, "sizeleft": 0, "indexer": "X"}),
        );
        let mut ledger = HashMap::new();
        ledger.insert(
            "Sonarr:_indexer:X".to_string(),
            LedgerRecord::Indexer(IndexerEntry { failures: 1, last_ts: 999_000 }),
        );
        let mut effective = settings();
        effective.failure_remove_after = 1;

        let decision = decide("Sonarr", &item, &mut ledger, &Whitelist::default(), &effective, None, 1_000_000);
        assert!(!decision.should_remove);
        assert_eq!(decision.reason, Some(Reason::CompletedPreservedIndexerFailure));
    }

    #[test]
    fn whitelist_skips_evaluation() {
        let item = ItemSnapshot::new(json!({"id": 5, "title": "Keep Me", "protocol": "torrent", "size": 1000, "sizeleft": 900}));
        let mut ledger = HashMap::new();
        let whitelist = Whitelist {
            title_contains: vec!["keep me".to_string()],
            ..Whitelist::default()
        };
        let decision = decide("Sonarr", &item, &mut ledger, &whitelist, &EffectiveSettings::default(), None, 1_000_000);
        assert_eq!(decision.reason, Some(Reason::Whitelisted));
        assert!(!decision.should_remove);
    }
}
