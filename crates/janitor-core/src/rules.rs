//! Stateless stall-rule evaluator. Evaluation order matters: the first
//! matching rule wins.

use crate::accessor::ItemSnapshot;
use crate::model::ItemEntry;
use crate::settings::EffectiveSettings;

/// Canonical tag identifying the decision path that fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    /// Reported by the decision engine, not the evaluator: item is whitelisted.
    Whitelisted,
    /// A reannounce was scheduled instead of evaluating rules this cycle.
    ReannounceScheduled,
    /// A state field or status message reads as stalled.
    Stalled,
    /// Item exceeded the hard queue-age ceiling.
    MaxAge,
    /// No byte progress observed within the configured window.
    NoProgressTimeout,
    /// Torrent speed stayed below the configured floor for too long.
    MinSpeed,
    /// Client-reported lifecycle state counts as stalled.
    ClientState,
    /// Torrent has had zero peers and zero seeds for too long.
    ClientNoPeers,
    /// Large torrent stuck at zero seeders past the configured window.
    LargeZeroSeeders,
    /// Too few seeders relative to the effective threshold.
    LowSeeders,
    /// Tracker reported the torrent as unregistered/not found.
    TrackerError,
    /// Indexer has exceeded its configured failure budget.
    IndexerFailurePolicy,
    /// Item completed but the manager reports an import error.
    DownloadedButErrored,
    /// Preserved despite indexer failure policy because it already completed.
    CompletedPreservedIndexerFailure,
    /// Preserved despite tracker-error strikes because it already completed.
    CompletedPreservedTrackerError,
    /// Item is progressing normally.
    Progress,
    /// Item is in a queued/waiting state.
    Queued,
}

impl Reason {
    /// The canonical wire/string tag for this reason, as persisted in
    /// `last_reason` and used for notification template interpolation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Whitelisted => "whitelisted",
            Self::ReannounceScheduled => "reannounce_scheduled",
            Self::Stalled => "stalled",
            Self::MaxAge => "max_age",
            Self::NoProgressTimeout => "no_progress_timeout",
            Self::MinSpeed => "min_speed",
            Self::ClientState => "client_state",
            Self::ClientNoPeers => "client_no_peers",
            Self::LargeZeroSeeders => "large_zero_seeders",
            Self::LowSeeders => "low_seeders",
            Self::TrackerError => "tracker_error",
            Self::IndexerFailurePolicy => "indexer_failure_policy",
            Self::DownloadedButErrored => "downloaded_but_errored",
            Self::CompletedPreservedIndexerFailure => "completed_preserved_indexer_failure",
            Self::CompletedPreservedTrackerError => "completed_preserved_tracker_error",
            Self::Progress => "progress",
            Self::Queued => "queued",
        }
    }
}

/// Evaluate the stall rules for one item. `progressed` reflects whether byte
/// progress was observed this cycle (computed by the decision engine before
/// calling in). `indexer_seeder_override` is the per-indexer
/// `seeder_stall_threshold`, when an `indexer_policies` entry overrides the
/// global value. Returns `None` when no rule fires.
#[must_use]
pub fn evaluate(
    item: &ItemSnapshot,
    entry: &ItemEntry,
    progressed: bool,
    effective: &EffectiveSettings,
    indexer_seeder_override: Option<i64>,
    now: i64,
) -> Option<Reason> {
    // 1. Grace period.
    if effective.grace_period_minutes > 0
        && now - entry.first_seen_ts < i64::try_from(effective.grace_period_minutes * 60).unwrap_or(i64::MAX)
    {
        return None;
    }

    // 2. Max queue age.
    if effective.max_queue_age_hours > 0
        && now - entry.first_seen_ts >= i64::try_from(effective.max_queue_age_hours * 3600).unwrap_or(i64::MAX)
    {
        return Some(Reason::MaxAge);
    }

    // 3. No-progress timeout.
    if !progressed && effective.no_progress_max_age_minutes > 0 {
        if let Some(last_progress) = entry.last_progress_ts {
            if now - last_progress >= i64::try_from(effective.no_progress_max_age_minutes * 60).unwrap_or(i64::MAX) {
                return Some(Reason::NoProgressTimeout);
            }
        }
    }

    // 4. Min speed.
    if item.is_torrent() && effective.min_speed_bytes_per_sec > 0 && effective.min_speed_duration_minutes > 0 {
        if let Some(speed) = item.client_speed() {
            if speed < effective.min_speed_bytes_per_sec {
                let since = entry.last_progress_ts.unwrap_or(entry.first_seen_ts);
                if now - since >= i64::try_from(effective.min_speed_duration_minutes * 60).unwrap_or(i64::MAX) {
                    return Some(Reason::MinSpeed);
                }
            }
        }
    }

    // 5. Client state as stalled.
    if effective.client_state_as_stalled {
        if let Some(state) = item.client_state() {
            if matches!(state.as_str(), "stalleddl" | "stalledup" | "error") {
                return Some(Reason::ClientState);
            }
        }
    }

    // 6. Client zero activity.
    if item.is_torrent() && effective.client_zero_activity_minutes > 0 {
        if item.client_peers() == Some(0) && item.client_seeds() == Some(0) {
            let since = entry.last_progress_ts.unwrap_or(entry.first_seen_ts);
            if now - since >= i64::try_from(effective.client_zero_activity_minutes * 60).unwrap_or(i64::MAX) {
                return Some(Reason::ClientNoPeers);
            }
        }
    }

    // 7. Large-size zero-seeders.
    if item.is_torrent() && effective.large_size_gb > 0 && effective.large_zero_seeders_remove_minutes > 0 {
        let large_threshold_bytes = effective.large_size_gb.saturating_mul(1 << 30);
        let is_large = item
            .raw()
            .get("size")
            .and_then(serde_json::Value::as_u64)
            .is_some_and(|size| size >= large_threshold_bytes);
        let zero_seeders = item.seeders() == Some(0);
        let under_ceiling = item
            .progress_percent()
            .is_none_or(|p| p <= effective.large_progress_ceiling_percent);
        if is_large
            && zero_seeders
            && under_ceiling
            && now - entry.first_seen_ts
                >= i64::try_from(effective.large_zero_seeders_remove_minutes * 60).unwrap_or(i64::MAX)
        {
            return Some(Reason::LargeZeroSeeders);
        }
    }

    // 8. Stalled signal / low seeders.
    let seeder_threshold = indexer_seeder_override.unwrap_or(effective.seeder_stall_threshold);
    let seeder_condition = item.is_torrent()
        && item.seeders().is_some_and(|seeders| seeders <= seeder_threshold)
        && item
            .progress_percent()
            .is_none_or(|p| p <= effective.progress_ceiling_percent);

    if item.is_stalled() || seeder_condition {
        if seeder_condition {
            return Some(Reason::LowSeeders);
        }
        return Some(Reason::Stalled);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings() -> EffectiveSettings {
        EffectiveSettings::default()
    }

    #[test]
    fn grace_period_suppresses_every_rule() {
        let item = ItemSnapshot::new(json!({"protocol": "torrent", "size": 1000, "sizeleft": 900}));
        let entry = ItemEntry::first_seen(1_000_000 - 30);
        let mut effective = settings();
        effective.grace_period_minutes = 5;
        effective.max_queue_age_hours = 1;
        assert_eq!(evaluate(&item, &entry, false, &effective, None, 1_000_000), None);
    }

    #[test]
    fn max_queue_age_fires_past_the_ceiling() {
        let item = ItemSnapshot::new(json!({"protocol": "torrent", "size": 1000, "sizeleft": 900}));
        let entry = ItemEntry::first_seen(1_000_000 - 7200);
        let mut effective = settings();
        effective.max_queue_age_hours = 1;
        assert_eq!(
            evaluate(&item, &entry, false, &effective, None, 1_000_000),
            Some(Reason::MaxAge)
        );
    }

    #[test]
    fn low_seeders_rule_uses_indexer_override() {
        let item = ItemSnapshot::new(
            json!({"protocol": "torrent", "size": 1000, "sizeleft": 900, "release": {"seeders": 2}}),
        );
        let entry = ItemEntry::first_seen(1_000_000 - 10);
        let mut effective = settings();
        effective.seeder_stall_threshold = 0;
        effective.progress_ceiling_percent = 50.0;

        assert_eq!(evaluate(&item, &entry, false, &effective, None, 1_000_000), None);
        assert_eq!(
            evaluate(&item, &entry, false, &effective, Some(5), 1_000_000),
            Some(Reason::LowSeeders)
        );
    }

    #[test]
    fn large_zero_seeders_requires_both_knobs_configured() {
        let item = ItemSnapshot::new(
            json!({"id": 1, "protocol": "torrent", "size": 5 * (1_i64 << 30), "sizeleft": 5 * (1_i64 << 30), "release": {"seeders": 0}}),
        );
        let entry = ItemEntry::first_seen(1_000_000);
        let mut effective = settings();
        effective.large_size_gb = 1;
        // large_zero_seeders_remove_minutes left at its default of 0.
        assert_eq!(evaluate(&item, &entry, false, &effective, None, 1_000_000), None);

        effective.large_zero_seeders_remove_minutes = 60;
        assert_eq!(
            evaluate(&item, &entry, false, &effective, None, 1_000_000 + 3600),
            Some(Reason::LargeZeroSeeders)
        );
    }

    #[test]
    fn zero_seeder_low_progress_removal_scenario() {
        // spec.md §8 scenario 1.
        let item = ItemSnapshot::new(
            json!({"id": 101, "title": "Z", "protocol": "torrent", "size": 1000, "sizeleft": 900, "release": {"seeders": 0}}),
        );
        let entry = ItemEntry::first_seen(1_000_000);
        let mut effective = settings();
        effective.seeder_stall_threshold = 0;
        effective.progress_ceiling_percent = 25.0;
        assert_eq!(
            evaluate(&item, &entry, false, &effective, None, 1_000_000),
            Some(Reason::LowSeeders)
        );
    }
}
