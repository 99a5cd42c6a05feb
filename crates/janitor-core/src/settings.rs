//! Numeric/boolean rule-engine knobs, resolved by the caller's effective-
//! settings lookup (category → per-manager → global) before reaching the
//! evaluator and decision engine.

/// Fully resolved rule-engine knobs for one item, already passed through the
/// three-tier resolver. All durations are expressed in the unit named by the
/// field so the evaluator never has to convert.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveSettings {
    /// Minutes an item is exempt from every rule after first being seen.
    pub grace_period_minutes: u64,
    /// Hours after which an item is removed regardless of other signals.
    pub max_queue_age_hours: u64,
    /// Minutes without byte progress before `no_progress_timeout` fires.
    pub no_progress_max_age_minutes: u64,
    /// Minimum acceptable torrent speed in bytes/sec.
    pub min_speed_bytes_per_sec: u64,
    /// Minutes the speed must stay below `min_speed_bytes_per_sec`.
    pub min_speed_duration_minutes: u64,
    /// Whether `clientState` values of stalled/errored count as a stall.
    pub client_state_as_stalled: bool,
    /// Minutes of zero peers and zero seeds before `client_no_peers` fires.
    pub client_zero_activity_minutes: u64,
    /// Size threshold, in GiB, above which the zero-seeder large-file rule applies.
    pub large_size_gb: u64,
    /// Progress ceiling, in percent, under which the large-file rule applies.
    pub large_progress_ceiling_percent: f64,
    /// Minutes at zero seeders before the large-file rule removes the item.
    pub large_zero_seeders_remove_minutes: u64,
    /// Seeder count at or below which an item is considered low-seeder.
    pub seeder_stall_threshold: i64,
    /// Progress ceiling, in percent, under which the low-seeder rule applies.
    pub progress_ceiling_percent: f64,
    /// Consecutive strikes tolerated before removal.
    pub stall_limit: u32,
    /// Tracker-error strikes tolerated before removal.
    pub tracker_error_strikes: u32,
    /// Indexer failures tolerated before the per-indexer policy removes new items.
    pub failure_remove_after: u32,
    /// Whether a removal should also trigger a replacement search.
    pub auto_search: bool,
    /// Whether reannounce scheduling is enabled at all.
    pub reannounce_enabled: bool,
    /// Minutes between reannounce attempts for the same download.
    pub reannounce_cooldown_minutes: u64,
    /// Maximum reannounce attempts per item.
    pub reannounce_max_attempts: u32,
    /// Only reannounce when the item currently has zero seeders.
    pub reannounce_only_when_seeds_zero: bool,
    /// Policy for strike reduction on progress: `None` resets to 0, `Some(n)`
    /// subtracts `n` (floored at 0).
    pub reset_strikes_on_progress: Option<u32>,
}

impl Default for EffectiveSettings {
    fn default() -> Self {
        Self {
            grace_period_minutes: 0,
            max_queue_age_hours: 0,
            no_progress_max_age_minutes: 0,
            min_speed_bytes_per_sec: 0,
            min_speed_duration_minutes: 0,
            client_state_as_stalled: false,
            client_zero_activity_minutes: 0,
            large_size_gb: 0,
            large_progress_ceiling_percent: 0.0,
            large_zero_seeders_remove_minutes: 0,
            seeder_stall_threshold: 0,
            progress_ceiling_percent: 0.0,
            stall_limit: 3,
            tracker_error_strikes: 0,
            failure_remove_after: 0,
            auto_search: false,
            reannounce_enabled: false,
            reannounce_cooldown_minutes: 60,
            reannounce_max_attempts: 1,
            reannounce_only_when_seeds_zero: true,
            reset_strikes_on_progress: None,
        }
    }
}
