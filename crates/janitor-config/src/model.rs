//! Settings document shape, mirroring the YAML keys listed in §6 of the
//! queue janitor's external interfaces.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Policy for strike reduction on observed progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResetStrikesPolicy {
    /// Reset the strike count fully on any progress.
    All,
    /// Subtract this many strikes on progress (floored at zero).
    By(u32),
}

/// Parse the raw YAML value of `general.reset_strikes_on_progress`: the
/// literal string `"all"`, or a non-negative integer.
#[must_use]
pub fn parse_reset_strikes_policy(value: &serde_yaml::Value) -> Option<ResetStrikesPolicy> {
    if let Some(text) = value.as_str() {
        if text.eq_ignore_ascii_case("all") {
            return Some(ResetStrikesPolicy::All);
        }
        return None;
    }
    value.as_u64().map(|n| ResetStrikesPolicy::By(u32::try_from(n).unwrap_or(u32::MAX)))
}

/// `general.*` knobs: timeouts, dry-run, logging, ledger path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Emit verbose/debug-level logs.
    pub debug_logging: bool,
    /// Emit JSON-formatted logs instead of human-readable ones.
    pub structured_logs: bool,
    /// Suppress outgoing manager mutations; ledger bookkeeping still applies.
    pub dry_run: bool,
    /// Log the reasoning behind each decision at debug level.
    pub explain_decisions: bool,
    /// Per-request HTTP timeout, in seconds.
    pub request_timeout_secs: u64,
    /// Maximum retry attempts for a transient HTTP failure.
    pub retry_attempts: u32,
    /// Base backoff duration for retries, in milliseconds.
    pub retry_backoff_ms: u64,
    /// Path to the strike ledger JSON file.
    pub strike_file_path: String,
    /// Seconds to sleep between runner cycles.
    pub api_timeout_secs: u64,
    /// Raw strike-reduction policy, parsed via [`parse_reset_strikes_policy`].
    pub reset_strikes_on_progress: Option<serde_yaml::Value>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            debug_logging: false,
            structured_logs: false,
            dry_run: false,
            explain_decisions: false,
            request_timeout_secs: 10,
            retry_attempts: 2,
            retry_backoff_ms: 500,
            strike_file_path: "/app/data/strikes.json".to_string(),
            api_timeout_secs: 300,
            reset_strikes_on_progress: None,
        }
    }
}

/// Reannounce policy, nested under `rule_engine.reannounce`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReannounceConfig {
    /// Whether reannounce scheduling runs at all.
    pub enabled: Option<bool>,
    /// Minutes between attempts for the same download.
    pub cooldown_minutes: Option<i64>,
    /// Maximum attempts per item.
    pub max_attempts: Option<u32>,
    /// Whether a hash recheck accompanies the reannounce.
    pub do_recheck: Option<bool>,
    /// Only reannounce when the item currently reports zero seeders.
    pub only_when_seeds_zero: Option<bool>,
}

/// Layered rule-engine knobs: every field is optional so the resolver can
/// tell "not set at this layer" apart from "set to zero/false".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleEngineLayer {
    /// See [`janitor_core::EffectiveSettings::grace_period_minutes`].
    pub grace_period_minutes: Option<i64>,
    /// See [`janitor_core::EffectiveSettings::max_queue_age_hours`].
    pub max_queue_age_hours: Option<i64>,
    /// See [`janitor_core::EffectiveSettings::no_progress_max_age_minutes`].
    pub no_progress_max_age_minutes: Option<i64>,
    /// See [`janitor_core::EffectiveSettings::min_speed_bytes_per_sec`].
    pub min_speed_bytes_per_sec: Option<i64>,
    /// See [`janitor_core::EffectiveSettings::min_speed_duration_minutes`].
    pub min_speed_duration_minutes: Option<i64>,
    /// See [`janitor_core::EffectiveSettings::client_state_as_stalled`].
    pub client_state_as_stalled: Option<bool>,
    /// See [`janitor_core::EffectiveSettings::client_zero_activity_minutes`].
    pub client_zero_activity_minutes: Option<i64>,
    /// See [`janitor_core::EffectiveSettings::large_size_gb`].
    pub large_size_gb: Option<i64>,
    /// See [`janitor_core::EffectiveSettings::large_progress_ceiling_percent`].
    pub large_progress_ceiling_percent: Option<f64>,
    /// See [`janitor_core::EffectiveSettings::large_zero_seeders_remove_minutes`].
    pub large_zero_seeders_remove_minutes: Option<i64>,
    /// See [`janitor_core::EffectiveSettings::seeder_stall_threshold`].
    pub seeder_stall_threshold: Option<i64>,
    /// See [`janitor_core::EffectiveSettings::progress_ceiling_percent`].
    pub progress_ceiling_percent: Option<f64>,
    /// See [`janitor_core::EffectiveSettings::stall_limit`].
    pub stall_limit: Option<i64>,
    /// See [`janitor_core::EffectiveSettings::tracker_error_strikes`].
    pub tracker_error_strikes: Option<i64>,
    /// Reannounce policy; only ever read from the global layer.
    pub reannounce: Option<ReannounceConfig>,
}

/// `services.<Manager>.*`: endpoint plus per-manager rule-engine overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Base URL, e.g. `http://sonarr:8989`. Env `<MANAGER>_URL` wins when set.
    pub api_url: Option<String>,
    /// API key sent as `X-Api-Key`. Env `<MANAGER>_API_KEY` wins when set.
    pub api_key: Option<String>,
    /// Whether a removal should also trigger a replacement search.
    pub auto_search: bool,
    /// Whether the blacklist query parameter is named `blocklist` (true) or `blacklist` (false).
    pub use_blocklist_param: bool,
    /// Whether to pass `removeFromClient=true` on removal.
    pub remove_from_client: bool,
    /// Whether to pass `skipImport=true` on removal.
    pub skip_import: bool,
    /// Per-manager rule-engine overrides.
    #[serde(flatten)]
    pub rules: RuleEngineLayer,
}

/// `categories[]`: title-matched rule-engine overrides, checked before any
/// per-manager block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    /// Lowercased title substrings; first category with a match wins.
    pub title_contains: Vec<String>,
    /// Rule-engine overrides applied when this category matches.
    #[serde(flatten)]
    pub rules: RuleEngineLayer,
}

/// `indexer_policies.<name>.*`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerPolicyConfig {
    /// Failures tolerated before new items from this indexer are removed outright.
    pub failure_remove_after: Option<u32>,
    /// Per-indexer override of the global seeder-stall threshold.
    pub seeder_stall_threshold: Option<i64>,
}

/// `whitelist.*`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WhitelistConfig {
    /// Item ids exempt regardless of title.
    pub ids: Vec<i64>,
    /// Download ids exempt regardless of title.
    pub download_ids: Vec<String>,
    /// Lowercased title substrings; any match exempts the item.
    pub title_contains: Vec<String>,
}

/// One torrent-client connection block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConnectionConfig {
    /// Base URL of the client's RPC endpoint.
    pub url: String,
    /// Username for authentication, if required.
    pub username: Option<String>,
    /// Password for authentication, if required.
    pub password: Option<String>,
}

/// `clients.*`: configured torrent-client adapters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientsConfig {
    /// qBittorrent WebUI connection.
    pub qbittorrent: Option<ClientConnectionConfig>,
    /// Transmission RPC connection.
    pub transmission: Option<ClientConnectionConfig>,
    /// Deluge RPC connection.
    pub deluge: Option<ClientConnectionConfig>,
}

/// A scalar or list of reasons; a bare string is coerced to a one-element list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReasonsValue {
    /// A single reason string.
    One(String),
    /// A list of reason strings.
    Many(Vec<String>),
}

impl ReasonsValue {
    /// Normalize into a plain list.
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(reason) => vec![reason],
            Self::Many(reasons) => reasons,
        }
    }
}

/// `notifications.destinations[]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationConfig {
    /// Identifying name; defaults to `url` when absent.
    pub name: Option<String>,
    /// Wire protocol (`discord`, `slack`, or anything else treated as generic).
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Webhook URL; entries missing this are dropped during sanitization.
    pub url: Option<String>,
    /// Whether to batch and flush once per cycle rather than send immediately.
    pub batch: bool,
    /// Reason filter; absent or empty matches every reason.
    pub reasons: Option<ReasonsValue>,
    /// Message template.
    pub template: Option<String>,
    /// Whether the template is parsed and sent as a JSON document.
    pub raw_json: bool,
    /// Extra headers for generic destinations.
    pub headers: Option<HashMap<String, String>>,
}

/// `notifications.*`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Configured destinations.
    pub destinations: Vec<DestinationConfig>,
}

/// Root settings document, as loaded from YAML and then sanitized.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Process-wide knobs.
    pub general: GeneralConfig,
    /// Configured managers, keyed by name (e.g. `"Sonarr"`).
    pub services: HashMap<String, ManagerConfig>,
    /// Global rule-engine defaults.
    pub rule_engine: RuleEngineLayer,
    /// Title-matched overrides, checked before per-manager settings.
    pub categories: Vec<CategoryConfig>,
    /// Per-indexer failure policy overrides.
    pub indexer_policies: HashMap<String, IndexerPolicyConfig>,
    /// Items exempt from every rule.
    pub whitelist: WhitelistConfig,
    /// Configured torrent-client adapters.
    pub clients: ClientsConfig,
    /// Notification fan-out configuration.
    pub notifications: NotificationsConfig,
}
