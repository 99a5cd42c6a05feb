//! Three-tier effective-settings resolution: a category's `title_contains`
//! match wins first, then the per-manager block, then the global
//! `rule_engine` block, then the evaluator's own defaults.

use janitor_core::{EffectiveSettings, Whitelist};

use crate::model::{RuleEngineLayer, Settings, parse_reset_strikes_policy};

fn pick<T: Copy>(category: Option<T>, manager: Option<T>, global: Option<T>, default: T) -> T {
    category.or(manager).or(global).unwrap_or(default)
}

fn matching_category<'a>(settings: &'a Settings, title: &str) -> Option<&'a RuleEngineLayer> {
    let lowered = title.to_lowercase();
    settings
        .categories
        .iter()
        .find(|category| category.title_contains.iter().any(|needle| lowered.contains(&needle.to_lowercase())))
        .map(|category| &category.rules)
}

/// Resolve the effective rule-engine settings for `manager`'s item titled
/// `title`, optionally scoped to `indexer` for the per-indexer failure
/// policy. Falls back through category → manager → global → default.
#[must_use]
pub fn resolve(settings: &Settings, manager: &str, title: &str, indexer: Option<&str>) -> EffectiveSettings {
    let default = EffectiveSettings::default();
    let global = &settings.rule_engine;
    let manager_rules = settings.services.get(manager).map(|config| &config.rules);
    let category = matching_category(settings, title);

    macro_rules! resolve_i64 {
        ($field:ident, $fallback:expr) => {
            pick(
                category.and_then(|layer| layer.$field),
                manager_rules.and_then(|layer| layer.$field),
                global.$field,
                $fallback,
            )
        };
    }

    let grace_period_minutes = u64::try_from(resolve_i64!(grace_period_minutes, 0)).unwrap_or(0);
    let max_queue_age_hours = u64::try_from(resolve_i64!(max_queue_age_hours, 0)).unwrap_or(0);
    let no_progress_max_age_minutes = u64::try_from(resolve_i64!(no_progress_max_age_minutes, 0)).unwrap_or(0);
    let min_speed_bytes_per_sec = u64::try_from(resolve_i64!(min_speed_bytes_per_sec, 0)).unwrap_or(0);
    let min_speed_duration_minutes = u64::try_from(resolve_i64!(min_speed_duration_minutes, 0)).unwrap_or(0);
    let client_zero_activity_minutes = u64::try_from(resolve_i64!(client_zero_activity_minutes, 0)).unwrap_or(0);
    let large_size_gb = u64::try_from(resolve_i64!(large_size_gb, 0)).unwrap_or(0);
    let large_zero_seeders_remove_minutes = u64::try_from(resolve_i64!(large_zero_seeders_remove_minutes, 0)).unwrap_or(0);
    let stall_limit = u32::try_from(resolve_i64!(stall_limit, i64::from(default.stall_limit))).unwrap_or(default.stall_limit);
    let tracker_error_strikes = u32::try_from(resolve_i64!(tracker_error_strikes, 0)).unwrap_or(0);

    let client_state_as_stalled = pick(
        category.and_then(|layer| layer.client_state_as_stalled),
        manager_rules.and_then(|layer| layer.client_state_as_stalled),
        global.client_state_as_stalled,
        default.client_state_as_stalled,
    );
    let large_progress_ceiling_percent = pick(
        category.and_then(|layer| layer.large_progress_ceiling_percent),
        manager_rules.and_then(|layer| layer.large_progress_ceiling_percent),
        global.large_progress_ceiling_percent,
        default.large_progress_ceiling_percent,
    );
    let seeder_stall_threshold = pick(
        category.and_then(|layer| layer.seeder_stall_threshold),
        manager_rules.and_then(|layer| layer.seeder_stall_threshold),
        global.seeder_stall_threshold,
        default.seeder_stall_threshold,
    );
    let progress_ceiling_percent = pick(
        category.and_then(|layer| layer.progress_ceiling_percent),
        manager_rules.and_then(|layer| layer.progress_ceiling_percent),
        global.progress_ceiling_percent,
        default.progress_ceiling_percent,
    );

    let auto_search = settings.services.get(manager).is_some_and(|config| config.auto_search);
    let failure_remove_after = indexer
        .and_then(|name| settings.indexer_policies.get(name))
        .and_then(|policy| policy.failure_remove_after)
        .unwrap_or(0);

    let reannounce = global.reannounce.clone().unwrap_or_default();
    let reannounce_enabled = reannounce.enabled.unwrap_or(default.reannounce_enabled);
    let reannounce_cooldown_minutes =
        reannounce.cooldown_minutes.and_then(|v| u64::try_from(v).ok()).unwrap_or(default.reannounce_cooldown_minutes);
    let reannounce_max_attempts = reannounce.max_attempts.unwrap_or(default.reannounce_max_attempts);
    let reannounce_only_when_seeds_zero = reannounce.only_when_seeds_zero.unwrap_or(default.reannounce_only_when_seeds_zero);

    let reset_strikes_on_progress = settings
        .general
        .reset_strikes_on_progress
        .as_ref()
        .and_then(parse_reset_strikes_policy)
        .and_then(|policy| match policy {
            crate::model::ResetStrikesPolicy::All => None,
            crate::model::ResetStrikesPolicy::By(n) => Some(n),
        });

    EffectiveSettings {
        grace_period_minutes,
        max_queue_age_hours,
        no_progress_max_age_minutes,
        min_speed_bytes_per_sec,
        min_speed_duration_minutes,
        client_state_as_stalled,
        client_zero_activity_minutes,
        large_size_gb,
        large_progress_ceiling_percent,
        large_zero_seeders_remove_minutes,
        seeder_stall_threshold,
        progress_ceiling_percent,
        stall_limit,
        tracker_error_strikes,
        failure_remove_after,
        auto_search,
        reannounce_enabled,
        reannounce_cooldown_minutes,
        reannounce_max_attempts,
        reannounce_only_when_seeds_zero,
        reset_strikes_on_progress,
    }
}

/// Build the runtime whitelist from the configured `whitelist.*` block.
#[must_use]
pub fn whitelist(settings: &Settings) -> Whitelist {
    Whitelist {
        ids: settings.whitelist.ids.iter().copied().collect(),
        download_ids: settings.whitelist.download_ids.iter().cloned().collect(),
        title_contains: settings.whitelist.title_contains.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CategoryConfig, IndexerPolicyConfig, ManagerConfig};

    #[test]
    fn global_layer_applies_when_nothing_more_specific_is_set() {
        let mut settings = Settings::default();
        settings.rule_engine.stall_limit = Some(5);
        let effective = resolve(&settings, "Sonarr", "Some Show", None);
        assert_eq!(effective.stall_limit, 5);
    }

    #[test]
    fn manager_layer_overrides_global() {
        let mut settings = Settings::default();
        settings.rule_engine.stall_limit = Some(5);
        settings.services.insert(
            "Sonarr".to_string(),
            ManagerConfig { rules: RuleEngineLayer { stall_limit: Some(2), ..Default::default() }, ..Default::default() },
        );
        let effective = resolve(&settings, "Sonarr", "Some Show", None);
        assert_eq!(effective.stall_limit, 2);
    }

    #[test]
    fn category_layer_overrides_manager() {
        let mut settings = Settings::default();
        settings.services.insert(
            "Sonarr".to_string(),
            ManagerConfig { rules: RuleEngineLayer { stall_limit: Some(2), ..Default::default() }, ..Default::default() },
        );
        settings.categories.push(CategoryConfig {
            title_contains: vec!["anime".to_string()],
            rules: RuleEngineLayer { stall_limit: Some(9), ..Default::default() },
        });
        let effective = resolve(&settings, "Sonarr", "Some Anime Show", None);
        assert_eq!(effective.stall_limit, 9);
    }

    #[test]
    fn indexer_policy_resolves_failure_remove_after() {
        let mut settings = Settings::default();
        settings.indexer_policies.insert("BadIndexer".to_string(), IndexerPolicyConfig { failure_remove_after: Some(3), seeder_stall_threshold: None });
        let effective = resolve(&settings, "Sonarr", "Title", Some("BadIndexer"));
        assert_eq!(effective.failure_remove_after, 3);
    }

    #[test]
    fn reset_strikes_all_resolves_to_full_reset() {
        let mut settings = Settings::default();
        settings.general.reset_strikes_on_progress = Some(serde_yaml::Value::String("all".to_string()));
        let effective = resolve(&settings, "Sonarr", "Title", None);
        assert_eq!(effective.reset_strikes_on_progress, None);
    }

    #[test]
    fn reset_strikes_by_n_resolves_to_partial_reset() {
        let mut settings = Settings::default();
        settings.general.reset_strikes_on_progress = Some(serde_yaml::Value::Number(2.into()));
        let effective = resolve(&settings, "Sonarr", "Title", None);
        assert_eq!(effective.reset_strikes_on_progress, Some(2));
    }

    #[test]
    fn reset_strikes_unset_resolves_to_full_reset() {
        let settings = Settings::default();
        let effective = resolve(&settings, "Sonarr", "Title", None);
        assert_eq!(effective.reset_strikes_on_progress, None);
    }

    #[test]
    fn whitelist_reflects_configured_entries() {
        let mut settings = Settings::default();
        settings.whitelist.ids.push(42);
        let list = whitelist(&settings);
        assert!(list.matches(&janitor_core::ItemSnapshot::new(serde_json::json!({"id": 42}))));
    }
}
