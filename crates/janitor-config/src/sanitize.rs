//! Sanitizing and validating a loaded settings document. Neither function
//! can fail: sanitize silently coerces, validate only returns warnings for
//! the caller to log.

use crate::model::{RuleEngineLayer, Settings};

fn clamp_non_negative(value: &mut Option<i64>) {
    if let Some(inner) = value {
        if *inner < 0 {
            *inner = 0;
        }
    }
}

fn clamp_non_negative_f64(value: &mut Option<f64>) {
    if let Some(inner) = value {
        if *inner < 0.0 {
            *inner = 0.0;
        }
    }
}

fn sanitize_rule_layer(layer: &mut RuleEngineLayer) {
    clamp_non_negative(&mut layer.grace_period_minutes);
    clamp_non_negative(&mut layer.max_queue_age_hours);
    clamp_non_negative(&mut layer.no_progress_max_age_minutes);
    clamp_non_negative(&mut layer.min_speed_bytes_per_sec);
    clamp_non_negative(&mut layer.min_speed_duration_minutes);
    clamp_non_negative(&mut layer.client_zero_activity_minutes);
    clamp_non_negative(&mut layer.large_size_gb);
    clamp_non_negative_f64(&mut layer.large_progress_ceiling_percent);
    clamp_non_negative(&mut layer.large_zero_seeders_remove_minutes);
    clamp_non_negative(&mut layer.seeder_stall_threshold);
    clamp_non_negative_f64(&mut layer.progress_ceiling_percent);
    clamp_non_negative(&mut layer.stall_limit);
    clamp_non_negative(&mut layer.tracker_error_strikes);
    if let Some(reannounce) = &mut layer.reannounce {
        clamp_non_negative(&mut reannounce.cooldown_minutes);
    }
}

/// Sanitize `settings` in place: clamp numeric rule-engine knobs to `>= 0`,
/// drop notification destinations missing a `url`, and coerce a scalar
/// `reasons` value into a single-element list.
pub fn sanitize(settings: &mut Settings) {
    sanitize_rule_layer(&mut settings.rule_engine);
    for manager in settings.services.values_mut() {
        sanitize_rule_layer(&mut manager.rules);
    }
    for category in &mut settings.categories {
        sanitize_rule_layer(&mut category.rules);
    }
    settings.notifications.destinations.retain(|destination| {
        let keep = destination.url.is_some();
        if !keep {
            let label = destination.name.clone().unwrap_or_else(|| "<unnamed>".to_string());
            tracing::warn!(destination = %label, "dropping notification destination with no url");
        }
        keep
    });
}

/// Validate `settings`, returning human-readable warnings for inconsistent
/// (but non-fatal) configuration. Never aborts; callers log these at startup.
#[must_use]
pub fn validate(settings: &Settings) -> Vec<String> {
    let mut warnings = Vec::new();

    for (name, manager) in &settings.services {
        match (&manager.api_url, &manager.api_key) {
            (Some(_), None) => warnings.push(format!("manager '{name}' has api_url but no api_key")),
            (None, Some(_)) => warnings.push(format!("manager '{name}' has api_key but no api_url")),
            _ => {}
        }
    }

    for destination in &settings.notifications.destinations {
        if destination.url.is_none() {
            let label = destination.name.clone().unwrap_or_else(|| "<unnamed>".to_string());
            warnings.push(format!("notification destination '{label}' has no url and will be ignored"));
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DestinationConfig, ManagerConfig, RuleEngineLayer};

    #[test]
    fn sanitize_clamps_negative_numeric_knobs() {
        let mut settings = Settings { rule_engine: RuleEngineLayer { grace_period_minutes: Some(-5), ..Default::default() }, ..Default::default() };
        sanitize(&mut settings);
        assert_eq!(settings.rule_engine.grace_period_minutes, Some(0));
    }

    #[test]
    fn sanitize_drops_destinations_without_url() {
        let mut settings = Settings::default();
        settings.notifications.destinations.push(DestinationConfig::default());
        sanitize(&mut settings);
        assert!(settings.notifications.destinations.is_empty());
    }

    #[test]
    fn validate_warns_on_partial_env_pair() {
        let mut settings = Settings::default();
        settings.services.insert(
            "Sonarr".to_string(),
            ManagerConfig { api_url: Some("http://sonarr".to_string()), api_key: None, ..Default::default() },
        );
        let warnings = validate(&settings);
        assert!(warnings.iter().any(|w| w.contains("Sonarr")));
    }
}
