//! Action executor: removal/blacklist and the per-manager replacement search.

use serde_json::{Value, json};

use janitor_events::{DecisionEvent, EventBus};

use crate::client::ManagerClient;

/// Which manager kind an item came from, for search-command shaping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerKind {
    /// Sonarr: episode or series search.
    Sonarr,
    /// Radarr: movie search.
    Radarr,
    /// Lidarr: album search.
    Lidarr,
}

impl ManagerKind {
    /// Match a manager's configured name, case-insensitively.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("sonarr") {
            Some(Self::Sonarr)
        } else if name.eq_ignore_ascii_case("radarr") {
            Some(Self::Radarr)
        } else if name.eq_ignore_ascii_case("lidarr") {
            Some(Self::Lidarr)
        } else {
            None
        }
    }

    /// Build the `/command` body for a replacement search, or `None` if the
    /// item carries none of the ids this manager's search command needs.
    #[must_use]
    pub fn build_search_command(self, item: &Value) -> Option<Value> {
        match self {
            Self::Sonarr => episode_search_command(item).or_else(|| series_search_command(item)),
            Self::Radarr => item.get("movieId").and_then(Value::as_i64).map(|id| json!({ "name": "MoviesSearch", "movieIds": [id] })),
            Self::Lidarr => item.get("albumId").and_then(Value::as_i64).map(|id| json!({ "name": "AlbumSearch", "albumIds": [id] })),
        }
    }
}

fn episode_search_command(item: &Value) -> Option<Value> {
    if let Some(ids) = item.get("episodeIds").and_then(Value::as_array) {
        let ids: Vec<i64> = ids.iter().filter_map(Value::as_i64).collect();
        if !ids.is_empty() {
            return Some(json!({ "name": "EpisodeSearch", "episodeIds": ids }));
        }
    }
    item.get("episodeId").and_then(Value::as_i64).map(|id| json!({ "name": "EpisodeSearch", "episodeIds": [id] }))
}

fn series_search_command(item: &Value) -> Option<Value> {
    item.get("seriesId").and_then(Value::as_i64).map(|id| json!({ "name": "SeriesSearch", "seriesId": id }))
}

/// Per-manager knobs that shape the removal request.
#[derive(Debug, Clone, Copy)]
pub struct RemovalPolicy {
    /// Use `blocklist` (true) or `blacklist` (false) as the query param name.
    pub use_blocklist_param: bool,
    /// Pass `removeFromClient=true`.
    pub remove_from_client: bool,
    /// Pass `skipImport=true`.
    pub skip_import: bool,
    /// Suppress the HTTP mutation; still emits a `dry_remove` event.
    pub dry_run: bool,
}

/// `DELETE /queue/{id}` with the blacklist/removal query parameters, then
/// emit a `remove` (or `dry_remove`) event.
pub async fn remove_and_blacklist(
    client: &ManagerClient<'_>,
    events: &EventBus,
    service: &str,
    id: i64,
    title: &str,
    reason: Option<&str>,
    policy: RemovalPolicy,
) {
    if policy.dry_run {
        events
            .emit(DecisionEvent {
                event: "dry_remove".to_string(),
                service: service.to_string(),
                id,
                title: title.to_string(),
                reason: reason.map(str::to_string),
                notify: true,
            })
            .await;
        return;
    }

    let param_name = if policy.use_blocklist_param { "blocklist" } else { "blacklist" };
    let mut query: Vec<(&str, &str)> = vec![(param_name, "true")];
    if policy.remove_from_client {
        query.push(("removeFromClient", "true"));
    }
    if policy.skip_import {
        query.push(("skipImport", "true"));
    }

    client.delete_queue_item(id, &query).await;
    tracing::info!(service, id, title, reason = reason.unwrap_or("none"), "removed and blacklisted queue item");
    events
        .emit(DecisionEvent {
            event: "remove".to_string(),
            service: service.to_string(),
            id,
            title: title.to_string(),
            reason: reason.map(str::to_string),
            notify: true,
        })
        .await;
}

/// Remove and blacklist with reason `strike_limit`, then trigger a
/// replacement search if the item carries the ids this manager kind needs.
pub async fn blacklist_and_search_new_release(
    client: &ManagerClient<'_>,
    events: &EventBus,
    service: &str,
    kind: ManagerKind,
    item: &Value,
    id: i64,
    title: &str,
    policy: RemovalPolicy,
) {
    remove_and_blacklist(client, events, service, id, title, Some("strike_limit"), policy).await;
    if policy.dry_run {
        return;
    }
    match kind.build_search_command(item) {
        Some(command) => {
            client.post_command(&command).await;
            tracing::info!(service, id, title, "triggered replacement search after removal");
        }
        None => tracing::warn!(service, id, title, "no usable id for replacement search, skipping"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sonarr_prefers_episode_ids_over_series() {
        let item = json!({"episodeId": 7, "seriesId": 3});
        let command = ManagerKind::Sonarr.build_search_command(&item).unwrap();
        assert_eq!(command["name"], "EpisodeSearch");
        assert_eq!(command["episodeIds"], json!([7]));
    }

    #[test]
    fn sonarr_falls_back_to_series_search() {
        let item = json!({"seriesId": 3});
        let command = ManagerKind::Sonarr.build_search_command(&item).unwrap();
        assert_eq!(command["name"], "SeriesSearch");
    }

    #[test]
    fn radarr_requires_movie_id() {
        assert!(ManagerKind::Radarr.build_search_command(&json!({})).is_none());
        let command = ManagerKind::Radarr.build_search_command(&json!({"movieId": 12})).unwrap();
        assert_eq!(command["movieIds"], json!([12]));
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(ManagerKind::parse("sonarr"), Some(ManagerKind::Sonarr));
        assert_eq!(ManagerKind::parse("RADARR"), Some(ManagerKind::Radarr));
        assert_eq!(ManagerKind::parse("plex"), None);
    }
}
