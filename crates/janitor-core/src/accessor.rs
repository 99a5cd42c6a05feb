//! Extraction of normalized fields from a manager's heterogeneous item JSON.

use serde_json::Value;

/// A single queue entry as returned by a manager, with the normalized
/// read surface the rest of the crate is built against.
///
/// Managers disagree on nesting and casing (`sizeleft` vs `sizeLeft`,
/// `indexer` vs `release.indexer`), so this wraps the raw JSON object rather
/// than modeling it as a fixed struct; every accessor defensively probes the
/// synonyms a manager might use and returns `None` rather than panicking.
#[derive(Debug, Clone)]
pub struct ItemSnapshot {
    raw: Value,
}

impl ItemSnapshot {
    /// Wrap a raw manager item.
    #[must_use]
    pub const fn new(raw: Value) -> Self {
        Self { raw }
    }

    /// Access the underlying JSON value, e.g. for kind-specific id lookups.
    #[must_use]
    pub const fn raw(&self) -> &Value {
        &self.raw
    }

    /// Queue entry id, required and unique within a manager for one cycle.
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        self.raw.get("id").and_then(Value::as_i64)
    }

    /// Human-readable title.
    #[must_use]
    pub fn title(&self) -> String {
        self.raw
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    /// Opaque torrent identifier used for dedup and client lookups.
    #[must_use]
    pub fn download_id(&self) -> Option<String> {
        self.raw
            .get("downloadId")
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    fn total_size(&self) -> Option<u64> {
        self.raw.get("size").and_then(as_u64)
    }

    fn size_left(&self) -> Option<i64> {
        self.raw
            .get("sizeleft")
            .or_else(|| self.raw.get("sizeLeft"))
            .and_then(as_i64)
    }

    /// Bytes downloaded so far: `size - sizeleft`, clamped to `[0, size]` so
    /// a negative or otherwise inconsistent `sizeleft` still yields a usable
    /// value instead of `None`.
    #[must_use]
    pub fn downloaded_bytes(&self) -> Option<u64> {
        let total = self.total_size()?;
        let left = self.size_left()?;
        let total_signed = i64::try_from(total).unwrap_or(i64::MAX);
        let downloaded = total_signed.saturating_sub(left).clamp(0, total_signed);
        u64::try_from(downloaded).ok()
    }

    /// Completion percentage in `[0, 100]`, clamped even if reported sizes
    /// disagree.
    #[must_use]
    pub fn progress_percent(&self) -> Option<f64> {
        let total = self.total_size()?;
        let downloaded = self.downloaded_bytes()?;
        if total == 0 {
            return None;
        }
        #[expect(clippy::cast_precision_loss, reason = "byte counts fit f64 precision in practice")]
        let percent = (downloaded as f64 / total as f64) * 100.0;
        Some(percent.clamp(0.0, 100.0))
    }

    /// True when `sizeleft == 0` or progress reached the `99.9%` ceiling.
    #[must_use]
    pub fn fully_downloaded(&self) -> bool {
        if self.size_left() == Some(0) {
            return true;
        }
        self.progress_percent().is_some_and(|p| p >= 99.9)
    }

    /// Indexer name, tried at the top level, then `release.*`, then
    /// `remoteEpisode.release.*`/`remoteMovie.release.*`.
    #[must_use]
    pub fn indexer_name(&self) -> Option<String> {
        for candidate in [
            &self.raw,
            self.raw.get("release").unwrap_or(&Value::Null),
            self.raw
                .get("remoteEpisode")
                .and_then(|v| v.get("release"))
                .unwrap_or(&Value::Null),
            self.raw
                .get("remoteMovie")
                .and_then(|v| v.get("release"))
                .unwrap_or(&Value::Null),
        ] {
            if let Some(name) = candidate
                .get("indexer")
                .or_else(|| candidate.get("indexerName"))
                .and_then(Value::as_str)
            {
                return Some(name.to_string());
            }
        }
        None
    }

    /// Seeder count, tried at the top level then nested release objects.
    #[must_use]
    pub fn seeders(&self) -> Option<i64> {
        for candidate in [
            &self.raw,
            self.raw.get("release").unwrap_or(&Value::Null),
            self.raw
                .get("remoteEpisode")
                .and_then(|v| v.get("release"))
                .unwrap_or(&Value::Null),
            self.raw
                .get("remoteMovie")
                .and_then(|v| v.get("release"))
                .unwrap_or(&Value::Null),
        ] {
            if let Some(seeders) = candidate
                .get("seeders")
                .or_else(|| candidate.get("seederCount"))
                .and_then(Value::as_i64)
            {
                return Some(seeders);
            }
        }
        None
    }

    /// True iff `protocol` (lowercased) contains `"torrent"` or equals `1`.
    #[must_use]
    pub fn is_torrent(&self) -> bool {
        match self.raw.get("protocol") {
            Some(Value::String(s)) => s.to_lowercase().contains("torrent"),
            Some(Value::Number(n)) => n.as_i64() == Some(1),
            _ => false,
        }
    }

    fn text_fields(&self) -> Vec<String> {
        let mut out = Vec::new();
        for key in ["status", "trackedDownloadStatus", "trackedDownloadState", "errorMessage"] {
            if let Some(s) = self.raw.get(key).and_then(Value::as_str) {
                out.push(s.to_lowercase());
            }
        }
        if let Some(messages) = self.raw.get("statusMessages").and_then(Value::as_array) {
            for message in messages {
                if let Some(text) = message.as_str() {
                    out.push(text.to_lowercase());
                } else if let Some(text) = message.get("title").and_then(Value::as_str) {
                    out.push(text.to_lowercase());
                }
            }
        }
        out
    }

    /// True iff any status-like field signals the item is queued/waiting.
    #[must_use]
    pub fn is_queued(&self) -> bool {
        const MARKERS: [&str; 3] = ["queued", "pending", "waiting"];
        if self.text_fields().iter().any(|f| MARKERS.iter().any(|m| f.contains(m))) {
            return true;
        }
        matches!(self.client_state().as_deref(), Some("download_wait" | "check_wait"))
    }

    /// True iff a state field reads `warning`/`error`/`stalled`, or a status
    /// message mentions stalling/no connections.
    #[must_use]
    pub fn is_stalled(&self) -> bool {
        const STATE_MARKERS: [&str; 3] = ["warning", "error", "stalled"];
        let fields = self.text_fields();
        if fields.iter().any(|f| STATE_MARKERS.iter().any(|m| f == m)) {
            return true;
        }
        fields
            .iter()
            .any(|f| f.contains("stalled") || f.contains("no connections"))
    }

    /// Whether the item's top-level state is `warning`/`error`.
    #[must_use]
    pub fn has_warning_or_error_state(&self) -> bool {
        self.text_fields().iter().any(|f| f == "warning" || f == "error")
    }

    /// Concatenated lowercased status/error/message text, for heuristic
    /// substring matching (tracker errors, import failures).
    #[must_use]
    pub fn status_text(&self) -> String {
        self.text_fields().join(" | ")
    }

    /// Client-enriched transfer speed in bytes/sec, if populated this cycle.
    #[must_use]
    pub fn client_speed(&self) -> Option<u64> {
        self.raw.get("clientDlSpeed").and_then(as_u64)
    }

    /// Client-enriched lifecycle state (e.g. `stalleddl`, `error`).
    #[must_use]
    pub fn client_state(&self) -> Option<String> {
        self.raw
            .get("clientState")
            .and_then(Value::as_str)
            .map(str::to_lowercase)
    }

    /// Client-enriched peer count.
    #[must_use]
    pub fn client_peers(&self) -> Option<i64> {
        self.raw.get("clientPeers").and_then(Value::as_i64)
    }

    /// Client-enriched active-seed count.
    #[must_use]
    pub fn client_seeds(&self) -> Option<i64> {
        self.raw.get("clientSeeds").and_then(Value::as_i64)
    }

    /// Client-enriched tracker messages joined for substring scanning.
    #[must_use]
    pub fn client_trackers_text(&self) -> String {
        self.raw
            .get("clientTrackersMsg")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(" | ")
                    .to_lowercase()
            })
            .unwrap_or_default()
    }

    /// Any known kind-specific id (episode, series, movie, album), first hit wins.
    #[must_use]
    pub fn primary_kind_id(&self) -> Option<i64> {
        for key in ["episodeId", "seriesId", "movieId", "albumId"] {
            if let Some(id) = self.raw.get(key).and_then(Value::as_i64) {
                return Some(id);
            }
        }
        None
    }

    /// Episode ids, if present, for multi-episode search commands.
    #[must_use]
    pub fn episode_ids(&self) -> Vec<i64> {
        self.raw
            .get("episodeIds")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_i64).collect())
            .unwrap_or_default()
    }
}

fn as_u64(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| value.as_i64().and_then(|v| u64::try_from(v).ok()))
}

fn as_i64(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_u64().and_then(|v| i64::try_from(v).ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn downloaded_bytes_requires_both_fields() {
        let item = ItemSnapshot::new(json!({"size": 1000, "sizeleft": 900}));
        assert_eq!(item.downloaded_bytes(), Some(100));

        let missing = ItemSnapshot::new(json!({"size": 1000}));
        assert_eq!(missing.downloaded_bytes(), None);
    }

    #[test]
    fn downloaded_bytes_clamps_negative_sizeleft() {
        let item = ItemSnapshot::new(json!({"size": 1000, "sizeleft": -900_i64}));
        assert_eq!(item.downloaded_bytes(), Some(1000));
    }

    #[test]
    fn progress_percent_clamps_to_range() {
        let item = ItemSnapshot::new(json!({"size": 1000, "sizeleft": -900_i64}));
        let percent = item.progress_percent().unwrap();
        assert!((percent - 100.0).abs() < f64::EPSILON);
        assert!((0.0..=100.0).contains(&percent));
    }

    #[test]
    fn seeders_falls_back_through_nesting() {
        let item = ItemSnapshot::new(json!({"release": {"seeders": 4}}));
        assert_eq!(item.seeders(), Some(4));

        let nested = ItemSnapshot::new(json!({"remoteMovie": {"release": {"seederCount": 2}}}));
        assert_eq!(nested.seeders(), Some(2));
    }

    #[test]
    fn is_torrent_matches_string_or_numeric_protocol() {
        assert!(ItemSnapshot::new(json!({"protocol": "Torrent"})).is_torrent());
        assert!(ItemSnapshot::new(json!({"protocol": 1})).is_torrent());
        assert!(!ItemSnapshot::new(json!({"protocol": "usenet"})).is_torrent());
    }

    #[test]
    fn is_queued_checks_status_and_client_state() {
        assert!(ItemSnapshot::new(json!({"status": "Queued"})).is_queued());
        assert!(ItemSnapshot::new(json!({"clientState": "download_wait"})).is_queued());
        assert!(!ItemSnapshot::new(json!({"status": "downloading"})).is_queued());
    }

    #[test]
    fn is_stalled_checks_status_messages() {
        let item = ItemSnapshot::new(json!({"statusMessages": ["Tracker stalled"]}));
        assert!(item.is_stalled());
    }
}
