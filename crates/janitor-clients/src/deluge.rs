//! Deluge JSON-RPC adapter: every call re-authenticates first since the
//! WebUI's session cookie is short-lived and not worth caching here.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::{ClientInfo, TorrentClient};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Adapter for a single Deluge WebUI JSON-RPC endpoint.
pub struct DelugeClient {
    http: reqwest::Client,
    url: String,
    password: Option<String>,
}

impl DelugeClient {
    /// Build an adapter for the WebUI at `url`.
    #[must_use]
    pub fn new(url: impl Into<String>, password: Option<String>) -> Self {
        let url = url.into();
        let url = if url.ends_with("/json") { url } else { format!("{}/json", url.trim_end_matches('/')) };
        Self { http: reqwest::Client::new(), url, password }
    }

    async fn call(&self, method: &str, params: Value) -> Option<Value> {
        let login = json!({ "method": "auth.login", "params": [self.password.clone().unwrap_or_else(|| "deluge".to_string())], "id": 1 });
        let _ = self.http.post(&self.url).timeout(REQUEST_TIMEOUT).json(&login).send().await;

        let body = json!({ "method": method, "params": params, "id": 2 });
        let response = self.http.post(&self.url).timeout(REQUEST_TIMEOUT).json(&body).send().await.ok()?;
        if !response.status().is_success() {
            tracing::warn!(method, url = %self.url, status = response.status().as_u16(), "deluge rpc call rejected");
            return None;
        }
        response.json::<Value>().await.ok()
    }

    async fn torrent_status(&self, info_hash: &str) -> Option<Value> {
        let keys = ["state", "download_payload_rate", "num_peers", "num_peers_connected", "num_seeds", "total_seeds", "tracker_status"];
        let result = self.call("core.get_torrent_status", json!([info_hash, keys])).await?;
        result.get("result").cloned()
    }
}

#[async_trait]
impl TorrentClient for DelugeClient {
    async fn get_speed(&self, download_id: &str) -> Option<u64> {
        self.torrent_status(download_id).await?.get("download_payload_rate").and_then(Value::as_u64)
    }

    async fn get_info(&self, download_id: &str) -> Option<ClientInfo> {
        let status = self.torrent_status(download_id).await?;
        let peers = status
            .get("num_peers_connected")
            .or_else(|| status.get("num_peers"))
            .and_then(Value::as_u64)
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX));
        let seeds = status
            .get("num_seeds")
            .or_else(|| status.get("total_seeds"))
            .and_then(Value::as_u64)
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX));
        Some(ClientInfo {
            state: status.get("state").and_then(|v| v.as_str()).map(str::to_lowercase),
            peers,
            seeds,
            trackers_text: status.get("tracker_status").and_then(|v| v.as_str()).map(str::to_string),
        })
    }

    async fn reannounce(&self, download_id: &str, do_recheck: bool) -> bool {
        let reannounced = self
            .call("core.force_reannounce", json!([[download_id]]))
            .await
            .and_then(|value| value.get("result").and_then(Value::as_bool))
            .unwrap_or(false);
        if do_recheck {
            self.call("core.force_recheck", json!([[download_id]])).await;
        }
        reannounced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_gets_json_suffix_appended_once() {
        let client = DelugeClient::new("http://deluge:8112", None);
        assert_eq!(client.url, "http://deluge:8112/json");
        let already = DelugeClient::new("http://deluge:8112/json", None);
        assert_eq!(already.url, "http://deluge:8112/json");
    }
}
