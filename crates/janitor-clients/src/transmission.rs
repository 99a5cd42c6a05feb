//! Transmission RPC adapter: handles the CSRF-style session-id handshake
//! (a `409` response carries the session id to retry with).

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::{ClientInfo, TorrentClient};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const SESSION_HEADER: &str = "X-Transmission-Session-Id";

/// Adapter for a single Transmission RPC endpoint.
pub struct TransmissionClient {
    http: reqwest::Client,
    url: String,
    username: Option<String>,
    password: Option<String>,
}

impl TransmissionClient {
    /// Build an adapter for the RPC endpoint at `url`.
    #[must_use]
    pub fn new(url: impl Into<String>, username: Option<String>, password: Option<String>) -> Self {
        Self { http: reqwest::Client::new(), url: url.into().trim_end_matches('/').to_string(), username, password }
    }

    fn authenticate(&self, mut builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.username.is_some() || self.password.is_some() {
            builder = builder.basic_auth(self.username.clone().unwrap_or_default(), self.password.clone());
        }
        builder
    }

    async fn call(&self, method: &str, arguments: Value) -> Option<Value> {
        let body = json!({ "method": method, "arguments": arguments });
        let response = self.authenticate(self.http.post(&self.url).timeout(REQUEST_TIMEOUT).json(&body)).send().await.ok()?;

        if response.status().as_u16() == 409 {
            let session_id = response.headers().get(SESSION_HEADER).cloned()?;
            let retry = self
                .authenticate(self.http.post(&self.url).timeout(REQUEST_TIMEOUT).json(&body))
                .header(SESSION_HEADER, session_id)
                .send()
                .await
                .ok()?;
            if !retry.status().is_success() {
                tracing::warn!(method, status = retry.status().as_u16(), "transmission rpc call rejected after session retry");
                return None;
            }
            return retry.json::<Value>().await.ok();
        }

        if !response.status().is_success() {
            tracing::warn!(method, status = response.status().as_u16(), "transmission rpc call rejected");
            return None;
        }
        response.json::<Value>().await.ok()
    }

    async fn get_torrent(&self, torrent_id: &str, fields: &[&str]) -> Option<Value> {
        let response = self.call("torrent-get", json!({ "ids": [torrent_id], "fields": fields })).await?;
        response.get("arguments")?.get("torrents")?.as_array()?.first().cloned()
    }
}

fn status_to_state(status: Option<i64>) -> &'static str {
    match status {
        Some(0) => "stopped",
        Some(1) => "check_wait",
        Some(2) => "checking",
        Some(3) => "download_wait",
        Some(4) => "downloading",
        Some(5) => "seed_wait",
        Some(6) => "seeding",
        _ => "unknown",
    }
}

#[async_trait]
impl TorrentClient for TransmissionClient {
    async fn get_speed(&self, download_id: &str) -> Option<u64> {
        let torrent = self.get_torrent(download_id, &["rateDownload"]).await?;
        torrent.get("rateDownload").and_then(Value::as_u64)
    }

    async fn get_info(&self, download_id: &str) -> Option<ClientInfo> {
        let fields = ["status", "peersConnected", "peersSendingToUs", "peersGettingFromUs", "rateDownload", "trackerStats"];
        let torrent = self.get_torrent(download_id, &fields).await?;

        let state = status_to_state(torrent.get("status").and_then(Value::as_i64)).to_string();
        let peers = torrent.get("peersConnected").and_then(Value::as_u64).map(|n| u32::try_from(n).unwrap_or(u32::MAX));

        let stats = torrent.get("trackerStats").and_then(Value::as_array).cloned().unwrap_or_default();
        let seeds = stats
            .iter()
            .filter_map(|entry| entry.get("seederCount").and_then(Value::as_i64))
            .filter(|count| *count >= 0)
            .max()
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX));
        let messages: Vec<String> = stats
            .iter()
            .filter_map(|entry| entry.get("lastAnnounceResult").or_else(|| entry.get("lastScrapeResult")))
            .filter_map(|value| value.as_str())
            .filter(|msg| !msg.is_empty())
            .map(str::to_string)
            .collect();

        Some(ClientInfo {
            state: Some(state),
            peers,
            seeds,
            trackers_text: (!messages.is_empty()).then(|| messages.join(" | ")),
        })
    }

    async fn reannounce(&self, download_id: &str, do_recheck: bool) -> bool {
        let reannounced = self.call("torrent-reannounce", json!({ "ids": [download_id] })).await.is_some();
        if do_recheck {
            self.call("torrent-verify", json!({ "ids": [download_id] })).await;
        }
        reannounced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_to_state_maps_known_codes() {
        assert_eq!(status_to_state(Some(4)), "downloading");
        assert_eq!(status_to_state(Some(6)), "seeding");
        assert_eq!(status_to_state(Some(99)), "unknown");
        assert_eq!(status_to_state(None), "unknown");
    }
}
