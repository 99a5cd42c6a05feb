//! qBittorrent WebUI adapter: cookie-based login followed by the `torrents/*`
//! REST endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{COOKIE, SET_COOKIE};

use crate::{ClientInfo, TorrentClient};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Adapter for a single qBittorrent WebUI instance.
pub struct QbittorrentClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl QbittorrentClient {
    /// Build an adapter for the WebUI at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), base_url: base_url.into(), username: username.into(), password: password.into() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }

    async fn login(&self) -> Option<String> {
        let response = self
            .http
            .post(self.url("api/v2/auth/login"))
            .timeout(REQUEST_TIMEOUT)
            .form(&[("username", self.username.as_str()), ("password", self.password.as_str())])
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            tracing::warn!(base_url = %self.base_url, status = response.status().as_u16(), "qbittorrent login rejected");
            return None;
        }
        response.headers().get(SET_COOKIE).and_then(|value| value.to_str().ok()).map(|raw| {
            raw.split(';').next().unwrap_or(raw).to_string()
        })
    }

    async fn authenticated_get(&self, path: &str, query: &[(&str, &str)]) -> Option<reqwest::Response> {
        let cookie = self.login().await?;
        let response = self
            .http
            .get(self.url(path))
            .timeout(REQUEST_TIMEOUT)
            .header(COOKIE, cookie)
            .query(query)
            .send()
            .await
            .ok()?;
        response.status().is_success().then_some(response)
    }

    async fn authenticated_post(&self, path: &str, form: &[(&str, &str)]) -> bool {
        let Some(cookie) = self.login().await else { return false };
        self.http
            .post(self.url(path))
            .timeout(REQUEST_TIMEOUT)
            .header(COOKIE, cookie)
            .form(form)
            .send()
            .await
            .is_ok_and(|response| response.status().is_success())
    }
}

#[async_trait]
impl TorrentClient for QbittorrentClient {
    async fn get_speed(&self, download_id: &str) -> Option<u64> {
        let response = self.authenticated_get("api/v2/torrents/info", &[("hashes", download_id)]).await?;
        let torrents: Vec<serde_json::Value> = response.json().await.ok()?;
        torrents.first()?.get("dlspeed")?.as_u64()
    }

    async fn get_info(&self, download_id: &str) -> Option<ClientInfo> {
        let info_response = self.authenticated_get("api/v2/torrents/info", &[("hashes", download_id)]).await;
        let mut info = ClientInfo::default();
        if let Some(response) = info_response {
            if let Ok(torrents) = response.json::<Vec<serde_json::Value>>().await {
                if let Some(torrent) = torrents.first() {
                    info.state = torrent.get("state").and_then(|v| v.as_str()).map(str::to_string);
                    info.peers = torrent.get("num_leechs").and_then(serde_json::Value::as_u64).map(|n| u32::try_from(n).unwrap_or(u32::MAX));
                    info.seeds = torrent.get("num_seeds").and_then(serde_json::Value::as_u64).map(|n| u32::try_from(n).unwrap_or(u32::MAX));
                }
            }
        }
        if let Some(response) = self.authenticated_get("api/v2/torrents/trackers", &[("hash", download_id)]).await {
            if let Ok(trackers) = response.json::<Vec<serde_json::Value>>().await {
                let messages: Vec<String> = trackers
                    .iter()
                    .filter_map(|tracker| tracker.get("msg").and_then(|v| v.as_str()))
                    .filter(|msg| !msg.is_empty())
                    .map(str::to_string)
                    .collect();
                if !messages.is_empty() {
                    info.trackers_text = Some(messages.join(" | "));
                }
            }
        }
        Some(info)
    }

    async fn reannounce(&self, download_id: &str, do_recheck: bool) -> bool {
        let reannounced = self.authenticated_post("api/v2/torrents/reannounce", &[("hashes", download_id)]).await;
        if do_recheck {
            self.authenticated_post("api/v2/torrents/recheck", &[("hashes", download_id)]).await;
        }
        reannounced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_trims_trailing_slash() {
        let client = QbittorrentClient::new("http://qbt:8080/", "admin", "pw");
        assert_eq!(client.url("api/v2/auth/login"), "http://qbt:8080/api/v2/auth/login");
    }
}
