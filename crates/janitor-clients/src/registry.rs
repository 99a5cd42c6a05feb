//! Fan-out over whichever torrent clients are configured: the first
//! configured client to answer a question wins, and reannounce is attempted
//! against every configured client.

use crate::{ClientInfo, DelugeClient, QbittorrentClient, TorrentClient, TransmissionClient};

/// Holds the subset of torrent-client adapters the operator configured.
#[derive(Default)]
pub struct ClientRegistry {
    qbittorrent: Option<QbittorrentClient>,
    transmission: Option<TransmissionClient>,
    deluge: Option<DelugeClient>,
}

impl ClientRegistry {
    /// Build a registry from whichever adapters were configured.
    #[must_use]
    pub const fn new(qbittorrent: Option<QbittorrentClient>, transmission: Option<TransmissionClient>, deluge: Option<DelugeClient>) -> Self {
        Self { qbittorrent, transmission, deluge }
    }

    /// Whether no client was configured at all; callers can skip enrichment.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.qbittorrent.is_none() && self.transmission.is_none() && self.deluge.is_none()
    }

    fn clients(&self) -> [Option<&dyn TorrentClient>; 3] {
        [
            self.qbittorrent.as_ref().map(|c| c as &dyn TorrentClient),
            self.transmission.as_ref().map(|c| c as &dyn TorrentClient),
            self.deluge.as_ref().map(|c| c as &dyn TorrentClient),
        ]
    }

    /// Current download speed from the first configured client that reports one.
    pub async fn get_speed(&self, download_id: &str) -> Option<u64> {
        for client in self.clients().into_iter().flatten() {
            if let Some(speed) = client.get_speed(download_id).await {
                return Some(speed);
            }
        }
        None
    }

    /// Merge client info across every configured client: a field already
    /// filled by an earlier (higher-priority) client is never overwritten.
    pub async fn enrich(&self, download_id: &str) -> ClientInfo {
        let mut merged = ClientInfo::default();
        for client in self.clients().into_iter().flatten() {
            let Some(info) = client.get_info(download_id).await else { continue };
            merged.state = merged.state.or(info.state);
            merged.peers = merged.peers.or(info.peers);
            merged.seeds = merged.seeds.or(info.seeds);
            merged.trackers_text = merged.trackers_text.or(info.trackers_text);
        }
        merged
    }

    /// Request a reannounce from every configured client; `true` if any
    /// client accepted it.
    pub async fn reannounce(&self, download_id: &str, do_recheck: bool) -> bool {
        let mut attempted = false;
        for client in self.clients().into_iter().flatten() {
            if client.reannounce(download_id, do_recheck).await {
                attempted = true;
            }
        }
        attempted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_registry_reports_empty() {
        let registry = ClientRegistry::default();
        assert!(registry.is_empty());
    }
}
