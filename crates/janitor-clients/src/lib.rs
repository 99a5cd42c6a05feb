#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]

//! Torrent-client adapters used to enrich queue items with client-side
//! speed/peer/tracker state and to drive reannounce/recheck requests.
//!
//! Every adapter method swallows its own transport failures and returns
//! `None`/`false`: a client being briefly unreachable must never interrupt a
//! cycle over items that don't even need it.

mod deluge;
mod qbittorrent;
mod registry;
mod transmission;

pub use deluge::DelugeClient;
pub use qbittorrent::QbittorrentClient;
pub use registry::ClientRegistry;
pub use transmission::TransmissionClient;

use async_trait::async_trait;

/// Client-reported state for one download, as far as the adapter could tell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientInfo {
    /// Client-specific state label (`downloading`, `stalledDL`, `seeding`, ...).
    pub state: Option<String>,
    /// Connected leechers/peers.
    pub peers: Option<u32>,
    /// Connected or reported seeders.
    pub seeds: Option<u32>,
    /// Joined tracker status/announce messages, when the client exposes them.
    pub trackers_text: Option<String>,
}

/// A torrent-client adapter keyed by the manager's `downloadId`.
#[async_trait]
pub trait TorrentClient: Send + Sync {
    /// Current download speed in bytes/sec, if the client still knows about this torrent.
    async fn get_speed(&self, download_id: &str) -> Option<u64>;

    /// Client-reported state, peers, and tracker messages.
    async fn get_info(&self, download_id: &str) -> Option<ClientInfo>;

    /// Force a tracker reannounce (optionally with a hash recheck). Returns
    /// whether the request was at least accepted by the client.
    async fn reannounce(&self, download_id: &str, do_recheck: bool) -> bool;
}
