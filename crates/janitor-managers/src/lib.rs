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

//! Sonarr/Radarr/Lidarr queue REST surface: paginated reads, and the
//! remove/blacklist/search action executor the runner calls once the
//! decision engine asks for a removal.

mod actions;
mod client;

pub use actions::{ManagerKind, RemovalPolicy, blacklist_and_search_new_release, remove_and_blacklist};
pub use client::{ManagerClient, QueuePage};
