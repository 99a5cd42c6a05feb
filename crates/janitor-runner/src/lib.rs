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

//! Scheduler loop: one cycle per manager, run concurrently, paginated,
//! enriched from the configured torrent clients, and passed through the
//! decision engine before dispatching removal or reannounce actions.

mod manager;
mod metrics;
mod runner;

pub use manager::manage_service;
pub use metrics::{CycleSummary, ManagerMetrics};
pub use runner::Runner;
