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
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Queue janitor application bootstrap wiring.
//!
//! Layout: `bootstrap.rs` (config load, dependency wiring, shutdown), thin
//! `main.rs` that delegates to [`run_app`].

pub mod bootstrap;
mod error;

pub use bootstrap::run_app;
pub use error::{AppError, AppResult};
