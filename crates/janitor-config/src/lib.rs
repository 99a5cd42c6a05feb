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

//! YAML settings document loading, sanitization, and effective-settings
//! resolution for the queue janitor.
//!
//! Loading is two-phase: [`loader::load`] parses the on-disk document and
//! [`loader::overlay_env`] lets per-manager environment variables win over
//! it, then [`sanitize::sanitize`] clamps stray values and
//! [`sanitize::validate`] reports anything still suspicious. Everything
//! after that is read-only: [`resolver::resolve`] and [`resolver::whitelist`]
//! project the document down to what `janitor-core` actually consumes.

mod error;
mod loader;
mod model;
mod resolver;
mod sanitize;

pub use error::ConfigError;
pub use loader::{load, overlay_env, overlay_env_with};
pub use model::{
    CategoryConfig, ClientConnectionConfig, ClientsConfig, DestinationConfig, GeneralConfig,
    IndexerPolicyConfig, ManagerConfig, NotificationsConfig, ReannounceConfig, ReasonsValue,
    ResetStrikesPolicy, RuleEngineLayer, Settings, WhitelistConfig, parse_reset_strikes_policy,
};
pub use resolver::{resolve, whitelist};
pub use sanitize::{sanitize, validate};
