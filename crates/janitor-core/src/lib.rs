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

//! Pure domain logic for the download queue janitor.
//!
//! This crate has no I/O: it models a manager item snapshot, the ledger entry
//! shapes a strike ledger persists across cycles, the stall-rule evaluator,
//! and the decision engine that wraps it with whitelist, grace, reannounce,
//! and strike-accounting behavior. Everything here is deterministic and total
//! so that callers (the runner) can treat it as a function of its inputs.

mod accessor;
mod decision;
mod model;
mod rules;
mod settings;

pub use accessor::ItemSnapshot;
pub use decision::{Decision, Whitelist, decide};
pub use model::{INDEXER_KEY_INFIX, IndexerEntry, ItemEntry, LedgerRecord, indexer_key, ledger_key, normalize_item_entry};
pub use rules::{Reason, evaluate};
pub use settings::EffectiveSettings;
