//! Argument parsing and command dispatch.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use janitor_core::{ItemEntry, ItemSnapshot, evaluate};
use janitor_ledger::Ledger;

/// Default path to the strike ledger when neither the flag nor the
/// environment variable supplies one.
const DEFAULT_STRIKE_FILE: &str = "/app/data/strikes.json";
/// Default path to the YAML settings document.
const DEFAULT_CONFIG_PATH: &str = "/app/config.yaml";

#[derive(Debug, Parser)]
#[command(name = "janitor-cli", about = "Inspect and simulate the queue janitor's strike ledger")]
struct Cli {
    /// Path to the strike ledger JSON file.
    #[arg(long, env = "STRIKE_FILE_PATH", default_value = DEFAULT_STRIKE_FILE, global = true)]
    strike_file: PathBuf,

    /// Path to the YAML settings document, used only by `simulate`.
    #[arg(long, env = "CONFIG_PATH", default_value = DEFAULT_CONFIG_PATH, global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the full strike ledger as JSON.
    List,
    /// Clear one ledger entry, or the entire ledger when no key is given.
    Clear {
        /// Ledger key to clear, e.g. `Sonarr:123`.
        #[arg(long)]
        key: Option<String>,
    },
    /// Print a summary of ledger entry counts and active strikes.
    Status,
    /// Run the rule evaluator once against a synthesized entry for an item.
    Simulate {
        /// Path to a JSON file containing one manager queue item.
        item_json: PathBuf,
        /// Manager name used to resolve effective settings.
        #[arg(long, default_value = "Sonarr")]
        service: String,
    },
}

/// Parse arguments, dispatch to the matching command, and return the
/// process exit code: `0` on success, `1` when no subcommand was given or a
/// command failed.
///
/// # Errors
///
/// Returns an error if ledger or config I/O fails in a way the command
/// cannot recover from (e.g. the `simulate` item file is missing).
pub fn run() -> Result<i32> {
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        Cli::command().print_help().ok();
        println!();
        return Ok(1);
    };

    let ledger = Ledger::new(&cli.strike_file);
    match command {
        Command::List => cmd_list(&ledger),
        Command::Clear { key } => cmd_clear(&ledger, key.as_deref()),
        Command::Status => cmd_status(&ledger),
        Command::Simulate { item_json, service } => cmd_simulate(&item_json, &service, &cli.config),
    }?;
    Ok(0)
}

fn cmd_list(ledger: &Ledger) -> Result<()> {
    let sorted: BTreeMap<_, _> = ledger.load().into_iter().collect();
    println!("{}", serde_json::to_string_pretty(&sorted)?);
    Ok(())
}

fn cmd_clear(ledger: &Ledger, key: Option<&str>) -> Result<()> {
    match key {
        Some(key) => {
            let mut map = ledger.load();
            if map.remove(key).is_some() {
                ledger.save(&map)?;
                println!("Cleared {key}");
            } else {
                println!("Key not found");
            }
        }
        None => {
            ledger.save(&std::collections::HashMap::new())?;
            println!("Cleared all strikes");
        }
    }
    Ok(())
}

fn cmd_status(ledger: &Ledger) -> Result<()> {
    let map = ledger.load();
    let mut entries = 0u64;
    let mut active_strikes = 0u64;
    let mut indexer_entries = 0u64;
    for (key, record) in &map {
        if key.contains(janitor_core::INDEXER_KEY_INFIX) {
            indexer_entries += 1;
            continue;
        }
        entries += 1;
        if record.as_item().is_some_and(|item| item.count > 0) {
            active_strikes += 1;
        }
    }

    let summary = serde_json::json!({
        "strike_file": ledger.path().display().to_string(),
        "entries": entries,
        "active_strikes": active_strikes,
        "indexer_entries": indexer_entries,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn cmd_simulate(item_json: &std::path::Path, service: &str, config_path: &std::path::Path) -> Result<()> {
    let raw = std::fs::read_to_string(item_json).with_context(|| format!("reading {}", item_json.display()))?;
    let item: serde_json::Value = serde_json::from_str(&raw)?;

    let size = item.get("size").and_then(serde_json::Value::as_u64);
    let sizeleft = item.get("sizeleft").and_then(serde_json::Value::as_u64);
    let last_dl = match (size, sizeleft) {
        (Some(size), Some(sizeleft)) => Some(size.saturating_sub(sizeleft)),
        _ => None,
    };

    let now = i64::try_from(SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)).unwrap_or(i64::MAX);
    let entry = ItemEntry { count: 0, last_dl, first_seen_ts: now - 3600, last_progress_ts: None, ..ItemEntry::default() };

    let mut settings = janitor_config::load(config_path).unwrap_or_default();
    janitor_config::sanitize(&mut settings);

    let snapshot = ItemSnapshot::new(item);
    let title = snapshot.title();
    let indexer_name = snapshot.indexer_name();
    let effective = janitor_config::resolve(&settings, service, &title, indexer_name.as_deref());
    let indexer_override = indexer_name.as_deref().and_then(|name| settings.indexer_policies.get(name)).and_then(|policy| policy.seeder_stall_threshold);

    let reason = evaluate(&snapshot, &entry, false, &effective, indexer_override, now);
    let output = serde_json::json!({ "reason": reason.map(|reason| reason.as_str()) });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use janitor_core::LedgerRecord;

    #[test]
    fn clear_reports_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path().join("strikes.json"));
        ledger.save(&std::collections::HashMap::new()).unwrap();
        assert!(cmd_clear(&ledger, Some("Sonarr:1")).is_ok());
    }

    #[test]
    fn status_counts_indexer_and_item_entries_separately() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path().join("strikes.json"));
        let mut map = std::collections::HashMap::new();
        map.insert("Sonarr:1".to_string(), LedgerRecord::Item(ItemEntry { count: 2, ..ItemEntry::default() }));
        map.insert("Sonarr:_indexer:NZBgeek".to_string(), LedgerRecord::Indexer(janitor_core::IndexerEntry { failures: 1, last_ts: 0 }));
        ledger.save(&map).unwrap();
        assert!(cmd_status(&ledger).is_ok());
    }
}
