//! Per-manager queue walk: pagination, client enrichment, decision-engine
//! dispatch, and action execution for one manager's cycle.

use std::collections::HashSet;
use std::sync::Mutex as StdMutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Value, json};

use janitor_clients::ClientRegistry;
use janitor_config::{ManagerConfig, Settings};
use janitor_core::{ItemEntry, ItemSnapshot, LedgerRecord, Reason, decide, ledger_key};
use janitor_events::{DecisionEvent, EventBus};
use janitor_http::{HttpClient, RequestPolicy};
use janitor_ledger::Ledger;
use janitor_managers::{ManagerClient, ManagerKind, RemovalPolicy, blacklist_and_search_new_release, remove_and_blacklist};

use crate::metrics::ManagerMetrics;

fn now_unix() -> i64 {
    i64::try_from(SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)).unwrap_or(i64::MAX)
}

fn item_count(ledger: &std::collections::HashMap<String, LedgerRecord>, key: &str) -> u32 {
    ledger.get(key).and_then(LedgerRecord::as_item).map_or(0, |entry| entry.count)
}

/// Walk one manager's queue for one cycle: paginate, enrich, decide, act,
/// and save the ledger after each page. Swallows its own transport failures
/// into a zeroed [`ManagerMetrics`] so one bad manager never aborts the loop.
#[allow(clippy::too_many_arguments)]
pub async fn manage_service(
    manager: &str,
    manager_config: &ManagerConfig,
    settings: &Settings,
    http: &HttpClient,
    policy: RequestPolicy,
    clients: &ClientRegistry,
    events: &EventBus,
    ledger_state: &StdMutex<std::collections::HashMap<String, LedgerRecord>>,
    ledger: &Ledger,
    dry_run: bool,
) -> ManagerMetrics {
    let mut metrics = ManagerMetrics::default();

    let (Some(api_url), Some(api_key)) = (manager_config.api_url.as_deref(), manager_config.api_key.as_deref()) else {
        tracing::debug!(manager, "manager configuration incomplete, skipping");
        return metrics;
    };
    if api_url.is_empty() || api_key.is_empty() {
        tracing::debug!(manager, "manager configuration incomplete, skipping");
        return metrics;
    }

    let client = ManagerClient::new(http, manager, api_url, api_key, policy);

    let Some(probe) = client.fetch_queue_page(1, 1).await else {
        tracing::warn!(manager, "initial queue request failed, aborting cycle for this manager");
        return metrics;
    };
    if probe.total_records == 0 {
        tracing::debug!(manager, "queue empty");
        return metrics;
    }

    let page_size = probe.total_records.min(100).max(1);
    let pages = probe.total_records.div_ceil(page_size);
    tracing::info!(manager, total = probe.total_records, pages, page_size, "fetching queue");

    let whitelist = janitor_config::whitelist(settings);
    let kind = ManagerKind::parse(manager);
    let removal_policy = RemovalPolicy {
        use_blocklist_param: manager_config.use_blocklist_param,
        remove_from_client: manager_config.remove_from_client,
        skip_import: manager_config.skip_import,
        dry_run,
    };

    let mut processed_ids = HashSet::new();
    let mut reannounce_seen = HashSet::new();

    for page in 1..=pages {
        let Some(queue_page) = client.fetch_queue_page(page, page_size).await else {
            tracing::warn!(manager, page, "failed to fetch queue page");
            continue;
        };
        for raw_item in queue_page.records {
            process_item(
                manager,
                raw_item,
                settings,
                &whitelist,
                kind,
                clients,
                events,
                ledger_state,
                &client,
                removal_policy,
                &mut processed_ids,
                &mut reannounce_seen,
                &mut metrics,
            )
            .await;
        }

        let snapshot = ledger_state.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone();
        if let Err(err) = ledger.save(&snapshot) {
            tracing::error!(manager, page, error = %err, "failed to save strike ledger");
        }
    }

    metrics.items_with_strikes = {
        let guard = ledger_state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let prefix = format!("{manager}:");
        u64::try_from(
            guard
                .iter()
                .filter(|(key, record)| key.starts_with(&prefix) && record.as_item().is_some_and(|item| item.count > 0))
                .count(),
        )
        .unwrap_or(u64::MAX)
    };

    metrics
}

#[allow(clippy::too_many_arguments)]
async fn process_item(
    manager: &str,
    raw_item: Value,
    settings: &Settings,
    whitelist: &janitor_core::Whitelist,
    kind: Option<ManagerKind>,
    clients: &ClientRegistry,
    events: &EventBus,
    ledger_state: &StdMutex<std::collections::HashMap<String, LedgerRecord>>,
    client: &ManagerClient<'_>,
    removal_policy: RemovalPolicy,
    processed_ids: &mut HashSet<i64>,
    reannounce_seen: &mut HashSet<String>,
    metrics: &mut ManagerMetrics,
) {
    let Some(id) = raw_item.get("id").and_then(Value::as_i64) else {
        return;
    };
    if !processed_ids.insert(id) {
        return;
    }

    let mut item_value = raw_item;
    let title = item_value.get("title").and_then(Value::as_str).unwrap_or_default().to_string();
    let download_id = item_value.get("downloadId").and_then(Value::as_str).map(str::to_string);

    let pre_snapshot = ItemSnapshot::new(item_value.clone());
    let is_torrent = pre_snapshot.is_torrent();
    let indexer_name = pre_snapshot.indexer_name();
    let effective = janitor_config::resolve(settings, manager, &title, indexer_name.as_deref());

    if let Some(download_id) = download_id.as_deref().filter(|_| !clients.is_empty()) {
        if is_torrent && effective.min_speed_bytes_per_sec > 0 {
            if let Some(speed) = clients.get_speed(download_id).await {
                item_value["clientDlSpeed"] = json!(speed);
            }
        }
        let info = clients.enrich(download_id).await;
        if let Some(state) = info.state {
            item_value["clientState"] = json!(state);
        }
        if let Some(peers) = info.peers {
            item_value["clientPeers"] = json!(peers);
        }
        if let Some(seeds) = info.seeds {
            item_value["clientSeeds"] = json!(seeds);
        }
        if let Some(text) = info.trackers_text {
            item_value["clientTrackersMsg"] = json!(text);
        }
    }

    let snapshot = ItemSnapshot::new(item_value);
    let indexer_override =
        indexer_name.as_deref().and_then(|name| settings.indexer_policies.get(name)).and_then(|policy| policy.seeder_stall_threshold);

    let now = now_unix();
    let key = ledger_key(manager, id);

    let before = {
        let guard = ledger_state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        item_count(&guard, &key)
    };
    let decision = {
        let mut guard = ledger_state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        decide(manager, &snapshot, &mut guard, whitelist, &effective, indexer_override, now)
    };
    let after = {
        let guard = ledger_state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        item_count(&guard, &key)
    };

    metrics.processed += 1;
    if decision.reason == Some(Reason::Queued) {
        metrics.queued += 1;
    }
    if after > before {
        metrics.strike_increased += 1;
    } else if after < before {
        metrics.strike_decreased += 1;
    }

    if decision.reannounce_requested {
        metrics.reannounce_scheduled += 1;
        if let Some(download_id) = download_id.filter(|id| reannounce_seen.insert(id.clone())) {
            let do_recheck = settings.rule_engine.reannounce.as_ref().and_then(|r| r.do_recheck).unwrap_or(false);
            metrics.reannounce_attempted += 1;
            let ok = clients.reannounce(&download_id, do_recheck).await;
            if ok {
                metrics.reannounce_successful += 1;
                let mut guard = ledger_state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                let mut entry = guard.get(&key).and_then(LedgerRecord::as_item).cloned().unwrap_or_else(|| ItemEntry::first_seen(now));
                entry.last_reannounce_ts = Some(now);
                entry.reannounce_attempts += 1;
                guard.insert(key, LedgerRecord::Item(entry));
            }
            events
                .emit(DecisionEvent {
                    event: "reannounce".to_string(),
                    service: manager.to_string(),
                    id,
                    title: title.clone(),
                    reason: Some("reannounce".to_string()),
                    notify: true,
                })
                .await;
        }
        return;
    }

    if decision.should_remove {
        let reason_str = decision.reason.map(|reason| reason.as_str().to_string());
        if removal_policy.dry_run {
            remove_and_blacklist(client, events, manager, id, &title, reason_str.as_deref(), removal_policy).await;
        } else if decision.trigger_search {
            if let Some(kind) = kind {
                blacklist_and_search_new_release(client, events, manager, kind, snapshot.raw(), id, &title, removal_policy).await;
            } else {
                remove_and_blacklist(client, events, manager, id, &title, reason_str.as_deref(), removal_policy).await;
            }
        } else {
            remove_and_blacklist(client, events, manager, id, &title, reason_str.as_deref(), removal_policy).await;
        }
        metrics.removed += 1;
        if decision.reason == Some(Reason::IndexerFailurePolicy) {
            metrics.removed_indexer_failure += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_count_defaults_to_zero_for_missing_key() {
        let ledger = std::collections::HashMap::new();
        assert_eq!(item_count(&ledger, "Sonarr:1"), 0);
    }
}
