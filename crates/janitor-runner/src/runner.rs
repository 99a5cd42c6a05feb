//! The top-level scheduler: fans out over configured managers each cycle,
//! then sleeps until the next one or a shutdown signal arrives.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;

use janitor_clients::ClientRegistry;
use janitor_config::Settings;
use janitor_core::LedgerRecord;
use janitor_events::EventBus;
use janitor_http::{HttpClient, RequestPolicy};
use janitor_ledger::Ledger;

use crate::manager::manage_service;
use crate::metrics::CycleSummary;

/// Owns every shared dependency one runner cycle needs and fans out the
/// per-manager walk, collecting metrics and logging a summary each cycle.
pub struct Runner {
    settings: Settings,
    http: HttpClient,
    ledger: Ledger,
    ledger_state: StdMutex<HashMap<String, LedgerRecord>>,
    events: EventBus,
    clients: ClientRegistry,
}

impl Runner {
    /// Build a runner, loading the ledger's current contents from disk.
    #[must_use]
    pub fn new(settings: Settings, http: HttpClient, ledger: Ledger, events: EventBus, clients: ClientRegistry) -> Self {
        let ledger_state = StdMutex::new(ledger.load());
        Self { settings, http, ledger, ledger_state, events, clients }
    }

    fn request_policy(&self) -> RequestPolicy {
        RequestPolicy {
            timeout: Duration::from_secs(self.settings.general.request_timeout_secs),
            retry_attempts: self.settings.general.retry_attempts,
            retry_backoff: Duration::from_millis(self.settings.general.retry_backoff_ms),
            min_interval: Duration::ZERO,
            max_concurrent: 0,
        }
    }

    /// Run one full cycle: fan out over every configured manager in
    /// parallel, collect each one's metrics, and return the aggregate.
    pub async fn run_cycle(self: &Arc<Self>) -> CycleSummary {
        let mut tasks = JoinSet::new();
        for manager in self.settings.services.keys().cloned().collect::<Vec<_>>() {
            let runner = Arc::clone(self);
            tasks.spawn(async move {
                let config = runner.settings.services.get(&manager).cloned().unwrap_or_default();
                let metrics = manage_service(
                    &manager,
                    &config,
                    &runner.settings,
                    &runner.http,
                    runner.request_policy(),
                    &runner.clients,
                    &runner.events,
                    &runner.ledger_state,
                    &runner.ledger,
                    runner.settings.general.dry_run,
                )
                .await;
                (manager, metrics)
            });
        }

        let mut summary = CycleSummary::default();
        while let Some(result) = tasks.join_next().await {
            match result {
                Ok((manager, metrics)) => summary.record(&manager, metrics),
                Err(err) => tracing::error!(error = %err, "manager task panicked"),
            }
        }
        summary
    }

    /// Run cycles forever, sleeping `general.api_timeout_secs` between them,
    /// until `shutdown` reports `true`. Cancellation is checked at the sleep
    /// point, between cycles.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        loop {
            let summary = self.run_cycle().await;
            summary.log();
            self.events.flush(self.settings.general.dry_run).await;

            if *shutdown.borrow() {
                return;
            }
            let sleep = tokio::time::sleep(Duration::from_secs(self.settings.general.api_timeout_secs));
            tokio::select! {
                () = sleep => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return;
                    }
                }
            }
        }
    }
}
