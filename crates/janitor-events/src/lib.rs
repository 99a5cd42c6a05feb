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

//! Decision event logging and notification fan-out.
//!
//! Every decision the runner makes is logged as one structured event; events
//! that should notify an operator are additionally routed to the configured
//! destinations (Discord/Slack/generic webhook), either immediately or
//! batched for a once-per-cycle flush.

mod notify;

pub use notify::{Destination, DestinationKind};

use std::sync::Mutex;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// One decision-event occurrence, ready to be logged and/or notified.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionEvent {
    /// Event kind tag, e.g. `"remove"`, `"dry_remove"`, `"reannounce"`.
    pub event: String,
    /// Manager name the event originated from.
    pub service: String,
    /// Queue item id.
    pub id: i64,
    /// Queue item title.
    pub title: String,
    /// Canonical decision reason, if any.
    pub reason: Option<String>,
    /// Whether this event should be routed to notification destinations.
    pub notify: bool,
}

/// Central event bus: broadcasts [`DecisionEvent`]s to in-process subscribers
/// (used by tests and the CLI's `status` view) and fans notifiable events out
/// to configured destinations.
pub struct EventBus {
    sender: broadcast::Sender<DecisionEvent>,
    destinations: Vec<Destination>,
    batches: Mutex<std::collections::HashMap<String, Vec<String>>>,
    http: reqwest::Client,
    debug_logging: bool,
    dry_run: bool,
}

impl EventBus {
    /// Construct a bus with the given notification destinations. `dry_run`
    /// is applied to every immediately-sent notification the same way
    /// [`Self::flush`] applies it to batched ones.
    #[must_use]
    pub fn new(destinations: Vec<Destination>, debug_logging: bool, dry_run: bool) -> Self {
        let (sender, _) = broadcast::channel(1024);
        Self {
            sender,
            destinations,
            batches: Mutex::new(std::collections::HashMap::new()),
            http: reqwest::Client::new(),
            debug_logging,
            dry_run,
        }
    }

    /// Subscribe to the raw event stream.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DecisionEvent> {
        self.sender.subscribe()
    }

    /// Log `event` as a structured line and, if `event.notify` is set, route
    /// it to every matching destination (immediate send, or enqueue for the
    /// destination's batch).
    pub async fn emit(&self, event: DecisionEvent) {
        info!(
            event = %event.event,
            service = %event.service,
            id = event.id,
            title = %event.title,
            reason = event.reason.as_deref().unwrap_or("none"),
            "decision"
        );
        let _ = self.sender.send(event.clone());

        if !event.notify || self.destinations.is_empty() {
            return;
        }

        for destination in &self.destinations {
            if !destination.matches_reason(event.reason.as_deref()) {
                continue;
            }
            let line = destination.format_line(&event);
            if destination.batch {
                self.enqueue(destination, line);
            } else if let Err(err) = destination.send_immediate(&self.http, &line, self.dry_run).await {
                if self.debug_logging {
                    warn!(destination = %destination.name, error = %err, "notification send failed");
                }
            }
        }
    }

    fn enqueue(&self, destination: &Destination, line: String) {
        let mut batches = self.batches.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        batches.entry(destination.key()).or_default().push(line);
    }

    /// Flush every destination's batch queue, once per cycle. `dry_run`
    /// prefixes batched content so operators can distinguish a dry-run flush
    /// from a real one.
    pub async fn flush(&self, dry_run: bool) {
        let pending: Vec<(String, Vec<String>)> = {
            let mut batches = self.batches.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            batches.drain().filter(|(_, lines)| !lines.is_empty()).collect()
        };

        for (key, lines) in pending {
            let Some(destination) = self.destinations.iter().find(|d| d.key() == key) else {
                continue;
            };
            if let Err(err) = destination.send_batch(&self.http, &lines, dry_run).await {
                if self.debug_logging {
                    warn!(destination = %destination.name, error = %err, "notification batch flush failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_broadcasts_to_subscribers() {
        let bus = EventBus::new(Vec::new(), false, false);
        let mut rx = bus.subscribe();
        bus.emit(DecisionEvent {
            event: "remove".to_string(),
            service: "Sonarr".to_string(),
            id: 1,
            title: "Example".to_string(),
            reason: Some("low_seeders".to_string()),
            notify: true,
        })
        .await;

        let received = rx.try_recv().unwrap();
        assert_eq!(received.id, 1);
        assert_eq!(received.reason.as_deref(), Some("low_seeders"));
    }

    #[tokio::test]
    async fn flush_with_no_destinations_is_a_no_op() {
        let bus = EventBus::new(Vec::new(), false, false);
        bus.flush(false).await;
    }
}
