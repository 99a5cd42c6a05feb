//! Per-cycle counters, aggregated per manager and totaled across the run.

use std::collections::HashMap;

/// Counters accumulated while processing one manager's queue for one cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManagerMetrics {
    /// Items evaluated this cycle, after within-cycle dedup.
    pub processed: u64,
    /// Items removed (and blacklisted).
    pub removed: u64,
    /// Items removed specifically via the per-indexer failure policy.
    pub removed_indexer_failure: u64,
    /// Items left in the `queued`/waiting state.
    pub queued: u64,
    /// Items whose strike count grew this cycle.
    pub strike_increased: u64,
    /// Items whose strike count shrank this cycle (progress reset).
    pub strike_decreased: u64,
    /// Items for which a reannounce was scheduled.
    pub reannounce_scheduled: u64,
    /// Reannounces actually attempted against a torrent client.
    pub reannounce_attempted: u64,
    /// Reannounces the client accepted.
    pub reannounce_successful: u64,
    /// Items currently carrying at least one strike at cycle end.
    pub items_with_strikes: u64,
}

impl ManagerMetrics {
    fn add(&mut self, other: Self) {
        self.processed += other.processed;
        self.removed += other.removed;
        self.removed_indexer_failure += other.removed_indexer_failure;
        self.queued += other.queued;
        self.strike_increased += other.strike_increased;
        self.strike_decreased += other.strike_decreased;
        self.reannounce_scheduled += other.reannounce_scheduled;
        self.reannounce_attempted += other.reannounce_attempted;
        self.reannounce_successful += other.reannounce_successful;
        self.items_with_strikes += other.items_with_strikes;
    }
}

/// Full run summary: totals plus the per-manager breakdown they were built from.
#[derive(Debug, Clone, Default)]
pub struct CycleSummary {
    /// Sum of every manager's counters.
    pub total: ManagerMetrics,
    /// Counters keyed by manager name.
    pub per_manager: HashMap<String, ManagerMetrics>,
}

impl CycleSummary {
    /// Fold in one manager's counters.
    pub fn record(&mut self, manager: &str, metrics: ManagerMetrics) {
        self.total.add(metrics);
        self.per_manager.insert(manager.to_string(), metrics);
    }

    /// Emit one structured `tracing::info!` line per manager plus a totals line.
    pub fn log(&self) {
        for (manager, metrics) in &self.per_manager {
            tracing::info!(
                manager,
                processed = metrics.processed,
                removed = metrics.removed,
                removed_indexer_failure = metrics.removed_indexer_failure,
                queued = metrics.queued,
                strike_increased = metrics.strike_increased,
                strike_decreased = metrics.strike_decreased,
                reannounce_scheduled = metrics.reannounce_scheduled,
                reannounce_attempted = metrics.reannounce_attempted,
                reannounce_successful = metrics.reannounce_successful,
                items_with_strikes = metrics.items_with_strikes,
                "manager cycle summary"
            );
        }
        tracing::info!(
            processed = self.total.processed,
            removed = self.total.removed,
            queued = self.total.queued,
            reannounce_attempted = self.total.reannounce_attempted,
            reannounce_successful = self.total.reannounce_successful,
            items_with_strikes = self.total.items_with_strikes,
            "cycle summary"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_accumulates_totals_across_managers() {
        let mut summary = CycleSummary::default();
        summary.record("Sonarr", ManagerMetrics { processed: 3, removed: 1, ..ManagerMetrics::default() });
        summary.record("Radarr", ManagerMetrics { processed: 2, removed: 0, ..ManagerMetrics::default() });
        assert_eq!(summary.total.processed, 5);
        assert_eq!(summary.total.removed, 1);
        assert_eq!(summary.per_manager.len(), 2);
    }
}
