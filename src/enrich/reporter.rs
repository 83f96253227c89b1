use crate::enrich::metrics::MetricsTracker;
use crate::state::PositionStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

/// Periodically log a metrics snapshot
///
/// Runs in the background until the task is cancelled. Reads are lock-free
/// apart from the short rate-window read lock.
pub async fn run_metrics_reporter<S: PositionStore + ?Sized>(
    metrics: MetricsTracker,
    store: Arc<S>,
    interval_seconds: u64,
) {
    let mut ticker = interval(Duration::from_secs(interval_seconds.max(1)));

    // Skip missed ticks to prevent backlog under load
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let snapshot = metrics.get_snapshot();
        info!(
            tracked_vehicles = store.len(),
            total_events = snapshot.total_events,
            event_rate = snapshot.event_rate,
            enriched = snapshot.enriched,
            first_observations = snapshot.first_observations,
            zero_elapsed = snapshot.zero_elapsed,
            out_of_order = snapshot.out_of_order,
            sink_failures = snapshot.sink_failures,
            "Enrichment metrics"
        );
    }
}
