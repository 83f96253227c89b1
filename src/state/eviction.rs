use crate::state::store::PositionStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// When a stored position stops being usable as the "previous" observation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Keep one entry per vehicle ever seen for the life of the process
    Never,

    /// Drop entries not written for longer than the given duration
    IdleFor(Duration),
}

impl EvictionPolicy {
    /// Build from the `[state] ttl_seconds` setting (absent or 0 = never)
    pub fn from_ttl_seconds(ttl_seconds: Option<u64>) -> Self {
        match ttl_seconds {
            Some(secs) if secs > 0 => EvictionPolicy::IdleFor(Duration::from_secs(secs)),
            _ => EvictionPolicy::Never,
        }
    }

    pub fn is_expired(&self, written_at: Instant, now: Instant) -> bool {
        match self {
            EvictionPolicy::Never => false,
            EvictionPolicy::IdleFor(ttl) => now.saturating_duration_since(written_at) > *ttl,
        }
    }
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        EvictionPolicy::Never
    }
}

/// Periodically sweep expired entries out of the store
///
/// Runs until the task is cancelled. Callers skip spawning it when the
/// policy is `Never`.
pub async fn run_eviction_loop<S: PositionStore + ?Sized>(store: Arc<S>, sweep_interval: Duration) {
    info!(
        sweep_interval_seconds = sweep_interval.as_secs(),
        "Starting position state eviction sweep"
    );

    let mut ticker = interval(sweep_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let removed = store.evict_expired();
        if removed > 0 {
            info!(
                removed = removed,
                remaining = store.len(),
                "Evicted idle vehicle positions"
            );
        } else {
            debug!(remaining = store.len(), "Eviction sweep found nothing to remove");
        }
    }
}
