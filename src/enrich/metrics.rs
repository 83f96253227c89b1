use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Seconds covered by the event rate
const RATE_WINDOW_SECS: u64 = 5;

const COUNT_MASK: u64 = 0xFFFF_FFFF;

/// Lock-free per-second event counts over the rate window.
///
/// One slot per second of the window, reused round-robin. A slot packs the
/// epoch second it counts (high 32 bits) with the count (low 32 bits), so a
/// stale slot is recognised on both write and read.
struct RateWindow {
    slots: [AtomicU64; RATE_WINDOW_SECS as usize],
}

impl RateWindow {
    fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    fn record(&self, now_secs: u64) {
        let second = now_secs & COUNT_MASK;
        let slot = &self.slots[(now_secs % RATE_WINDOW_SECS) as usize];

        let mut current = slot.load(Ordering::Relaxed);
        loop {
            let count = if current >> 32 == second {
                ((current & COUNT_MASK) + 1).min(COUNT_MASK)
            } else {
                1
            };
            let next = (second << 32) | count;

            match slot.compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    /// Events recorded in the window ending at `now_secs`
    fn count(&self, now_secs: u64) -> u64 {
        let now = now_secs & COUNT_MASK;

        self.slots
            .iter()
            .map(|slot| slot.load(Ordering::Relaxed))
            .filter(|packed| {
                let second = packed >> 32;
                second <= now && now - second < RATE_WINDOW_SECS
            })
            .map(|packed| packed & COUNT_MASK)
            .sum()
    }
}

fn now_secs() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

/// Tracks enrichment counters for monitoring
#[derive(Clone)]
pub struct MetricsTracker {
    /// Total events enriched (lifetime counter)
    total_events: Arc<AtomicU64>,

    /// Events that had a previous position and got a speed
    enriched: Arc<AtomicU64>,

    /// Events that were the first observation of their vehicle
    first_observations: Arc<AtomicU64>,

    /// Consecutive reports with identical timestamps
    zero_elapsed: Arc<AtomicU64>,

    /// Reports older than the stored position
    out_of_order: Arc<AtomicU64>,

    /// Enriched events the sink failed to accept
    sink_failures: Arc<AtomicU64>,

    /// Per-second counts for rate calculation (5-second window)
    rate_window: Arc<RateWindow>,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self {
            total_events: Arc::new(AtomicU64::new(0)),
            enriched: Arc::new(AtomicU64::new(0)),
            first_observations: Arc::new(AtomicU64::new(0)),
            zero_elapsed: Arc::new(AtomicU64::new(0)),
            out_of_order: Arc::new(AtomicU64::new(0)),
            sink_failures: Arc::new(AtomicU64::new(0)),
            rate_window: Arc::new(RateWindow::new()),
        }
    }

    /// Record an event (call once per enriched event)
    pub fn record_event(&self) {
        self.record_event_at(now_secs());
    }

    pub(crate) fn record_event_at(&self, now_secs: u64) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        self.rate_window.record(now_secs);
    }

    pub fn record_first_observation(&self) {
        self.first_observations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_enriched(&self) {
        self.enriched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_zero_elapsed(&self) {
        self.zero_elapsed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_out_of_order(&self) {
        self.out_of_order.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sink_failure(&self) {
        self.sink_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current event rate (events per second over last 5 seconds)
    pub fn get_event_rate(&self) -> f64 {
        self.get_event_rate_at(now_secs())
    }

    pub(crate) fn get_event_rate_at(&self, now_secs: u64) -> f64 {
        self.rate_window.count(now_secs) as f64 / RATE_WINDOW_SECS as f64
    }

    pub fn get_total_events(&self) -> u64 {
        self.total_events.load(Ordering::Relaxed)
    }

    pub fn get_enriched(&self) -> u64 {
        self.enriched.load(Ordering::Relaxed)
    }

    pub fn get_first_observations(&self) -> u64 {
        self.first_observations.load(Ordering::Relaxed)
    }

    pub fn get_zero_elapsed(&self) -> u64 {
        self.zero_elapsed.load(Ordering::Relaxed)
    }

    pub fn get_out_of_order(&self) -> u64 {
        self.out_of_order.load(Ordering::Relaxed)
    }

    pub fn get_sink_failures(&self) -> u64 {
        self.sink_failures.load(Ordering::Relaxed)
    }

    /// Get snapshot of all metrics
    pub fn get_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            taken_at: Utc::now(),
            total_events: self.get_total_events(),
            event_rate: self.get_event_rate(),
            enriched: self.get_enriched(),
            first_observations: self.get_first_observations(),
            zero_elapsed: self.get_zero_elapsed(),
            out_of_order: self.get_out_of_order(),
            sink_failures: self.get_sink_failures(),
        }
    }
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub taken_at: DateTime<Utc>,
    pub total_events: u64,
    pub event_rate: f64,
    pub enriched: u64,
    pub first_observations: u64,
    pub zero_elapsed: u64,
    pub out_of_order: u64,
    pub sink_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_event_recording() {
        let tracker = MetricsTracker::new();
        assert_eq!(tracker.get_total_events(), 0);

        tracker.record_event();
        tracker.record_event();
        assert_eq!(tracker.get_total_events(), 2);
    }

    #[test]
    fn test_event_rate_calculation() {
        let tracker = MetricsTracker::new();

        for _ in 0..10 {
            tracker.record_event();
        }

        // 10 events / 5s window
        assert_eq!(tracker.get_event_rate(), 2.0);
    }

    #[test]
    fn test_rate_drops_to_zero_after_idle_window() {
        let tracker = MetricsTracker::new();
        let start = 1_700_000_000;

        for _ in 0..10 {
            tracker.record_event_at(start);
        }

        assert_eq!(tracker.get_event_rate_at(start), 2.0);
        // Still inside the window 4s later
        assert_eq!(tracker.get_event_rate_at(start + 4), 2.0);
        // Nothing recorded for a full window
        assert_eq!(tracker.get_event_rate_at(start + 6), 0.0);
        assert_eq!(tracker.get_total_events(), 10);
    }

    #[test]
    fn test_rate_window_slides() {
        let tracker = MetricsTracker::new();
        let start = 1_700_000_000;

        // One event per second for 10 seconds
        for i in 0..10 {
            tracker.record_event_at(start + i);
        }

        // Only the last 5 seconds count
        assert_eq!(tracker.get_event_rate_at(start + 9), 1.0);

        // A reused slot starts counting from scratch
        tracker.record_event_at(start + 10);
        tracker.record_event_at(start + 10);
        assert_eq!(tracker.get_event_rate_at(start + 10), 6.0 / 5.0);
    }

    #[test]
    fn test_outcome_counters() {
        let tracker = MetricsTracker::new();

        tracker.record_first_observation();
        tracker.record_enriched();
        tracker.record_enriched();
        tracker.record_zero_elapsed();
        tracker.record_out_of_order();
        tracker.record_sink_failure();

        let snapshot = tracker.get_snapshot();
        assert_eq!(snapshot.first_observations, 1);
        assert_eq!(snapshot.enriched, 2);
        assert_eq!(snapshot.zero_elapsed, 1);
        assert_eq!(snapshot.out_of_order, 1);
        assert_eq!(snapshot.sink_failures, 1);
    }

    #[test]
    fn test_clones_share_counters() {
        let tracker = MetricsTracker::new();
        let clone = tracker.clone();

        clone.record_event();
        assert_eq!(tracker.get_total_events(), 1);
    }

    #[test]
    fn test_concurrent_access() {
        let tracker = Arc::new(MetricsTracker::new());
        let mut handles = vec![];

        // Spawn 10 threads, each recording 100 events
        for _ in 0..10 {
            let tracker_clone = Arc::clone(&tracker);
            let handle = thread::spawn(move || {
                for _ in 0..100 {
                    tracker_clone.record_event();
                }
            });
            handles.push(handle);
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(tracker.get_total_events(), 1000);
        assert!(tracker.get_event_rate() > 0.0);
    }

    #[test]
    fn test_concurrent_rate_recording_loses_no_events() {
        let tracker = Arc::new(MetricsTracker::new());
        let second = 1_700_000_000;
        let mut handles = vec![];

        for _ in 0..8 {
            let tracker_clone = Arc::clone(&tracker);
            handles.push(thread::spawn(move || {
                for _ in 0..500 {
                    tracker_clone.record_event_at(second);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(tracker.rate_window.count(second), 4000);
    }
}
