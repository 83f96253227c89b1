// Speed enrichment engine

mod metrics;
mod reporter;
pub mod speed;

pub use metrics::{MetricsSnapshot, MetricsTracker};
pub use reporter::run_metrics_reporter;
pub use speed::speed_mph;

use crate::event::PositionEvent;
use crate::geo::haversine_km;
use crate::state::{PositionStore, StateEntry};
use std::sync::Arc;
use tracing::debug;


/// Enrichment engine adds a speed estimate to each position report
///
/// The engine owns no state itself: the previous position of every vehicle
/// lives in the injected store.
pub struct EnrichmentEngine<S: PositionStore + ?Sized> {
    store: Arc<S>,

    /// Metrics tracker for monitoring
    pub metrics: MetricsTracker,
}

impl<S: PositionStore + ?Sized> EnrichmentEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_metrics(store, MetricsTracker::new())
    }

    pub fn with_metrics(store: Arc<S>, metrics: MetricsTracker) -> Self {
        Self { store, metrics }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Enrich a single event
    ///
    /// Replaces the vehicle's stored position with this event and, when a
    /// previous position existed, sets `speed_mph` from the two. Never fails:
    /// every input yields exactly one output.
    pub fn enrich(&self, mut event: PositionEvent) -> PositionEvent {
        self.metrics.record_event();

        let previous = self.store.swap(StateEntry::from(&event));

        let Some(previous) = previous else {
            self.metrics.record_first_observation();
            debug!(vehicle_id = %event.vehicle_id, "First observation, no speed");
            event.speed_mph = None;
            return event;
        };

        let distance_km = haversine_km(previous.location, event.location);
        let elapsed = event.timestamp - previous.timestamp;

        if elapsed == 0 {
            self.metrics.record_zero_elapsed();
        } else if elapsed < 0 {
            self.metrics.record_out_of_order();
            debug!(
                vehicle_id = %event.vehicle_id,
                previous_timestamp = previous.timestamp,
                timestamp = event.timestamp,
                "Position report older than stored position"
            );
        }

        event.speed_mph = Some(speed_mph(distance_km, elapsed));
        self.metrics.record_enriched();

        event
    }
}
