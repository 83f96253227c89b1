use crate::event::{Location, PositionEvent};
use serde::{Deserialize, Serialize};

/// Most recent observation retained for one vehicle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateEntry {
    pub vehicle_id: String,
    pub location: Location,
    /// Unix epoch seconds, copied from the event
    pub timestamp: i64,
}

impl From<&PositionEvent> for StateEntry {
    fn from(event: &PositionEvent) -> Self {
        Self {
            vehicle_id: event.vehicle_id.clone(),
            location: event.location,
            timestamp: event.timestamp,
        }
    }
}
