use super::{Sink, Source};
use crate::event::PositionEvent;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Source fed through a tokio channel.
///
/// Exhausted once every sender has been dropped and the buffer is drained.
pub struct ChannelSource {
    rx: mpsc::Receiver<PositionEvent>,
}

impl ChannelSource {
    pub fn new(rx: mpsc::Receiver<PositionEvent>) -> Self {
        Self { rx }
    }

    /// Create a source and the sender that feeds it
    pub fn channel(capacity: usize) -> (mpsc::Sender<PositionEvent>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }
}

#[async_trait]
impl Source for ChannelSource {
    async fn next(&mut self) -> Result<Option<PositionEvent>> {
        Ok(self.rx.recv().await)
    }
}

/// Sink that keeps every delivered event in memory, in delivery order.
#[derive(Default)]
pub struct CollectingSink {
    events: Mutex<Vec<PositionEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PositionEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivered events for one vehicle, in delivery order
    pub fn events_for(&self, vehicle_id: &str) -> Vec<PositionEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.vehicle_id == vehicle_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Sink for CollectingSink {
    async fn send(&self, event: &PositionEvent) -> Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}
