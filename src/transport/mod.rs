// Source and Sink collaborators around the enrichment engine

mod memory;

pub use memory::{ChannelSource, CollectingSink};

use crate::event::PositionEvent;
use anyhow::Result;
use async_trait::async_trait;

/// Yields decoded position events, FIFO per vehicle.
#[async_trait]
pub trait Source: Send {
    /// Next event, `Ok(None)` once the source is exhausted.
    ///
    /// Must be cancel-safe: the pipeline drops a pending call on shutdown,
    /// so nothing may be acknowledged upstream before it returns.
    async fn next(&mut self) -> Result<Option<PositionEvent>>;

    /// Acknowledge the event last returned by `next`.
    ///
    /// Called once that event has been handed to an enrichment worker.
    async fn commit(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Accepts enriched position events.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Deliver one event; returns once the downstream has accepted it.
    async fn send(&self, event: &PositionEvent) -> Result<()>;

    /// Flush anything buffered (called once on shutdown).
    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}
