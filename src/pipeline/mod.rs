//! Source → enrichment workers → Sink.
//!
//! Events are routed to a worker by hash of the vehicle id, so every report
//! of one vehicle is enriched by the same worker in admission order. Reports
//! of different vehicles are enriched concurrently.

use crate::enrich::EnrichmentEngine;
use crate::event::PositionEvent;
use crate::state::PositionStore;
use crate::transport::{Sink, Source};
use anyhow::{Context, Result};
use std::collections::hash_map::DefaultHasher;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

mod partition;

pub use partition::{partition_of, Partition};

#[cfg(test)]
mod tests;

/// Counts returned once a pipeline run has drained
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Events admitted from the source
    pub received: u64,
    /// Enriched events accepted by the sink
    pub delivered: u64,
    /// Enriched events the sink rejected
    pub sink_failures: u64,
    /// Errors returned by the source
    pub source_errors: u64,
    /// Admitted events the source failed to commit
    pub commit_failures: u64,
}

#[derive(Debug, Default)]
struct WorkerStats {
    delivered: u64,
    failed: u64,
}

/// Key-affine worker pool around an EnrichmentEngine
pub struct Pipeline<S: PositionStore + ?Sized> {
    engine: Arc<EnrichmentEngine<S>>,
    workers: usize,
    channel_capacity: usize,
}

impl<S: PositionStore + ?Sized + 'static> Pipeline<S> {
    pub fn new(engine: Arc<EnrichmentEngine<S>>, workers: usize, channel_capacity: usize) -> Self {
        Self {
            engine,
            workers: workers.max(1),
            channel_capacity: channel_capacity.max(1),
        }
    }

    pub fn engine(&self) -> &Arc<EnrichmentEngine<S>> {
        &self.engine
    }

    /// Run until the source is exhausted or `shutdown` resolves
    ///
    /// After either, no further event is pulled from the source. Shutdown
    /// only interrupts a pending `Source::next`; an event it returned is
    /// always handed to a worker and then committed. Events already admitted
    /// are enriched and delivered, then the sink is flushed and the run
    /// returns.
    pub async fn run<Src, K, F>(
        &self,
        mut source: Src,
        sink: Arc<K>,
        shutdown: F,
    ) -> Result<PipelineReport>
    where
        Src: Source,
        K: Sink + ?Sized + 'static,
        F: Future<Output = ()> + Send,
    {
        info!(
            workers = self.workers,
            channel_capacity = self.channel_capacity,
            "Starting enrichment pipeline"
        );

        let mut senders = Vec::with_capacity(self.workers);
        let mut handles = Vec::with_capacity(self.workers);

        for shard in 0..self.workers {
            let (tx, rx) = mpsc::channel(self.channel_capacity);
            senders.push(tx);
            handles.push(tokio::spawn(run_worker(
                shard,
                Arc::clone(&self.engine),
                Arc::clone(&sink),
                rx,
            )));
        }

        let mut report = PipelineReport::default();
        tokio::pin!(shutdown);

        loop {
            let next = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested, no new events will be admitted");
                    break;
                }
                next = source.next() => next,
            };

            match next {
                Ok(Some(event)) => {
                    let shard = shard_for(&event.vehicle_id, self.workers);
                    report.received += 1;

                    if senders[shard].send(event).await.is_err() {
                        error!(shard = shard, "Enrichment worker stopped, halting dispatch");
                        break;
                    }

                    if let Err(e) = source.commit().await {
                        report.commit_failures += 1;
                        warn!(error = %e, "Failed to commit admitted event");
                    }
                }
                Ok(None) => {
                    info!("Source exhausted");
                    break;
                }
                Err(e) => {
                    report.source_errors += 1;
                    error!(error = %e, "Error receiving from source");
                }
            }
        }

        // Closing the channels lets each worker drain and exit
        drop(senders);

        for (shard, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(stats) => {
                    report.delivered += stats.delivered;
                    report.sink_failures += stats.failed;
                }
                Err(e) => {
                    error!(shard = shard, error = %e, "Enrichment worker panicked");
                }
            }
        }

        sink.flush().await.context("Failed to flush sink")?;

        info!(
            received = report.received,
            delivered = report.delivered,
            sink_failures = report.sink_failures,
            source_errors = report.source_errors,
            commit_failures = report.commit_failures,
            "Enrichment pipeline drained"
        );

        Ok(report)
    }
}

/// Worker index for a vehicle id
///
/// Stable for the life of the process; all reports of one vehicle map to
/// the same worker.
pub fn shard_for(vehicle_id: &str, workers: usize) -> usize {
    if workers <= 1 {
        return 0;
    }

    let mut hasher = DefaultHasher::new();
    vehicle_id.hash(&mut hasher);
    (hasher.finish() % workers as u64) as usize
}

async fn run_worker<S, K>(
    shard: usize,
    engine: Arc<EnrichmentEngine<S>>,
    sink: Arc<K>,
    mut rx: mpsc::Receiver<PositionEvent>,
) -> WorkerStats
where
    S: PositionStore + ?Sized,
    K: Sink + ?Sized,
{
    let mut stats = WorkerStats::default();

    while let Some(event) = rx.recv().await {
        let enriched = engine.enrich(event);

        match sink.send(&enriched).await {
            Ok(()) => stats.delivered += 1,
            Err(e) => {
                stats.failed += 1;
                engine.metrics.record_sink_failure();
                error!(
                    shard = shard,
                    vehicle_id = %enriched.vehicle_id,
                    error = %e,
                    "Failed to deliver enriched event"
                );
            }
        }
    }

    if stats.failed > 0 {
        warn!(shard = shard, failed = stats.failed, "Worker drained with delivery failures");
    }
    debug!(shard = shard, delivered = stats.delivered, "Worker drained");

    stats
}
