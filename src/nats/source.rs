use crate::event::PositionEvent;
use crate::pipeline::Partition;
use crate::transport::Source;
use anyhow::{anyhow, Context, Result};
use async_nats::jetstream::{self, consumer::pull};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

/// Durable JetStream pull consumer yielding raw position reports
///
/// One durable consumer exists per partition, named from the application id
/// and the partition layout, so restarts resume from the last acknowledged
/// message. JetStream hands a consumer's messages to whichever client pulls
/// next, so only one process may run per partition; scale out by adding
/// partitions, never by running copies of the same one.
pub struct NatsSource {
    messages: pull::Stream,
    partition: Partition,
    /// Message whose event was last handed out, with its stream sequence
    pending: Option<(jetstream::Message, u64)>,
    redelivery: RedeliveryGuard,
}

impl NatsSource {
    pub async fn connect(
        jetstream: &jetstream::Context,
        stream_name: &str,
        application_id: &str,
        filter_subject: &str,
        partition: Partition,
    ) -> Result<Self> {
        let consumer_name = partition.consumer_name(application_id);

        info!(
            stream = %stream_name,
            consumer = %consumer_name,
            filter_subject = %filter_subject,
            partition = partition.index(),
            partitions = partition.count(),
            "Starting position consumer"
        );

        let stream = jetstream
            .get_stream(stream_name)
            .await
            .with_context(|| format!("Failed to get {} stream", stream_name))?;

        let consumer = stream
            .get_or_create_consumer(
                &consumer_name,
                pull::Config {
                    durable_name: Some(consumer_name.clone()),
                    filter_subject: filter_subject.to_string(),
                    ..Default::default()
                },
            )
            .await
            .context("Failed to get or create consumer")?;

        let messages = consumer
            .messages()
            .await
            .context("Failed to open consumer message stream")?;

        Ok(Self {
            messages,
            partition,
            pending: None,
            redelivery: RedeliveryGuard::default(),
        })
    }

    /// Decode and check one payload; `None` means skip it
    pub(crate) fn decode(payload: &[u8]) -> Option<PositionEvent> {
        let event = match serde_json::from_slice::<PositionEvent>(payload) {
            Ok(event) => event,
            Err(e) => {
                error!(error = %e, "Failed to deserialize position report, skipping");
                return None;
            }
        };

        if let Err(e) = event.validate() {
            warn!(
                vehicle_id = %event.vehicle_id,
                error = %e,
                "Invalid position report, skipping"
            );
            return None;
        }

        Some(event)
    }

    async fn discard(msg: jetstream::Message) {
        if let Err(e) = msg.ack().await {
            error!(error = %e, "Failed to acknowledge skipped message");
        }
    }
}

#[async_trait]
impl Source for NatsSource {
    /// Only the skip path awaits after a message arrives; a valid report is
    /// returned without further awaits and acknowledged in `commit`.
    async fn next(&mut self) -> Result<Option<PositionEvent>> {
        loop {
            let msg = match self.messages.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    error!(error = %e, "Error receiving message");
                    continue;
                }
                None => return Ok(None),
            };

            let info = msg
                .info()
                .map(|info| (info.stream_sequence, info.delivered))
                .map_err(|e| e.to_string());

            let (sequence, delivered) = match info {
                Ok(info) => info,
                Err(e) => {
                    error!(error = %e, "Failed to get message info");
                    Self::discard(msg).await;
                    continue;
                }
            };

            if self.redelivery.is_duplicate(sequence, delivered) {
                debug!(
                    sequence = sequence,
                    delivered = delivered,
                    "Dropping redelivery of an already enriched report"
                );
                Self::discard(msg).await;
                continue;
            }

            // Malformed messages are acknowledged too, to prevent redelivery
            let Some(event) = Self::decode(&msg.payload) else {
                Self::discard(msg).await;
                continue;
            };

            if !self.partition.owns(&event.vehicle_id) {
                Self::discard(msg).await;
                continue;
            }

            self.pending = Some((msg, sequence));
            return Ok(Some(event));
        }
    }

    async fn commit(&mut self) -> Result<()> {
        let Some((msg, sequence)) = self.pending.take() else {
            return Ok(());
        };

        // double_ack waits for the server to confirm the ack
        if let Err(e) = msg.double_ack().await {
            self.redelivery.record_unconfirmed(sequence);
            return Err(anyhow!(
                "Failed to acknowledge message at sequence {}: {}",
                sequence,
                e
            ));
        }

        Ok(())
    }
}

/// Remembers reports that were enriched but whose ack was not confirmed.
///
/// JetStream redelivers such a message after the ack wait. By then the
/// vehicle's state has moved on, and enriching the copy would yield a
/// negative speed and roll the state back.
#[derive(Debug, Default)]
pub(crate) struct RedeliveryGuard {
    unconfirmed: HashSet<u64>,
}

impl RedeliveryGuard {
    pub(crate) fn record_unconfirmed(&mut self, sequence: u64) {
        self.unconfirmed.insert(sequence);
    }

    /// True for a redelivered copy of an already enriched report.
    pub(crate) fn is_duplicate(&mut self, sequence: u64, delivered: i64) -> bool {
        delivered > 1 && self.unconfirmed.remove(&sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::EnrichmentEngine;
    use crate::state::{InMemoryPositionStore, PositionStore};
    use std::sync::Arc;

    #[test]
    fn test_decode_valid_report() {
        let payload = br#"{"id":"6231","location":{"lat":39.74,"lon":-104.99},"timestamp":1588000000}"#;
        let event = NatsSource::decode(payload).unwrap();
        assert_eq!(event.vehicle_id, "6231");
        assert_eq!(event.timestamp, 1_588_000_000);
    }

    #[test]
    fn test_decode_skips_malformed_json() {
        assert!(NatsSource::decode(b"{not json").is_none());
        assert!(NatsSource::decode(br#"{"id":"6231"}"#).is_none());
    }

    #[test]
    fn test_decode_skips_invalid_report() {
        let payload = br#"{"id":"","location":{"lat":39.74,"lon":-104.99},"timestamp":1}"#;
        assert!(NatsSource::decode(payload).is_none());

        let payload = br#"{"id":"6231","location":{"lat":139.74,"lon":-104.99},"timestamp":1}"#;
        assert!(NatsSource::decode(payload).is_none());
    }

    #[test]
    fn test_first_delivery_is_never_a_duplicate() {
        let mut guard = RedeliveryGuard::default();
        guard.record_unconfirmed(7);

        assert!(!guard.is_duplicate(7, 1));
        assert!(!guard.is_duplicate(8, 2));
    }

    #[test]
    fn test_redelivery_after_unconfirmed_ack_is_dropped_once() {
        let mut guard = RedeliveryGuard::default();
        guard.record_unconfirmed(42);

        assert!(guard.is_duplicate(42, 2));
        // Forgotten after the copy has been dropped
        assert!(!guard.is_duplicate(42, 3));
    }

    #[test]
    fn test_redelivery_of_never_enriched_report_is_kept() {
        // Pulled but not committed (e.g. the process stopped): enrich it
        let mut guard = RedeliveryGuard::default();
        assert!(!guard.is_duplicate(42, 2));
    }

    #[test]
    fn test_dropping_redelivery_keeps_state_moving_forward() {
        let engine = EnrichmentEngine::new(Arc::new(InMemoryPositionStore::new()));
        let mut guard = RedeliveryGuard::default();
        let payload = |ts: i64| {
            format!(
                r#"{{"id":"bus-1","location":{{"lat":39.7392,"lon":-104.9903}},"timestamp":{}}}"#,
                ts
            )
        };

        // seq 1 enriched, its ack not confirmed; seq 2 enriched normally
        engine.enrich(NatsSource::decode(payload(1000).as_bytes()).unwrap());
        guard.record_unconfirmed(1);
        engine.enrich(NatsSource::decode(payload(1010).as_bytes()).unwrap());

        // seq 1 comes back
        assert!(guard.is_duplicate(1, 2));
        assert_eq!(engine.metrics.get_out_of_order(), 0);
        assert_eq!(engine.store().get("bus-1").unwrap().timestamp, 1010);
    }
}
