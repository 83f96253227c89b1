use crate::event::PositionEvent;
use crate::transport::Sink;
use anyhow::{Context, Result};
use async_nats::jetstream;
use async_trait::async_trait;
use tracing::debug;

/// Publishes enriched events to JetStream
#[derive(Clone)]
pub struct NatsSink {
    client: async_nats::Client,
    jetstream: jetstream::Context,
    subject_prefix: String,
}

impl NatsSink {
    pub fn new(
        client: async_nats::Client,
        jetstream: jetstream::Context,
        subject_prefix: impl Into<String>,
    ) -> Self {
        Self {
            client,
            jetstream,
            subject_prefix: subject_prefix.into(),
        }
    }
}

/// Subject for one vehicle: `{prefix}.{key}`
///
/// The key is the vehicle id with the characters NATS reserves in subjects
/// (`.`, `*`, `>`, whitespace) and `%` itself percent-encoded per UTF-8
/// byte. The encoding is reversible, so distinct ids never share a subject.
pub fn subject_for(prefix: &str, vehicle_id: &str) -> String {
    let mut key = String::with_capacity(vehicle_id.len());

    for c in vehicle_id.chars() {
        if matches!(c, '.' | '*' | '>' | '%') || c.is_whitespace() {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                key.push_str(&format!("%{:02X}", byte));
            }
        } else {
            key.push(c);
        }
    }

    format!("{}.{}", prefix, key)
}

#[async_trait]
impl Sink for NatsSink {
    /// Publish a single event and wait for the JetStream ack
    async fn send(&self, event: &PositionEvent) -> Result<()> {
        let subject = subject_for(&self.subject_prefix, &event.vehicle_id);
        let payload =
            serde_json::to_vec(event).context("Failed to serialize enriched event to JSON")?;

        debug!(
            vehicle_id = %event.vehicle_id,
            subject = %subject,
            speed_mph = ?event.speed_mph,
            "Publishing enriched event"
        );

        self.jetstream
            .publish(subject.clone(), payload.into())
            .await
            .with_context(|| format!("Failed to publish event to subject '{}'", subject))?
            .await
            .context("Failed to await publish ack")?;

        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        self.client
            .flush()
            .await
            .context("Failed to flush NATS connection")
    }
}
