// NATS JetStream transport

mod client;
mod sink;
mod source;

pub use client::{NatsClient, NatsConfig};
pub use sink::{subject_for, NatsSink};
pub use source::NatsSource;
