// Position report model and boundary validation
pub mod event;

// Great-circle distance
pub mod geo;

// Per-vehicle last known position
pub mod state;

// Speed enrichment engine and metrics
pub mod enrich;

// Source/Sink traits and in-memory implementations
pub mod transport;

// Key-affine worker pipeline with graceful drain
pub mod pipeline;

// NATS JetStream source and sink
pub mod nats;

// Service configuration
pub mod config;
