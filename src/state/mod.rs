// Per-vehicle position state

mod entry;
mod eviction;
mod store;

pub use entry::StateEntry;
pub use eviction::{run_eviction_loop, EvictionPolicy};
pub use store::{InMemoryPositionStore, PositionStore};
