use crate::state::entry::StateEntry;
use crate::state::eviction::EvictionPolicy;
use dashmap::DashMap;
use std::time::Instant;
use tracing::debug;

/// Keyed store holding the latest StateEntry per vehicle.
///
/// Implementations must make `swap` atomic per key: two concurrent swaps for
/// the same vehicle each observe the other's entry or none, never the same
/// stale one. Operations on different keys need no coordination.
pub trait PositionStore: Send + Sync {
    /// Last known entry, `None` if the vehicle was never seen (or expired).
    fn get(&self, vehicle_id: &str) -> Option<StateEntry>;

    /// Unconditional upsert.
    fn put(&self, entry: StateEntry);

    /// Store `entry` and return the previous entry for the same vehicle.
    fn swap(&self, entry: StateEntry) -> Option<StateEntry>;

    fn remove(&self, vehicle_id: &str) -> Option<StateEntry>;

    /// Number of tracked vehicles (expired but unswept entries included).
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove entries the eviction policy considers expired.
    ///
    /// Returns the number of entries removed.
    fn evict_expired(&self) -> usize;
}

struct Slot {
    entry: StateEntry,
    written_at: Instant,
}

/// In-memory store backed by a sharded concurrent map.
///
/// Each key lives in exactly one shard and every operation holds that
/// shard's lock for its whole read-modify-write.
pub struct InMemoryPositionStore {
    slots: DashMap<String, Slot>,
    policy: EvictionPolicy,
}

impl InMemoryPositionStore {
    /// Create an unbounded store (entries are never evicted)
    pub fn new() -> Self {
        Self::with_policy(EvictionPolicy::Never)
    }

    pub fn with_policy(policy: EvictionPolicy) -> Self {
        Self {
            slots: DashMap::new(),
            policy,
        }
    }

    pub(crate) fn get_at(&self, vehicle_id: &str, now: Instant) -> Option<StateEntry> {
        self.slots
            .get(vehicle_id)
            .filter(|slot| !self.policy.is_expired(slot.written_at, now))
            .map(|slot| slot.entry.clone())
    }

    pub(crate) fn swap_at(&self, entry: StateEntry, now: Instant) -> Option<StateEntry> {
        let slot = Slot {
            entry,
            written_at: now,
        };

        // insert() holds the shard write lock while replacing the old value
        let previous = self.slots.insert(slot.entry.vehicle_id.clone(), slot)?;

        if self.policy.is_expired(previous.written_at, now) {
            debug!(
                vehicle_id = %previous.entry.vehicle_id,
                "Previous position expired, treating as first observation"
            );
            return None;
        }

        Some(previous.entry)
    }

    pub(crate) fn evict_expired_at(&self, now: Instant) -> usize {
        if self.policy == EvictionPolicy::Never {
            return 0;
        }

        let before = self.slots.len();
        self.slots
            .retain(|_, slot| !self.policy.is_expired(slot.written_at, now));
        before.saturating_sub(self.slots.len())
    }
}

impl PositionStore for InMemoryPositionStore {
    fn get(&self, vehicle_id: &str) -> Option<StateEntry> {
        self.get_at(vehicle_id, Instant::now())
    }

    fn put(&self, entry: StateEntry) {
        self.swap_at(entry, Instant::now());
    }

    fn swap(&self, entry: StateEntry) -> Option<StateEntry> {
        self.swap_at(entry, Instant::now())
    }

    fn remove(&self, vehicle_id: &str) -> Option<StateEntry> {
        self.slots.remove(vehicle_id).map(|(_, slot)| slot.entry)
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn evict_expired(&self) -> usize {
        self.evict_expired_at(Instant::now())
    }
}

impl Default for InMemoryPositionStore {
    fn default() -> Self {
        Self::new()
    }
}
