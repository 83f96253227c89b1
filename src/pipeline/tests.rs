use super::*;
use std::collections::HashSet;

#[test]
fn test_single_worker_always_shard_zero() {
    assert_eq!(shard_for("bus-1", 1), 0);
    assert_eq!(shard_for("bus-2", 0), 0);
}

#[test]
fn test_shard_is_stable_per_vehicle() {
    for workers in [2, 4, 7] {
        let first = shard_for("bus-6231", workers);
        for _ in 0..10 {
            assert_eq!(shard_for("bus-6231", workers), first);
        }
        assert!(first < workers);
    }
}

#[test]
fn test_shards_spread_across_workers() {
    let shards: HashSet<usize> = (0..200)
        .map(|i| shard_for(&format!("bus-{}", i), 4))
        .collect();

    assert_eq!(shards.len(), 4);
}
