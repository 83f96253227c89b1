use anyhow::{bail, Result};

/// Slice of the vehicle id space owned by one replica.
///
/// Every replica runs its own durable consumer and keeps only the vehicles
/// that hash to its index, so all reports of one vehicle land in a single
/// process and its position store. The hash must agree across processes,
/// which rules out the randomly keyed std hashers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Partition {
    index: u32,
    count: u32,
}

impl Partition {
    pub fn new(index: u32, count: u32) -> Result<Self> {
        if count == 0 {
            bail!("partition count must be at least 1");
        }
        if index >= count {
            bail!("partition index {} out of range for {} partitions", index, count);
        }
        Ok(Self { index, count })
    }

    /// The whole key space (single replica)
    pub fn single() -> Self {
        Self { index: 0, count: 1 }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn owns(&self, vehicle_id: &str) -> bool {
        self.count == 1 || partition_of(vehicle_id, self.count) == self.index
    }

    /// Durable consumer name for this partition
    ///
    /// Replicas of the same partition share a name; the single-partition
    /// layout keeps the bare application id.
    pub fn consumer_name(&self, application_id: &str) -> String {
        if self.count == 1 {
            application_id.to_string()
        } else {
            format!("{}-p{}-of-{}", application_id, self.index, self.count)
        }
    }
}

/// FNV-1a over the id bytes, reduced to a partition index
pub fn partition_of(vehicle_id: &str, count: u32) -> u32 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let hash = vehicle_id
        .bytes()
        .fold(OFFSET_BASIS, |h, b| (h ^ u64::from(b)).wrapping_mul(PRIME));

    (hash % u64::from(count.max(1))) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_layout() {
        assert!(Partition::new(0, 0).is_err());
        assert!(Partition::new(3, 3).is_err());
        assert!(Partition::new(2, 3).is_ok());
    }

    #[test]
    fn test_single_partition_owns_everything() {
        let p = Partition::single();
        assert!(p.owns("bus-1"));
        assert!(p.owns(""));
        assert_eq!(p.consumer_name("rtd-stream"), "rtd-stream");
    }

    #[test]
    fn test_each_vehicle_owned_by_exactly_one_partition() {
        let partitions: Vec<Partition> = (0..3).map(|i| Partition::new(i, 3).unwrap()).collect();

        for v in 0..300 {
            let id = format!("bus-{}", v);
            let owners = partitions.iter().filter(|p| p.owns(&id)).count();
            assert_eq!(owners, 1, "{} owned by {} partitions", id, owners);
        }
    }

    #[test]
    fn test_consecutive_reports_stay_with_one_partition() {
        // Two replicas pulling the same vehicle: only one ever keeps it
        let a = Partition::new(0, 2).unwrap();
        let b = Partition::new(1, 2).unwrap();

        for _ in 0..10 {
            assert_ne!(a.owns("bus-1"), b.owns("bus-1"));
        }
    }

    #[test]
    fn test_partition_hash_is_fixed() {
        // FNV-1a test vectors: "" and "a"
        assert_eq!(partition_of("", u32::MAX), (0xcbf2_9ce4_8422_2325u64 % u64::from(u32::MAX)) as u32);
        assert_eq!(partition_of("a", u32::MAX), (0xaf63_dc4c_8601_ec8cu64 % u64::from(u32::MAX)) as u32);
    }

    #[test]
    fn test_consumer_names_are_distinct_per_partition() {
        let a = Partition::new(0, 2).unwrap().consumer_name("rtd-stream");
        let b = Partition::new(1, 2).unwrap().consumer_name("rtd-stream");
        assert_eq!(a, "rtd-stream-p0-of-2");
        assert_ne!(a, b);
    }
}
