//! Heap usage counters.
//!
//! [`HeapStats`] is a point-in-time snapshot taken by
//! [`Heap::stats`](crate::Heap::stats). Occupancy figures come from the
//! bitmap and allocation table; the cumulative counters are kept in atomics
//! on the heap and never reset.

/// Snapshot of a heap's occupancy and lifetime counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeapStats {
    /// Arena size in bytes.
    pub capacity: u32,
    /// Bytes currently marked taken, including the control header.
    pub used_bytes: u32,
    /// Number of live allocations.
    pub live_allocations: usize,
    /// Cumulative successful allocations.
    pub allocations_total: u64,
    /// Cumulative frees that released bytes.
    pub frees_total: u64,
    /// Cumulative allocation requests that found no free run.
    pub failed_allocations: u64,
    /// Cumulative frees ignored because the view was not this heap's.
    pub ignored_frees: u64,
}

impl HeapStats {
    /// Bytes not marked taken.
    pub fn free_bytes(&self) -> u32 {
        self.capacity - self.used_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero() {
        let s = HeapStats::default();
        assert_eq!(s.capacity, 0);
        assert_eq!(s.used_bytes, 0);
        assert_eq!(s.live_allocations, 0);
        assert_eq!(s.allocations_total, 0);
        assert_eq!(s.frees_total, 0);
        assert_eq!(s.failed_allocations, 0);
        assert_eq!(s.ignored_frees, 0);
    }

    #[test]
    fn free_bytes_is_complement_of_used() {
        let s = HeapStats {
            capacity: 100,
            used_bytes: 36,
            ..HeapStats::default()
        };
        assert_eq!(s.free_bytes(), 64);
    }
}
