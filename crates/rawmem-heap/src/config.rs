//! Heap configuration parameters.

/// Configuration for a [`Heap`](crate::Heap).
///
/// Validated once by [`Heap::new`](crate::Heap::new); the arena never grows
/// or shrinks afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeapConfig {
    /// Arena size in bytes.
    ///
    /// Default: 65_536. Must be at least [`HeapConfig::MIN_CAPACITY`] so the
    /// control header leaves room for user allocations.
    pub capacity: u32,
}

impl HeapConfig {
    /// Default arena size: 64KB.
    pub const DEFAULT_CAPACITY: u32 = 64 * 1024;

    /// Smallest accepted arena size.
    pub const MIN_CAPACITY: u32 = 8;

    /// Create a config for an arena of `capacity` bytes.
    pub fn new(capacity: u32) -> Self {
        Self { capacity }
    }

    /// Bytes needed for the occupancy bitmap (one bit per arena byte).
    pub fn bitmap_bytes(&self) -> usize {
        (self.capacity as usize).div_ceil(8)
    }
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_capacity_is_64kb() {
        let config = HeapConfig::default();
        assert_eq!(config.capacity, 65_536);
        assert_eq!(config.bitmap_bytes(), 8_192);
    }

    #[test]
    fn bitmap_rounds_up() {
        assert_eq!(HeapConfig::new(9).bitmap_bytes(), 2);
    }
}
