//! Per-byte occupancy tracking for a heap arena.
//!
//! [`OccupancyBitmap`] keeps one bit per arena byte, packed into `AtomicU64`
//! words. Mutations happen only while the owning heap's lock is held; the
//! atomics exist so the bitmap can live behind a shared `Arc<Heap>` without
//! a second host-side mutex.

use std::sync::atomic::{AtomicU64, Ordering};

const BITS_PER_WORD: u32 = 64;

/// One taken/free flag per arena byte.
pub struct OccupancyBitmap {
    words: Box<[AtomicU64]>,
    len: u32,
}

impl OccupancyBitmap {
    /// Create a bitmap for `len` bytes, all free.
    pub fn new(len: u32) -> Self {
        let words = (0..len.div_ceil(BITS_PER_WORD))
            .map(|_| AtomicU64::new(0))
            .collect();
        Self { words, len }
    }

    /// Number of bytes tracked.
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Whether the bitmap tracks no bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether byte `offset` is taken. Offsets past the end read as taken.
    pub fn is_taken(&self, offset: u32) -> bool {
        if offset >= self.len {
            return true;
        }
        let (word, bit) = Self::locate(offset);
        self.words[word].load(Ordering::Relaxed) & (1u64 << bit) != 0
    }

    /// Mark `offset..offset + len` taken.
    pub fn mark(&self, offset: u32, len: u32) {
        for i in offset..self.end(offset, len) {
            let (word, bit) = Self::locate(i);
            self.words[word].fetch_or(1u64 << bit, Ordering::Relaxed);
        }
    }

    /// Mark `offset..offset + len` free.
    pub fn clear(&self, offset: u32, len: u32) {
        for i in offset..self.end(offset, len) {
            let (word, bit) = Self::locate(i);
            self.words[word].fetch_and(!(1u64 << bit), Ordering::Relaxed);
        }
    }

    /// Whether every byte of `offset..offset + len` is free.
    pub fn is_free(&self, offset: u32, len: u32) -> bool {
        offset as u64 + len as u64 <= self.len as u64
            && (offset..offset + len).all(|i| !self.is_taken(i))
    }

    /// First-fit search for `size` contiguous free bytes starting at a
    /// multiple of `align`.
    ///
    /// Scans from offset 0 and returns the start of the first qualifying
    /// run. Fully taken words are skipped 64 bytes at a time. Returns
    /// `None` when no run exists or `size` is zero.
    pub fn find_free_run(&self, size: u32, align: u32) -> Option<u32> {
        if size == 0 || size > self.len {
            return None;
        }
        let align = align.max(1);
        let mut run = 0u32;
        let mut start = 0u32;
        let mut i = 0u32;
        while i < self.len {
            if run == 0 && i % BITS_PER_WORD == 0 {
                let word = self.words[(i / BITS_PER_WORD) as usize].load(Ordering::Relaxed);
                if word == u64::MAX {
                    i += BITS_PER_WORD;
                    continue;
                }
            }
            if self.is_taken(i) {
                run = 0;
            } else if run > 0 || i % align == 0 {
                if run == 0 {
                    start = i;
                }
                run += 1;
                if run == size {
                    return Some(start);
                }
            }
            i += 1;
        }
        None
    }

    /// Number of taken bytes.
    pub fn taken_count(&self) -> u32 {
        self.words
            .iter()
            .map(|w| w.load(Ordering::Relaxed).count_ones())
            .sum()
    }

    fn end(&self, offset: u32, len: u32) -> u32 {
        assert!(
            offset as u64 + len as u64 <= self.len as u64,
            "bitmap range {offset}..{} out of range for {} bytes",
            offset as u64 + len as u64,
            self.len
        );
        offset + len
    }

    fn locate(offset: u32) -> (usize, u32) {
        ((offset / BITS_PER_WORD) as usize, offset % BITS_PER_WORD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_bitmap_is_free() {
        let bitmap = OccupancyBitmap::new(100);
        assert_eq!(bitmap.taken_count(), 0);
        assert!(bitmap.is_free(0, 100));
        assert!(bitmap.is_taken(100));
    }

    #[test]
    fn mark_and_clear_round_trip() {
        let bitmap = OccupancyBitmap::new(200);
        bitmap.mark(60, 10);
        assert_eq!(bitmap.taken_count(), 10);
        assert!(bitmap.is_taken(60) && bitmap.is_taken(69));
        assert!(!bitmap.is_taken(59) && !bitmap.is_taken(70));
        bitmap.clear(60, 10);
        assert_eq!(bitmap.taken_count(), 0);
    }

    #[test]
    fn first_fit_skips_short_gaps() {
        let bitmap = OccupancyBitmap::new(64);
        bitmap.mark(0, 4);
        bitmap.mark(6, 2);
        // Gap 4..6 is two bytes wide; a 3-byte run must start at 8.
        assert_eq!(bitmap.find_free_run(2, 1), Some(4));
        assert_eq!(bitmap.find_free_run(3, 1), Some(8));
    }

    #[test]
    fn run_must_cover_full_span() {
        let bitmap = OccupancyBitmap::new(32);
        bitmap.mark(10, 1);
        assert_eq!(bitmap.find_free_run(12, 1), Some(11));
    }

    #[test]
    fn aligned_run_starts_on_boundary() {
        let bitmap = OccupancyBitmap::new(32);
        bitmap.mark(0, 5);
        assert_eq!(bitmap.find_free_run(4, 1), Some(5));
        assert_eq!(bitmap.find_free_run(4, 4), Some(8));
    }

    #[test]
    fn full_words_are_skipped() {
        let bitmap = OccupancyBitmap::new(256);
        bitmap.mark(0, 192);
        assert_eq!(bitmap.find_free_run(64, 1), Some(192));
        assert_eq!(bitmap.find_free_run(65, 1), None);
    }

    #[test]
    fn zero_and_oversized_requests_fail() {
        let bitmap = OccupancyBitmap::new(16);
        assert_eq!(bitmap.find_free_run(0, 1), None);
        assert_eq!(bitmap.find_free_run(17, 1), None);
        assert_eq!(bitmap.find_free_run(16, 1), Some(0));
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn found_run_is_free_and_aligned(
                taken in prop::collection::vec((0u32..512, 1u32..32), 0..16),
                size in 1u32..64,
                align in prop_oneof![Just(1u32), Just(2), Just(4), Just(8)],
            ) {
                let bitmap = OccupancyBitmap::new(512);
                for (start, len) in taken {
                    let len = len.min(512 - start);
                    bitmap.mark(start, len);
                }
                if let Some(start) = bitmap.find_free_run(size, align) {
                    prop_assert_eq!(start % align, 0);
                    prop_assert!(bitmap.is_free(start, size));
                    // Nothing earlier qualifies.
                    for earlier in (0..start).filter(|s| s % align == 0) {
                        prop_assert!(!bitmap.is_free(earlier, size));
                    }
                } else {
                    for s in (0..512u32).filter(|s| s % align == 0) {
                        prop_assert!(!bitmap.is_free(s, size));
                    }
                }
            }
        }
    }
}
