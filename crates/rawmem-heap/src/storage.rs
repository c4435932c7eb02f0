//! Fixed-capacity byte storage shared between threads.
//!
//! An [`Arena`] is a run of bytes packed into `AtomicU32` words. Every byte
//! access is an atomic operation on its containing word, so views held by
//! different threads may read and write the same bytes without undefined
//! behaviour; ordering between threads comes from the heap's lock. Whole
//! 4-byte aligned cells can be borrowed as `&AtomicU32` for the lock's
//! compare-and-swap.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use rawmem_core::MemError;

const WORD_BYTES: u32 = 4;

/// A fixed-size, zero-initialised byte arena.
pub struct Arena {
    /// Backing words; byte `i` lives in `words[i / 4]` at bits `8 * (i % 4)`.
    words: Box<[AtomicU32]>,
    /// Size in bytes. May be smaller than `words.len() * 4`.
    len: u32,
}

impl Arena {
    /// Create a zero-filled arena of `len` bytes.
    pub fn new(len: u32) -> Self {
        let words = (0..len.div_ceil(WORD_BYTES))
            .map(|_| AtomicU32::new(0))
            .collect();
        Self { words, len }
    }

    /// Size in bytes.
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Whether the arena has no bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Memory used by the backing words in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.words.len() * std::mem::size_of::<AtomicU32>()
    }

    /// Whether `offset..offset + len` lies inside the arena.
    pub fn contains(&self, offset: u32, len: u32) -> bool {
        offset as u64 + len as u64 <= self.len as u64
    }

    /// Check a range, returning [`MemError::OutOfBounds`] if it leaves the arena.
    pub fn check(&self, offset: u32, len: u32) -> Result<(), MemError> {
        if self.contains(offset, len) {
            Ok(())
        } else {
            Err(MemError::OutOfBounds {
                offset,
                len,
                capacity: self.len,
            })
        }
    }

    /// Read one byte.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is outside the arena.
    pub fn load_u8(&self, offset: u32) -> u8 {
        self.assert_range(offset, 1);
        let (word, shift) = Self::locate(offset);
        (self.words[word].load(Ordering::Relaxed) >> shift) as u8
    }

    /// Write one byte, leaving the other bytes of its word untouched.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is outside the arena.
    pub fn store_u8(&self, offset: u32, value: u8) {
        self.assert_range(offset, 1);
        let (word, shift) = Self::locate(offset);
        let mask = !(0xFFu32 << shift);
        let bits = (value as u32) << shift;
        let _ = self.words[word].fetch_update(Ordering::Relaxed, Ordering::Relaxed, |w| {
            Some((w & mask) | bits)
        });
    }

    /// Copy `buf.len()` bytes starting at `offset` into `buf`.
    ///
    /// # Panics
    ///
    /// Panics if the range is outside the arena.
    pub fn read(&self, offset: u32, buf: &mut [u8]) {
        self.assert_range(offset, buf.len() as u32);
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot = self.load_u8(offset + i as u32);
        }
    }

    /// Copy `bytes` into the arena starting at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the range is outside the arena.
    pub fn write(&self, offset: u32, bytes: &[u8]) {
        self.assert_range(offset, bytes.len() as u32);
        for (i, &b) in bytes.iter().enumerate() {
            self.store_u8(offset + i as u32, b);
        }
    }

    /// Set `len` bytes starting at `offset` to `value`.
    ///
    /// # Panics
    ///
    /// Panics if the range is outside the arena.
    pub fn fill(&self, offset: u32, len: u32, value: u8) {
        self.assert_range(offset, len);
        for i in offset..offset + len {
            self.store_u8(i, value);
        }
    }

    /// Borrow the 4-byte cell at `offset` as an atomic word.
    ///
    /// Fails with [`MemError::MisalignedCell`] unless `offset` is a multiple
    /// of 4, and with [`MemError::OutOfBounds`] if the cell leaves the arena.
    pub fn cell(&self, offset: u32) -> Result<&AtomicU32, MemError> {
        if offset % WORD_BYTES != 0 {
            return Err(MemError::MisalignedCell { offset });
        }
        self.check(offset, WORD_BYTES)?;
        Ok(&self.words[(offset / WORD_BYTES) as usize])
    }

    fn locate(offset: u32) -> (usize, u32) {
        ((offset / WORD_BYTES) as usize, (offset % WORD_BYTES) * 8)
    }

    fn assert_range(&self, offset: u32, len: u32) {
        assert!(
            self.contains(offset, len),
            "arena access {offset}..{} out of range for {} bytes",
            offset as u64 + len as u64,
            self.len
        );
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena").field("len", &self.len).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_arena_is_zeroed() {
        let arena = Arena::new(10);
        let mut buf = [0xAA; 10];
        arena.read(0, &mut buf);
        assert_eq!(buf, [0; 10]);
        assert_eq!(arena.memory_bytes(), 12);
    }

    #[test]
    fn byte_writes_do_not_disturb_neighbours() {
        let arena = Arena::new(8);
        arena.write(0, &[1, 2, 3, 4, 5]);
        arena.store_u8(2, 0xFF);
        let mut buf = [0; 5];
        arena.read(0, &mut buf);
        assert_eq!(buf, [1, 2, 0xFF, 4, 5]);
    }

    #[test]
    fn cell_word_is_little_endian_over_bytes() {
        let arena = Arena::new(8);
        let cell = arena.cell(4).unwrap();
        cell.store(0x0403_0201, Ordering::Relaxed);
        let mut buf = [0; 4];
        arena.read(4, &mut buf);
        assert_eq!(buf, [1, 2, 3, 4]);
    }

    #[test]
    fn misaligned_cell_is_rejected() {
        let arena = Arena::new(16);
        assert!(matches!(
            arena.cell(2),
            Err(MemError::MisalignedCell { offset: 2 })
        ));
    }

    #[test]
    fn cell_past_end_is_out_of_bounds() {
        let arena = Arena::new(6);
        assert!(matches!(arena.cell(4), Err(MemError::OutOfBounds { .. })));
    }

    #[test]
    fn fill_sets_range() {
        let arena = Arena::new(6);
        arena.fill(1, 3, 7);
        let mut buf = [0; 6];
        arena.read(0, &mut buf);
        assert_eq!(buf, [0, 7, 7, 7, 0, 0]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn read_past_end_panics() {
        let arena = Arena::new(4);
        let mut buf = [0; 2];
        arena.read(3, &mut buf);
    }
}
