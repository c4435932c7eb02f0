//! Blocks and memory views.
//!
//! A [`Block`] records where a range of bytes sits and which heap, if any,
//! owns it. A [`MemoryView`] pairs a block with the arena holding the bytes.
//! Views are cheap to clone and never own their range: several views may
//! alias the same bytes, and dropping a view never frees anything.

use std::fmt;
use std::sync::atomic::AtomicU32;
use std::sync::{Arc, Weak};

use rawmem_core::codec::{decode_signed, decode_unsigned, encode_le};
use rawmem_core::MemError;

use crate::heap::Heap;
use crate::storage::Arena;

/// Location of a view's bytes and a weak link to the heap that owns them.
#[derive(Clone, Debug)]
pub struct Block {
    /// `None` for detached scratch storage that no heap manages.
    owner: Option<Weak<Heap>>,
    start: u32,
    len: u32,
    /// Generation of the allocation starting at `start` when the block was
    /// made, if one was live there.
    generation: Option<u32>,
}

impl Block {
    /// A block inside a heap's arena.
    pub(crate) fn owned(
        owner: Weak<Heap>,
        start: u32,
        len: u32,
        generation: Option<u32>,
    ) -> Self {
        Self {
            owner: Some(owner),
            start,
            len,
            generation,
        }
    }

    /// A block over private storage.
    pub(crate) fn detached(len: u32) -> Self {
        Self {
            owner: None,
            start: 0,
            len,
            generation: None,
        }
    }

    /// First byte of the block within its arena.
    pub fn start(&self) -> u32 {
        self.start
    }

    /// Length in bytes.
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Whether the block covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Generation of the allocation the block was made from.
    ///
    /// `None` for detached blocks and for blocks that do not start where a
    /// live allocation started.
    pub fn generation(&self) -> Option<u32> {
        self.generation
    }

    /// Whether the block was handed out by a heap (alive or not).
    pub fn is_heap_backed(&self) -> bool {
        self.owner.is_some()
    }

    /// The owning heap, if it is still alive.
    pub fn heap(&self) -> Option<Arc<Heap>> {
        self.owner.as_ref().and_then(Weak::upgrade)
    }

    /// Whether this block belongs to the heap behind `heap`.
    pub fn is_owned_by(&self, heap: &Weak<Heap>) -> bool {
        self.owner.as_ref().is_some_and(|w| Weak::ptr_eq(w, heap))
    }

    /// Whether both blocks are heap-backed by the same heap.
    pub fn same_owner(&self, other: &Block) -> bool {
        match (&self.owner, &other.owner) {
            (Some(a), Some(b)) => Weak::ptr_eq(a, b),
            _ => false,
        }
    }

    fn with_range(&self, start: u32, len: u32) -> Self {
        Self {
            owner: self.owner.clone(),
            start,
            len,
            generation: self.generation.filter(|_| start == self.start),
        }
    }
}

/// A live binding of an instance to a byte range.
///
/// All offsets taken by the accessors are relative to the start of the
/// view. Accessors panic when asked for bytes outside the view, the same
/// way slice indexing does.
#[derive(Clone)]
pub struct MemoryView {
    arena: Arc<Arena>,
    block: Block,
}

impl MemoryView {
    pub(crate) fn new(arena: Arc<Arena>, block: Block) -> Self {
        debug_assert!(arena.contains(block.start, block.len));
        Self { arena, block }
    }

    /// A zero-filled view over private storage of `len` bytes.
    ///
    /// Detached views have no heap position, so they cannot be freed or
    /// used as pointer targets.
    pub fn detached(len: u32) -> Self {
        Self::new(Arc::new(Arena::new(len)), Block::detached(len))
    }

    /// The block describing this view's range.
    pub fn block(&self) -> &Block {
        &self.block
    }

    /// The backing arena.
    pub fn arena(&self) -> &Arc<Arena> {
        &self.arena
    }

    /// First byte of the view within its arena.
    pub fn start(&self) -> u32 {
        self.block.start
    }

    /// Length in bytes.
    pub fn len(&self) -> u32 {
        self.block.len
    }

    /// Whether the view covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.block.len == 0
    }

    /// Arena offset of the view when it lives in a heap (`getPointer`).
    pub fn heap_offset(&self) -> Option<u32> {
        self.block.is_heap_backed().then_some(self.block.start)
    }

    /// The owning heap, if the view is heap-backed and the heap is alive.
    pub fn heap(&self) -> Option<Arc<Heap>> {
        self.block.heap()
    }

    /// Whether both views share the same arena and their ranges overlap.
    pub fn aliases(&self, other: &MemoryView) -> bool {
        Arc::ptr_eq(&self.arena, &other.arena)
            && self.start() < other.start() + other.len()
            && other.start() < self.start() + self.len()
    }

    /// A view over `offset..offset + len` of this view, sharing its bytes
    /// and owner.
    ///
    /// # Panics
    ///
    /// Panics if the range is outside this view.
    pub fn sub_view(&self, offset: u32, len: u32) -> MemoryView {
        let start = self.absolute(offset, len);
        Self::new(Arc::clone(&self.arena), self.block.with_range(start, len))
    }

    /// The same start and owner with a different length, for reading the
    /// bytes as another type.
    ///
    /// Fails with [`MemError::OutOfBounds`] if the new range leaves the arena.
    pub fn reinterpret(&self, len: u32) -> Result<MemoryView, MemError> {
        self.arena.check(self.start(), len)?;
        Ok(Self::new(
            Arc::clone(&self.arena),
            self.block.with_range(self.start(), len),
        ))
    }

    /// Read one byte.
    pub fn read_u8(&self, offset: u32) -> u8 {
        self.arena.load_u8(self.absolute(offset, 1))
    }

    /// Write one byte.
    pub fn write_u8(&self, offset: u32, value: u8) {
        self.arena.store_u8(self.absolute(offset, 1), value);
    }

    /// Fill `buf` from the bytes at `offset`.
    pub fn read(&self, offset: u32, buf: &mut [u8]) {
        let start = self.absolute(offset, buf.len() as u32);
        self.arena.read(start, buf);
    }

    /// Copy `bytes` into the view at `offset`.
    pub fn write(&self, offset: u32, bytes: &[u8]) {
        let start = self.absolute(offset, bytes.len() as u32);
        self.arena.write(start, bytes);
    }

    /// Copy of the whole view.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = vec![0; self.len() as usize];
        self.read(0, &mut out);
        out
    }

    /// Set every byte of the view to `value`.
    pub fn fill(&self, value: u8) {
        self.arena.fill(self.start(), self.len(), value);
    }

    /// Copy as many bytes from `source` as both views hold.
    pub fn copy_from(&self, source: &MemoryView) {
        let len = self.len().min(source.len());
        let mut buf = vec![0; len as usize];
        source.read(0, &mut buf);
        self.write(0, &buf);
    }

    /// Read an unsigned little-endian integer of `width` bytes.
    pub fn read_unsigned(&self, offset: u32, width: u32) -> u64 {
        let mut buf = [0u8; 4];
        self.read(offset, &mut buf[..width as usize]);
        decode_unsigned(&buf[..width as usize])
    }

    /// Read a signed little-endian integer of `width` bytes.
    pub fn read_signed(&self, offset: u32, width: u32) -> i64 {
        let mut buf = [0u8; 4];
        self.read(offset, &mut buf[..width as usize]);
        decode_signed(&buf[..width as usize])
    }

    /// Write the low `width` bytes of `raw` little-endian.
    pub fn write_le(&self, offset: u32, raw: u64, width: u32) {
        self.write(offset, &encode_le(raw, width)[..width as usize]);
    }

    /// Borrow the 4-byte cell at `offset` for atomic operations.
    ///
    /// The cell's absolute arena offset must be a multiple of 4.
    pub fn cell(&self, offset: u32) -> Result<&AtomicU32, MemError> {
        let start = self.absolute(offset, 4);
        self.arena.cell(start)
    }

    fn absolute(&self, offset: u32, len: u32) -> u32 {
        assert!(
            offset as u64 + len as u64 <= self.len() as u64,
            "view access {offset}..{} out of range for a {} byte view",
            offset as u64 + len as u64,
            self.len()
        );
        self.start() + offset
    }
}

impl fmt::Debug for MemoryView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryView")
            .field("start", &self.start())
            .field("len", &self.len())
            .field("heap_backed", &self.block.is_heap_backed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detached_view_has_no_heap_offset() {
        let view = MemoryView::detached(8);
        assert_eq!(view.heap_offset(), None);
        assert!(view.heap().is_none());
        assert_eq!(view.to_vec(), vec![0; 8]);
    }

    #[test]
    fn sub_view_aliases_parent() {
        let parent = MemoryView::detached(8);
        let child = parent.sub_view(4, 2);
        child.write(0, &[9, 8]);
        assert_eq!(parent.to_vec(), vec![0, 0, 0, 0, 9, 8, 0, 0]);
        assert!(parent.aliases(&child));
        assert!(!child.aliases(&parent.sub_view(0, 4)));
    }

    #[test]
    fn integer_round_trip_little_endian() {
        let view = MemoryView::detached(4);
        view.write_le(0, 0xBEEF, 2);
        assert_eq!(view.to_vec(), vec![0xEF, 0xBE, 0, 0]);
        assert_eq!(view.read_unsigned(0, 2), 0xBEEF);
        assert_eq!(view.read_signed(0, 2), 0xBEEF - 0x10000);
    }

    #[test]
    fn reinterpret_stays_inside_arena() {
        let view = MemoryView::detached(8).sub_view(2, 2);
        assert_eq!(view.reinterpret(6).unwrap().len(), 6);
        assert!(matches!(
            view.reinterpret(7),
            Err(MemError::OutOfBounds {
                offset: 2,
                len: 7,
                capacity: 8
            })
        ));
    }

    #[test]
    fn copy_from_copies_common_prefix() {
        let source = MemoryView::detached(3);
        source.write(0, &[1, 2, 3]);
        let target = MemoryView::detached(5);
        target.copy_from(&source);
        assert_eq!(target.to_vec(), vec![1, 2, 3, 0, 0]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn access_past_view_panics() {
        let view = MemoryView::detached(8).sub_view(0, 2);
        view.read_u8(2);
    }
}
