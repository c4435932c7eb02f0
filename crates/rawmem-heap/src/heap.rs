//! The fixed-capacity heap.
//!
//! A [`Heap`] owns one [`Arena`], an [`OccupancyBitmap`] with one bit per
//! arena byte, and a table of live allocations. Its control header, a
//! [`HeapHeader`] holding the heap's own [`Lock`], is bound at arena offset
//! 0 and marked taken at construction, so no user allocation ever starts
//! at 0 and a pointer cell holding 0 can mean null.
//!
//! Allocation is a first-fit linear scan of the bitmap. There is no
//! free list, no coalescing step and no size classes: freeing clears bits,
//! and the next scan sees the hole.

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;

use rawmem_core::MemError;

use crate::bitmap::OccupancyBitmap;
use crate::config::HeapConfig;
use crate::lock::{Lock, LockGuard};
use crate::record::Struct;
use crate::stats::HeapStats;
use crate::storage::Arena;
use crate::view::{Block, MemoryView};

crate::define_struct! {
    /// The heap's control block at arena offset 0.
    pub struct HeapHeader {
        /// Serialises allocation and free.
        lock: Embedded(Lock),
    }
}

/// Bookkeeping for one live allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Allocation {
    len: u32,
    generation: u32,
}

#[derive(Debug, Default)]
struct Counters {
    allocations: AtomicU64,
    frees: AtomicU64,
    failed_allocations: AtomicU64,
    ignored_frees: AtomicU64,
}

/// A fixed-capacity arena with allocate/free.
///
/// Always handled through an `Arc<Heap>`; blocks handed out by the heap
/// refer back to it weakly. Allocation and free hold the in-arena
/// [`Lock`] for their whole critical section and are linearizable across
/// threads.
pub struct Heap {
    config: HeapConfig,
    arena: Arc<Arena>,
    occupancy: OccupancyBitmap,
    /// Start offset -> allocation, for generation checks and stats.
    allocations: Mutex<IndexMap<u32, Allocation>>,
    next_generation: AtomicU32,
    header: HeapHeader,
    lock: Lock,
    counters: Counters,
    self_ref: Weak<Heap>,
}

impl Heap {
    /// Create a heap from `config`.
    ///
    /// Fails with [`MemError::InvalidConfig`] if the capacity is below
    /// [`HeapConfig::MIN_CAPACITY`].
    pub fn new(config: HeapConfig) -> Result<Arc<Self>, MemError> {
        if config.capacity < HeapConfig::MIN_CAPACITY {
            return Err(MemError::InvalidConfig {
                reason: format!(
                    "capacity {} is below the minimum of {} bytes",
                    config.capacity,
                    HeapConfig::MIN_CAPACITY
                ),
            });
        }
        let header_len = HeapHeader::size();
        debug_assert!(header_len < HeapConfig::MIN_CAPACITY);

        Ok(Arc::new_cyclic(|weak: &Weak<Heap>| {
            let arena = Arc::new(Arena::new(config.capacity));
            let occupancy = OccupancyBitmap::new(config.capacity);
            occupancy.mark(0, header_len);
            let header = HeapHeader::bind(MemoryView::new(
                Arc::clone(&arena),
                Block::owned(weak.clone(), 0, header_len, None),
            ));
            let lock = header.lock();
            Self {
                config,
                arena,
                occupancy,
                allocations: Mutex::new(IndexMap::new()),
                next_generation: AtomicU32::new(1),
                header,
                lock,
                counters: Counters::default(),
                self_ref: weak.clone(),
            }
        }))
    }

    /// Create a heap of `capacity` bytes.
    pub fn with_capacity(capacity: u32) -> Result<Arc<Self>, MemError> {
        Self::new(HeapConfig::new(capacity))
    }

    /// The configuration the heap was built from.
    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    /// Arena size in bytes.
    pub fn capacity(&self) -> u32 {
        self.config.capacity
    }

    /// The control header bound at offset 0.
    pub fn header(&self) -> &HeapHeader {
        &self.header
    }

    /// Allocate `size` bytes at the first free run.
    ///
    /// A zero-byte request is served as one byte so every allocation has
    /// its own offset. The returned bytes are not cleared. Fails with
    /// [`MemError::OutOfMemory`] if no run of `size` free bytes exists.
    pub fn allocate(&self, size: u32) -> Result<MemoryView, MemError> {
        self.allocate_aligned(size, 1)
    }

    /// Allocate `size` bytes at the first free run starting on a multiple
    /// of `align`.
    pub fn allocate_aligned(&self, size: u32, align: u32) -> Result<MemoryView, MemError> {
        let size = size.max(1);
        let _guard = self.lock_header();
        let Some(start) = self.occupancy.find_free_run(size, align) else {
            self.counters
                .failed_allocations
                .fetch_add(1, Ordering::Relaxed);
            return Err(MemError::OutOfMemory {
                requested: size,
                capacity: self.capacity(),
            });
        };
        self.occupancy.mark(start, size);
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        self.allocations.lock().insert(
            start,
            Allocation {
                len: size,
                generation,
            },
        );
        self.counters.allocations.fetch_add(1, Ordering::Relaxed);
        Ok(self.view_at(start, size, Some(generation)))
    }

    /// Return an instance's bytes to the heap.
    ///
    /// See [`Heap::free_view`].
    pub fn free<S: Struct>(&self, instance: &S) {
        self.free_view(instance.view());
    }

    /// Return a view's bytes to the heap.
    ///
    /// Only a view covering exactly one live allocation, and made while
    /// that allocation was live, is freed. Anything else is ignored:
    /// detached scratch storage, views of another heap, views reaching
    /// into the control header, partial or oversized ranges, and stale
    /// views of a block that was freed and handed out again. The bytes are
    /// not zeroed and other views of them stay readable.
    pub fn free_view(&self, view: &MemoryView) {
        let block = view.block();
        if !block.is_owned_by(&self.self_ref) || block.start() < self.header.view().len() {
            self.counters.ignored_frees.fetch_add(1, Ordering::Relaxed);
            return;
        }
        let _guard = self.lock_header();
        let mut allocations = self.allocations.lock();
        match allocations.get(&block.start()) {
            Some(allocation)
                if allocation.len == block.len()
                    && Some(allocation.generation) == block.generation() => {}
            _ => {
                self.counters.ignored_frees.fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
        self.occupancy.clear(block.start(), block.len());
        allocations.swap_remove(&block.start());
        self.counters.frees.fetch_add(1, Ordering::Relaxed);
    }

    /// A view over `offset..offset + len`, without consulting occupancy
    /// (`getSlice`).
    ///
    /// A slice that matches a live allocation exactly can free it.
    /// Fails with [`MemError::OutOfBounds`] if the range leaves the arena.
    pub fn slice(&self, offset: u32, len: u32) -> Result<MemoryView, MemError> {
        self.arena.check(offset, len)?;
        Ok(self.view_at(offset, len, self.generation_at(offset)))
    }

    /// Generation of the live allocation starting at `offset`, if any.
    pub fn generation_at(&self, offset: u32) -> Option<u32> {
        self.allocations
            .lock()
            .get(&offset)
            .map(|allocation| allocation.generation)
    }

    /// Length of the live allocation starting at `offset`, if any.
    pub fn allocation_len(&self, offset: u32) -> Option<u32> {
        self.allocations
            .lock()
            .get(&offset)
            .map(|allocation| allocation.len)
    }

    /// Whether byte `offset` is marked taken. Offsets past the end read as
    /// taken.
    pub fn is_taken(&self, offset: u32) -> bool {
        self.occupancy.is_taken(offset)
    }

    /// Whether `view` was handed out by this heap.
    pub fn owns(&self, view: &MemoryView) -> bool {
        view.block().is_owned_by(&self.self_ref)
    }

    /// Snapshot of occupancy and lifetime counters.
    pub fn stats(&self) -> HeapStats {
        HeapStats {
            capacity: self.capacity(),
            used_bytes: self.occupancy.taken_count(),
            live_allocations: self.allocations.lock().len(),
            allocations_total: self.counters.allocations.load(Ordering::Relaxed),
            frees_total: self.counters.frees.load(Ordering::Relaxed),
            failed_allocations: self.counters.failed_allocations.load(Ordering::Relaxed),
            ignored_frees: self.counters.ignored_frees.load(Ordering::Relaxed),
        }
    }

    /// Memory used by the arena and bitmap in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.arena.memory_bytes() + self.config.bitmap_bytes()
    }

    fn view_at(&self, start: u32, len: u32, generation: Option<u32>) -> MemoryView {
        MemoryView::new(
            Arc::clone(&self.arena),
            Block::owned(self.self_ref.clone(), start, len, generation),
        )
    }

    fn lock_header(&self) -> LockGuard<'_> {
        self.lock
            .lock()
            .expect("heap lock sits at arena offset 0, which is 4-byte aligned")
    }
}

impl fmt::Debug for Heap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heap")
            .field("capacity", &self.capacity())
            .field("used_bytes", &self.occupancy.taken_count())
            .field("live_allocations", &self.allocations.lock().len())
            .finish()
    }
}

#[cfg(debug_assertions)]
impl Drop for Heap {
    fn drop(&mut self) {
        if self.lock.is_locked() {
            eprintln!(
                "rawmem: heap of {} bytes dropped while its lock is held ({} live allocations)",
                self.capacity(),
                self.allocations.get_mut().len(),
            );
        }
    }
}
