//! Pointer fields: 4-byte heap offsets with a weak, lazily filled cache.
//!
//! The cell itself is the only source of truth. A [`PointerCache`] on the
//! holder remembers the view it last resolved for each pointer field,
//! stamped with the generation of the allocation it pointed at. A cached
//! view is reused only while the cell still holds the same offset and the
//! heap still reports the same generation there; otherwise the pointer is
//! resolved again from the holder's heap.

use std::fmt;
use std::marker::PhantomData;

use parking_lot::Mutex;
use smallvec::SmallVec;

use rawmem_core::layout::{FieldDescriptor, POINTER_SIZE};
use rawmem_core::MemError;

use crate::record::Struct;
use crate::view::MemoryView;

#[derive(Clone)]
struct CachedTarget {
    /// Offset of the pointer cell within the holder.
    field: u32,
    /// Arena offset the cell held when the entry was made.
    target: u32,
    generation: u32,
    view: MemoryView,
}

/// Resolved pointees of one instance, keyed by pointer field.
#[derive(Default)]
pub struct PointerCache {
    entries: Mutex<SmallVec<[CachedTarget; 2]>>,
}

impl PointerCache {
    /// Number of cached pointees.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn lookup(&self, field: u32, target: u32) -> Option<MemoryView> {
        let entry = self
            .entries
            .lock()
            .iter()
            .find(|e| e.field == field)
            .cloned()?;
        if entry.target != target {
            return None;
        }
        // The entry lock is released before asking the heap.
        let heap = entry.view.heap()?;
        (heap.generation_at(target) == Some(entry.generation)).then_some(entry.view)
    }

    fn store(&self, field: u32, target: u32, generation: u32, view: MemoryView) {
        let entry = CachedTarget {
            field,
            target,
            generation,
            view,
        };
        let mut entries = self.entries.lock();
        match entries.iter_mut().find(|e| e.field == field) {
            Some(slot) => *slot = entry,
            None => entries.push(entry),
        }
    }

    fn evict(&self, field: u32) {
        self.entries.lock().retain(|e| e.field != field);
    }
}

impl Clone for PointerCache {
    fn clone(&self) -> Self {
        Self {
            entries: Mutex::new(self.entries.lock().clone()),
        }
    }
}

impl fmt::Debug for PointerCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointerCache")
            .field("entries", &self.len())
            .finish()
    }
}

/// Accessor for one pointer field of an instance.
pub struct PtrField<'a, T> {
    holder: &'a MemoryView,
    cache: &'a PointerCache,
    field: &'static FieldDescriptor,
    _target: PhantomData<fn() -> T>,
}

impl<'a, T: Struct> PtrField<'a, T> {
    /// Bind `field` of the instance viewed by `holder`.
    pub fn new(
        holder: &'a MemoryView,
        cache: &'a PointerCache,
        field: &'static FieldDescriptor,
    ) -> Self {
        Self {
            holder,
            cache,
            field,
            _target: PhantomData,
        }
    }

    /// The raw arena offset in the cell; 0 is null.
    pub fn offset(&self) -> u32 {
        self.holder.read_unsigned(self.field.offset, POINTER_SIZE) as u32
    }

    /// Whether the cell is null.
    pub fn is_null(&self) -> bool {
        self.offset() == 0
    }

    /// Dereference the pointer.
    ///
    /// Returns `Ok(None)` for null. Fails with [`MemError::HeapUnavailable`]
    /// if the holder has no live heap to resolve against, and with
    /// [`MemError::OutOfBounds`] if the pointee would leave the arena.
    pub fn get(&self) -> Result<Option<T>, MemError> {
        let target = self.offset();
        if target == 0 {
            return Ok(None);
        }
        if let Some(view) = self.cache.lookup(self.field.offset, target) {
            return Ok(Some(T::bind(view)));
        }
        let heap = self.holder.heap().ok_or(MemError::HeapUnavailable)?;
        let view = heap.slice(target, T::size())?;
        if let Some(generation) = heap.generation_at(target) {
            self.cache
                .store(self.field.offset, target, generation, view.clone());
        }
        Ok(Some(T::bind(view)))
    }

    /// Point at `target`, or clear the pointer with `None`.
    ///
    /// The target must have a heap position, and must share the holder's
    /// heap when the holder is heap-backed; otherwise this fails with
    /// [`MemError::InvalidTarget`] and the cell is left unchanged.
    pub fn set(&self, target: Option<&T>) -> Result<(), MemError> {
        let Some(target) = target else {
            self.write(0);
            self.cache.evict(self.field.offset);
            return Ok(());
        };
        let view = target.view();
        let offset = view.heap_offset().ok_or(MemError::InvalidTarget {
            reason: "target was never allocated from a heap",
        })?;
        if offset == 0 {
            return Err(MemError::InvalidTarget {
                reason: "offset 0 is the heap control header",
            });
        }
        let holder = self.holder.block();
        if holder.is_heap_backed() && !holder.same_owner(view.block()) {
            return Err(MemError::InvalidTarget {
                reason: "target lives in a different heap",
            });
        }
        self.write(offset);
        match view.heap().and_then(|heap| heap.generation_at(offset)) {
            Some(generation) => {
                self.cache
                    .store(self.field.offset, offset, generation, view.clone())
            }
            None => self.cache.evict(self.field.offset),
        }
        Ok(())
    }

    /// Store a raw arena offset; 0 clears the pointer.
    ///
    /// A non-zero offset must resolve to a slice of the pointee's size in
    /// the holder's heap.
    pub fn set_offset(&self, offset: u32) -> Result<(), MemError> {
        if offset != 0 {
            let heap = self.holder.heap().ok_or(MemError::HeapUnavailable)?;
            heap.slice(offset, T::size())?;
        }
        self.write(offset);
        self.cache.evict(self.field.offset);
        Ok(())
    }

    /// The field's layout entry.
    pub fn descriptor(&self) -> &'static FieldDescriptor {
        self.field
    }

    fn write(&self, offset: u32) {
        self.holder
            .write_le(self.field.offset, offset as u64, POINTER_SIZE);
    }
}

impl<T> fmt::Debug for PtrField<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let offset = self.holder.read_unsigned(self.field.offset, POINTER_SIZE);
        f.debug_struct("PtrField")
            .field("name", &self.field.name)
            .field("offset", &offset)
            .finish()
    }
}
