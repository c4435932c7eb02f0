//! Test utilities and fixture types for rawmem development.
//!
//! Provides a handful of struct types declared with
//! [`define_struct!`](rawmem_heap::define_struct) (see [`fixtures`]) and
//! small builders for heaps and populated instances.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::Arc;

use rawmem_heap::{Heap, Struct};

pub mod fixtures;

pub use fixtures::{Bar, Element, Guarded};

/// Capacity used by [`test_heap`]: 4KB, small enough to exhaust on purpose.
pub const TEST_CAPACITY: u32 = 4 * 1024;

/// A fresh heap of [`TEST_CAPACITY`] bytes.
pub fn test_heap() -> Arc<Heap> {
    heap_with_capacity(TEST_CAPACITY)
}

/// A fresh heap of `capacity` bytes.
///
/// # Panics
///
/// Panics if the capacity is rejected.
pub fn heap_with_capacity(capacity: u32) -> Arc<Heap> {
    Heap::with_capacity(capacity).unwrap()
}

/// Allocate one [`Element`] holding `value`.
pub fn element(heap: &Heap, value: i32) -> Element {
    let element = Element::new_in(heap).unwrap();
    element.value().set(value as i64);
    element
}

/// Allocate one [`Guarded`] counter starting at zero.
pub fn guarded(heap: &Heap) -> Guarded {
    Guarded::new_in(heap).unwrap()
}

/// Add one to a [`Guarded`] counter while holding its lock.
pub fn guarded_increment(counter: &Guarded) {
    let lock = counter.lock();
    let _guard = lock.lock().unwrap();
    let count = counter.count().get();
    counter.count().set(count as i64 + 1);
}

/// Allocate one [`Element`] per value, in order.
pub fn elements(heap: &Heap, values: impl IntoIterator<Item = i32>) -> Vec<Element> {
    values.into_iter().map(|v| element(heap, v)).collect()
}
