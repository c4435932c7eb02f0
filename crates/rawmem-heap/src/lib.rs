//! Shared heap, memory views and struct bindings for rawmem.
//!
//! A [`Heap`] is a fixed-capacity byte arena with a first-fit allocator.
//! Struct types declared with [`define_struct!`] bind to byte ranges of
//! that arena through a [`MemoryView`]; every field accessor reads and
//! writes the arena directly, so two instances bound to overlapping bytes
//! observe each other's writes.
//!
//! # Architecture
//!
//! ```text
//! Arc<Heap>
//! ├── Arc<Arena>          (AtomicU32 words, shared with every view)
//! ├── OccupancyBitmap     (1 bit per byte, AtomicU64 words)
//! ├── HeapHeader @ 0      (embedded Lock serialising allocate/free)
//! └── allocation table    (start -> {len, generation})
//!
//! MemoryView = Arc<Arena> + Block { Weak<Heap>, start, len }
//! ```
//!
//! # Safety
//!
//! Arena bytes are atomics, so concurrent unsynchronised access is a
//! logical race but never undefined behaviour. The only `unsafe` code is
//! the park/unpark wait queue in `wait.rs`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod bitmap;
pub mod config;
pub mod field;
pub mod global;
pub mod heap;
pub mod lock;
pub mod pointer;
pub mod record;
pub mod stats;
pub mod storage;
pub mod view;
mod wait;

// Public re-exports for the primary API surface.
pub use config::HeapConfig;
pub use global::default_heap;
pub use heap::{Heap, HeapHeader};
pub use lock::{Lock, LockGuard};
pub use record::Struct;
pub use stats::HeapStats;
pub use view::{Block, MemoryView};

pub use rawmem_core::layout;
pub use rawmem_core::{MemError, StringEncoding};
