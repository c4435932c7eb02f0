//! rawmem: a C-style manual memory model in safe Rust.
//!
//! Struct types are declared field by field and mapped straight onto byte
//! offsets of a fixed-size heap arena. Instances are allocated and freed
//! by hand, pointer fields store 4-byte heap offsets, and a mutex living in
//! the arena itself serialises allocation across threads.
//!
//! This is the facade crate that re-exports the public API from the
//! rawmem sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use rawmem::prelude::*;
//!
//! define_struct! {
//!     /// A named point in a chain.
//!     pub struct Waypoint {
//!         x: Int16,
//!         y: Int16,
//!         name: CString(8),
//!         next: Pointer(Waypoint),
//!     }
//! }
//!
//! let heap = Heap::new(HeapConfig::new(1024)).unwrap();
//! let start = Waypoint::new_in(&heap).unwrap();
//! let end = Waypoint::new_in(&heap).unwrap();
//! start.name().set("start");
//! end.x().set(-3);
//! start.next().set(Some(&end)).unwrap();
//!
//! let hop = start.next().get().unwrap().unwrap();
//! assert_eq!(hop.x().get(), -3);
//!
//! let route = List::new_in(&heap).unwrap();
//! route.add(&start).unwrap().add(&end).unwrap();
//! assert_eq!(route.len().unwrap(), 2);
//!
//! heap.free(&end);
//! assert_eq!(heap.stats().live_allocations, 3);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `rawmem-core` | Layouts, field descriptors, codecs, `MemError` |
//! | [`heap`] | `rawmem-heap` | `Heap`, views, `Struct`, field handles, `Lock` |
//! | [`list`] | `rawmem-list` | `List` and its iterator |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Layouts, byte codecs and errors (`rawmem-core`).
pub use rawmem_core as types;

/// Heap, views, struct bindings and the lock (`rawmem-heap`).
///
/// Declare struct types with [`define_struct!`]; allocate them from a
/// [`heap::Heap`] or the process-wide [`heap::default_heap`].
pub use rawmem_heap as heap;

/// Intrusive singly-linked list (`rawmem-list`).
pub use rawmem_list as list;

pub use rawmem_heap::define_struct;

/// Common imports for typical rawmem usage.
///
/// ```rust
/// use rawmem::prelude::*;
/// ```
pub mod prelude {
    // Declaration
    pub use rawmem_heap::{define_struct, Struct};

    // Heap
    pub use rawmem_heap::{default_heap, Heap, HeapConfig, HeapStats, MemoryView};

    // Synchronisation
    pub use rawmem_heap::{Lock, LockGuard};

    // Errors and encodings
    pub use rawmem_core::{MemError, StringEncoding};

    // List
    pub use rawmem_list::List;
}
