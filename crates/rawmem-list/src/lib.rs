//! Intrusive singly-linked list over a rawmem heap.
//!
//! A [`List`] is a chain of 8-byte heap nodes, each holding a pointer to
//! an element and a pointer to the following node. The list value is its
//! head node. Nothing here owns storage beyond what the heap hands out:
//! elements are allocated by the caller, nodes by [`List::add`], and
//! neither is freed by the list.
//!
//! ```
//! use rawmem_heap::{define_struct, Heap, Struct};
//! use rawmem_list::List;
//!
//! define_struct! {
//!     pub struct Score {
//!         points: UInt16,
//!     }
//! }
//!
//! let heap = Heap::with_capacity(1024).unwrap();
//! let list = List::new_in(&heap).unwrap();
//! for points in [10, 20, 30] {
//!     let score = Score::new_in(&heap).unwrap();
//!     score.points().set(points);
//!     list.add(&score).unwrap();
//! }
//! let total: u16 = list
//!     .values()
//!     .unwrap()
//!     .iter()
//!     .map(|s| s.points().get())
//!     .sum();
//! assert_eq!(total, 60);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod list;

pub use list::{Iter, List};
