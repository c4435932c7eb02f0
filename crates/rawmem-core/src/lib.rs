//! Core types for the rawmem workspace.
//!
//! This is the leaf crate with no internal dependencies. It defines the
//! registration-time schema of struct types ([`TypeLayout`]), the byte
//! codecs used by field accessors, and the shared [`MemError`] type.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod error;
pub mod layout;

pub use codec::StringEncoding;
pub use error::MemError;
pub use layout::{FieldDescriptor, FieldKind, LayoutBuilder, TypeLayout, ATOMIC_CELL_SIZE, POINTER_SIZE};
