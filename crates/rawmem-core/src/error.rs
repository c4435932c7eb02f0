//! Error types shared by every rawmem crate.
//!
//! All fallible operations in the workspace return [`MemError`]. Freeing a
//! foreign object and removing an absent list element are deliberately not
//! errors; they are silent no-ops at the call site.

use std::error::Error;
use std::fmt;

/// Errors raised by allocation, slicing, pointer resolution and locking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemError {
    /// No contiguous free run of the requested size exists in the arena.
    OutOfMemory {
        /// Number of bytes requested.
        requested: u32,
        /// Total arena capacity in bytes.
        capacity: u32,
    },
    /// A pointer write was given a target with no usable heap position.
    InvalidTarget {
        /// Why the target was rejected.
        reason: &'static str,
    },
    /// The heap owning a pointer's storage is no longer reachable.
    HeapUnavailable,
    /// A requested byte range leaves the arena.
    OutOfBounds {
        /// Start of the requested range.
        offset: u32,
        /// Length of the requested range.
        len: u32,
        /// Arena capacity in bytes.
        capacity: u32,
    },
    /// An atomic cell does not sit on a 4-byte boundary.
    MisalignedCell {
        /// Absolute arena offset of the cell.
        offset: u32,
    },
    /// A heap configuration was rejected at construction.
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },
}

impl fmt::Display for MemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory {
                requested,
                capacity,
            } => {
                write!(
                    f,
                    "out of memory: no free run of {requested} bytes in a {capacity} byte arena"
                )
            }
            Self::InvalidTarget { reason } => write!(f, "invalid pointer target: {reason}"),
            Self::HeapUnavailable => write!(f, "owning heap is no longer available"),
            Self::OutOfBounds {
                offset,
                len,
                capacity,
            } => {
                write!(
                    f,
                    "range {offset}..{} exceeds arena capacity {capacity}",
                    *offset as u64 + *len as u64
                )
            }
            Self::MisalignedCell { offset } => {
                write!(f, "atomic cell at offset {offset} is not 4-byte aligned")
            }
            Self::InvalidConfig { reason } => write!(f, "invalid heap config: {reason}"),
        }
    }
}

impl Error for MemError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_memory_message_names_sizes() {
        let err = MemError::OutOfMemory {
            requested: 128,
            capacity: 64,
        };
        assert_eq!(
            err.to_string(),
            "out of memory: no free run of 128 bytes in a 64 byte arena"
        );
    }

    #[test]
    fn out_of_bounds_end_does_not_overflow() {
        let err = MemError::OutOfBounds {
            offset: u32::MAX,
            len: 4,
            capacity: 1024,
        };
        assert!(err.to_string().contains("4294967295..4294967299"));
    }
}
