//! Reusable struct type fixtures.
//!
//! - [`Element`]: a single signed 32-bit value, the usual list element.
//! - [`Bar`]: a mixed record of integers and a 50-byte string.
//! - [`Guarded`]: a counter protected by an embedded lock.

use rawmem_heap::{define_struct, Lock};

define_struct! {
    /// One signed value.
    pub struct Element {
        value: Int32,
    }
}

define_struct! {
    /// Mixed-width record, 58 bytes.
    pub struct Bar {
        a: UInt16,
        b: UInt32,
        c: UInt8,
        d: Int8,
        e: CString(50),
    }
}

define_struct! {
    /// A counter whose updates are serialised by its own lock.
    pub struct Guarded {
        lock: Embedded(Lock),
        count: UInt32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rawmem_heap::Struct;

    #[test]
    fn fixture_sizes() {
        assert_eq!(Element::size(), 4);
        assert_eq!(Bar::size(), 58);
        assert_eq!(Guarded::size(), 8);
        assert_eq!(Guarded::layout().align(), 4);
    }
}
