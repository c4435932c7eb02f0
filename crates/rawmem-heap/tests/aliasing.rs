//! Integration test: struct punning over shared heap bytes.
//!
//! Two struct types bound to the same allocation see each other's writes
//! byte for byte, and string fields split exactly at their declared
//! boundaries.

use rawmem_heap::{define_struct, Heap, Struct};

define_struct! {
    struct Pair {
        lo: UInt8,
        hi: UInt8,
    }
}

define_struct! {
    struct Wide {
        value: UInt16,
    }
}

define_struct! {
    struct Halves {
        left: CString(4),
        right: CString(4),
    }
}

define_struct! {
    struct Whole {
        text: CString(8),
    }
}

define_struct! {
    struct Record {
        id: UInt32,
        flags: Int8,
        label: CString(10),
        sibling: Pointer(Record),
    }
}

// ── Integer punning ──────────────────────────────────────────────────

#[test]
fn two_bytes_read_as_one_little_endian_word() {
    let heap = Heap::with_capacity(128).unwrap();
    let pair = Pair::new_in(&heap).unwrap();
    pair.lo().set(3);
    pair.hi().set(1);

    let wide = Wide::from_struct(&pair).unwrap();
    assert_eq!(wide.value().get(), 259);

    wide.value().set(512);
    assert_eq!((pair.lo().get(), pair.hi().get()), (0, 2));
}

#[test]
fn views_from_slice_alias_allocation() {
    let heap = Heap::with_capacity(128).unwrap();
    let wide = Wide::new_in(&heap).unwrap();
    let offset = wide.heap_offset().unwrap();
    let pair = Pair::bind(heap.slice(offset, Pair::size()).unwrap());
    wide.value().set(0x0A0B);
    assert_eq!((pair.lo().get(), pair.hi().get()), (0x0B, 0x0A));
}

// ── Strings ──────────────────────────────────────────────────────────

#[test]
fn string_split_across_adjacent_fields() {
    let heap = Heap::with_capacity(128).unwrap();
    let whole = Whole::new_in(&heap).unwrap();
    whole.text().set("abcdefgh");

    let halves = Halves::from_struct(&whole).unwrap();
    assert_eq!(halves.left().get(), "abcd");
    assert_eq!(halves.right().get(), "efgh");

    halves.right().set("xy");
    assert_eq!(whole.text().get(), "abcdxy");
}

#[test]
fn record_fields_round_trip() {
    let heap = Heap::with_capacity(256).unwrap();
    let first = Record::new_in(&heap).unwrap();
    let second = Record::new_in(&heap).unwrap();
    first.id().set(0xFFFF_FFFF);
    first.flags().set(-3);
    first.label().set("first");
    first.sibling().set(Some(&second)).unwrap();
    second.label().set("second");

    assert_eq!(Record::size(), 19);
    assert_eq!(first.id().get(), u32::MAX);
    assert_eq!(first.flags().get(), -3);
    assert_eq!(first.label().get(), "first");
    let sibling = first.sibling().get().unwrap().unwrap();
    assert_eq!(sibling.label().get(), "second");
    assert!(sibling.sibling().is_null());
}

#[test]
fn reinterpretation_past_arena_end_fails() {
    let heap = Heap::with_capacity(16).unwrap();
    let tail = heap.slice(14, 2).unwrap();
    assert!(Wide::from_view(&tail).is_ok());
    assert!(Whole::from_view(&tail).is_err());
}
