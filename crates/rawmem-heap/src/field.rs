//! Typed handles for integer and string fields.

use std::fmt;
use std::marker::PhantomData;

use rawmem_core::codec::{decode_fixed, encode_fixed, wrap_signed, wrap_unsigned};
use rawmem_core::layout::FieldDescriptor;

use crate::view::MemoryView;

/// A Rust integer type a field can be read as.
pub trait Integer: Copy + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// Field width in bytes.
    const BYTES: u32;
    /// Whether the field is two's-complement signed.
    const SIGNED: bool;

    /// Narrow a decoded value that is known to be in range.
    fn from_raw(raw: i64) -> Self;
}

macro_rules! impl_integer {
    ($($ty:ty => $bytes:expr, $signed:expr;)*) => {
        $(
            impl Integer for $ty {
                const BYTES: u32 = $bytes;
                const SIGNED: bool = $signed;

                fn from_raw(raw: i64) -> Self {
                    raw as $ty
                }
            }
        )*
    };
}

impl_integer! {
    u8 => 1, false;
    i8 => 1, true;
    u16 => 2, false;
    i16 => 2, true;
    u32 => 4, false;
    i32 => 4, true;
}

/// Accessor for one integer field of an instance.
pub struct IntField<'a, V> {
    view: &'a MemoryView,
    field: &'static FieldDescriptor,
    _value: PhantomData<V>,
}

impl<'a, V: Integer> IntField<'a, V> {
    /// Bind `field` of the instance viewed by `view`.
    pub fn new(view: &'a MemoryView, field: &'static FieldDescriptor) -> Self {
        debug_assert_eq!(field.size, V::BYTES, "field {} width", field.name);
        Self {
            view,
            field,
            _value: PhantomData,
        }
    }

    /// Current value.
    pub fn get(&self) -> V {
        let raw = if V::SIGNED {
            self.view.read_signed(self.field.offset, V::BYTES)
        } else {
            self.view.read_unsigned(self.field.offset, V::BYTES) as i64
        };
        V::from_raw(raw)
    }

    /// Store `value`, wrapping it into the field's range first.
    pub fn set(&self, value: i64) {
        let raw = if V::SIGNED {
            wrap_signed(value, V::BYTES) as u64
        } else {
            wrap_unsigned(value, V::BYTES)
        };
        self.view.write_le(self.field.offset, raw, V::BYTES);
    }

    /// The field's layout entry.
    pub fn descriptor(&self) -> &'static FieldDescriptor {
        self.field
    }
}

impl<V: Integer> fmt::Debug for IntField<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntField")
            .field("name", &self.field.name)
            .field("value", &self.get())
            .finish()
    }
}

/// Accessor for one fixed-width string field of an instance.
pub struct StrField<'a> {
    view: &'a MemoryView,
    field: &'static FieldDescriptor,
}

impl<'a> StrField<'a> {
    /// Bind `field` of the instance viewed by `view`.
    pub fn new(view: &'a MemoryView, field: &'static FieldDescriptor) -> Self {
        Self { view, field }
    }

    /// Text up to the first terminator, or all N bytes if there is none.
    pub fn get(&self) -> String {
        let mut buf = vec![0; self.field.size as usize];
        self.view.read(self.field.offset, &mut buf);
        decode_fixed(&buf, self.field.encoding().unwrap_or_default())
    }

    /// Encode `text` into the field.
    ///
    /// Text longer than the field is truncated to N bytes. Shorter text is
    /// followed by one terminator; bytes after it keep their old values.
    pub fn set(&self, text: &str) {
        let bytes = encode_fixed(
            text,
            self.field.size,
            self.field.encoding().unwrap_or_default(),
        );
        self.view.write(self.field.offset, &bytes);
    }

    /// Field width in bytes.
    pub fn width(&self) -> u32 {
        self.field.size
    }
}

impl fmt::Debug for StrField<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrField")
            .field("name", &self.field.name)
            .field("value", &self.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::Struct;

    crate::define_struct! {
        struct Numbers {
            u8v: UInt8,
            i8v: Int8,
            u16v: UInt16,
            i16v: Int16,
            u32v: UInt32,
            i32v: Int32,
        }
    }

    crate::define_struct! {
        struct Names {
            first: CString(5),
            second: CString(5),
            latin: CString(4, Latin1),
        }
    }

    #[test]
    fn signed_byte_wraps() {
        let n = Numbers::scratch();
        n.i8v().set(123);
        assert_eq!(n.i8v().get(), 123);
        n.i8v().set(-72);
        assert_eq!(n.i8v().get(), -72);
        n.i8v().set(128);
        assert_eq!(n.i8v().get(), -128);
        n.i8v().set(-129);
        assert_eq!(n.i8v().get(), 126);
    }

    #[test]
    fn unsigned_wraps_modulo_width() {
        let n = Numbers::scratch();
        n.u8v().set(300);
        assert_eq!(n.u8v().get(), 44);
        n.u16v().set(-1);
        assert_eq!(n.u16v().get(), u16::MAX);
        n.u32v().set(u32::MAX as i64 + 2);
        assert_eq!(n.u32v().get(), 1);
    }

    #[test]
    fn wide_fields_do_not_clobber_neighbours() {
        let n = Numbers::scratch();
        n.i16v().set(-2);
        n.i32v().set(i32::MIN as i64);
        n.u8v().set(7);
        assert_eq!(n.i16v().get(), -2);
        assert_eq!(n.i32v().get(), i32::MIN);
        assert_eq!(n.u8v().get(), 7);
        assert_eq!(n.u32v().get(), 0);
    }

    #[test]
    fn string_truncates_at_terminator() {
        let names = Names::scratch();
        names.first().set("hey");
        assert_eq!(names.first().get(), "hey");
        assert_eq!(names.first().width(), 5);
    }

    #[test]
    fn string_spanning_fields_splits_at_boundary() {
        let names = Names::scratch();
        names.second().set("zz");
        // Writing ten bytes through a view of both fields.
        names.view().write(0, b"helloworld");
        assert_eq!(names.first().get(), "hello");
        assert_eq!(names.second().get(), "world");
    }

    #[test]
    fn long_string_fills_field_without_terminator() {
        let names = Names::scratch();
        names.second().set("tail");
        names.first().set("overflowing");
        assert_eq!(names.first().get(), "overf");
        assert_eq!(names.second().get(), "tail");
    }

    #[test]
    fn shorter_write_leaves_later_bytes() {
        let names = Names::scratch();
        names.first().set("abcd");
        names.first().set("x");
        assert_eq!(names.view().to_vec()[..5], *b"x\0cd\0");
        assert_eq!(names.first().get(), "x");
    }

    #[test]
    fn latin1_round_trips_high_code_points() {
        let names = Names::scratch();
        names.latin().set("é€");
        assert_eq!(names.latin().get(), "é?");
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn in_range_values_round_trip(a in any::<i16>(), b in any::<u32>(), c in any::<i8>()) {
                let n = Numbers::scratch();
                n.i16v().set(a as i64);
                n.u32v().set(b as i64);
                n.i8v().set(c as i64);
                prop_assert_eq!(n.i16v().get(), a);
                prop_assert_eq!(n.u32v().get(), b);
                prop_assert_eq!(n.i8v().get(), c);
            }

            #[test]
            fn unsigned_write_is_modular(v in any::<i64>()) {
                let n = Numbers::scratch();
                n.u16v().set(v);
                prop_assert_eq!(n.u16v().get() as i64, v.rem_euclid(1 << 16));
            }
        }
    }
}
