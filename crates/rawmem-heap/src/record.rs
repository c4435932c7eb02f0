//! The [`Struct`] trait and the [`define_struct!`](crate::define_struct)
//! macro that implements it.
//!
//! A struct type is nothing but a frozen [`TypeLayout`] plus a
//! [`MemoryView`]. Every accessor reads or writes the view's bytes
//! directly; no field value is ever held on the Rust side.

use std::sync::Arc;

use rawmem_core::layout::TypeLayout;
use rawmem_core::MemError;

use crate::global::default_heap;
use crate::heap::Heap;
use crate::pointer::PointerCache;
use crate::view::MemoryView;

/// A typed binding of a [`TypeLayout`] to a byte range.
///
/// Implemented by [`define_struct!`](crate::define_struct) for declared
/// types. The provided constructors cover the ways an instance comes into
/// being: fresh heap storage, private scratch storage, or reinterpretation
/// of bytes some other instance already occupies.
pub trait Struct: Sized {
    /// The type's layout, registered on first use.
    fn layout() -> &'static TypeLayout;

    /// Bind an instance to `view` without touching its bytes.
    ///
    /// Accessors panic if `view` is shorter than [`Struct::size`].
    fn bind(view: MemoryView) -> Self;

    /// The instance's view (`bufferOf`).
    fn view(&self) -> &MemoryView;

    /// Resolved pointees of this instance's pointer fields.
    #[doc(hidden)]
    fn pointer_cache(&self) -> &PointerCache;

    /// Size of one instance in bytes.
    fn size() -> u32 {
        Self::layout().size()
    }

    /// A zero-filled instance in the process-wide default heap.
    fn new() -> Result<Self, MemError> {
        Self::new_in(&default_heap())
    }

    /// A zero-filled instance in a fresh block of `heap`.
    fn new_in(heap: &Heap) -> Result<Self, MemError> {
        let view = heap.allocate_aligned(Self::size(), Self::layout().align())?;
        view.fill(0);
        Ok(Self::bind(view))
    }

    /// Allocate from `heap`, with `init` setting field defaults.
    ///
    /// `init` runs against zero-filled scratch storage; the result is
    /// copied into the heap block only once allocation succeeds.
    fn new_in_with<F>(heap: &Heap, init: F) -> Result<Self, MemError>
    where
        F: FnOnce(&Self),
    {
        let scratch = Self::scratch();
        init(&scratch);
        let view = heap.allocate_aligned(Self::size(), Self::layout().align())?;
        view.fill(0);
        view.copy_from(scratch.view());
        Ok(Self::bind(view))
    }

    /// A zero-filled instance over private storage that no heap manages.
    fn scratch() -> Self {
        Self::bind(MemoryView::detached(Self::size()))
    }

    /// Reinterpret the bytes starting at `view` as this type.
    ///
    /// Fails with [`MemError::OutOfBounds`] if the type would extend past
    /// the end of the arena.
    fn from_view(view: &MemoryView) -> Result<Self, MemError> {
        view.reinterpret(Self::size()).map(Self::bind)
    }

    /// Reinterpret another instance's bytes as this type (zero-copy).
    fn from_struct<S: Struct>(other: &S) -> Result<Self, MemError> {
        Self::from_view(other.view())
    }

    /// Arena offset of the instance, if it lives in a heap (`getPointer`).
    fn heap_offset(&self) -> Option<u32> {
        self.view().heap_offset()
    }

    /// The owning heap, if it is still alive (`getHeap`).
    fn heap(&self) -> Option<Arc<Heap>> {
        self.view().heap()
    }
}

/// Declare a struct type mapped onto heap bytes.
///
/// Fields are packed in declaration order with no padding. Each field
/// becomes an accessor method of the same name:
///
/// | Kind | Bytes | Accessor returns |
/// |------|-------|------------------|
/// | `UInt8`, `Int8` | 1 | [`IntField`](crate::field::IntField) |
/// | `UInt16`, `Int16` | 2 | [`IntField`](crate::field::IntField) |
/// | `UInt32`, `Int32` | 4 | [`IntField`](crate::field::IntField) |
/// | `AtomicU32` | 4, 4-aligned | [`IntField`](crate::field::IntField) |
/// | `CString(N)`, `CString(N, Encoding)` | N | [`StrField`](crate::field::StrField) |
/// | `Embedded(Type)` | size of `Type` | `Type`, aliasing the parent's bytes |
/// | `Pointer(Type)` | 4 | [`PtrField`](crate::pointer::PtrField) |
///
/// ```
/// use rawmem_heap::{define_struct, Heap, Struct};
///
/// define_struct! {
///     /// A named counter.
///     pub struct Counter {
///         /// Current count.
///         count: UInt16,
///         /// Display label.
///         label: CString(12),
///     }
/// }
///
/// let heap = Heap::with_capacity(256).unwrap();
/// let counter = Counter::new_in(&heap).unwrap();
/// counter.count().set(7);
/// counter.label().set("visits");
/// assert_eq!(counter.count().get(), 7);
/// assert_eq!(counter.label().get(), "visits");
/// assert_eq!(Counter::size(), 14);
/// ```
#[macro_export]
macro_rules! define_struct {
    (@declare $b:ident, $field:ident, UInt8) => {
        $b.integer(stringify!($field), 1, false);
    };
    (@declare $b:ident, $field:ident, Int8) => {
        $b.integer(stringify!($field), 1, true);
    };
    (@declare $b:ident, $field:ident, UInt16) => {
        $b.integer(stringify!($field), 2, false);
    };
    (@declare $b:ident, $field:ident, Int16) => {
        $b.integer(stringify!($field), 2, true);
    };
    (@declare $b:ident, $field:ident, UInt32) => {
        $b.integer(stringify!($field), 4, false);
    };
    (@declare $b:ident, $field:ident, Int32) => {
        $b.integer(stringify!($field), 4, true);
    };
    (@declare $b:ident, $field:ident, AtomicU32) => {
        $b.atomic_u32(stringify!($field));
    };
    (@declare $b:ident, $field:ident, CString($width:expr, $enc:ident)) => {
        $b.string(stringify!($field), $width, $crate::StringEncoding::$enc);
    };
    (@declare $b:ident, $field:ident, CString($width:expr)) => {
        $b.string(stringify!($field), $width, $crate::StringEncoding::Utf8);
    };
    (@declare $b:ident, $field:ident, Embedded($ty:ty)) => {
        $b.embedded(stringify!($field), <$ty as $crate::Struct>::layout());
    };
    (@declare $b:ident, $field:ident, Pointer($ty:ty)) => {
        $b.pointer(stringify!($field), stringify!($ty));
    };

    (@int [$($attr:tt)*] $field:ident, $int:ty) => {
        $($attr)*
        pub fn $field(&self) -> $crate::field::IntField<'_, $int> {
            $crate::field::IntField::new(
                &self.view,
                <Self as $crate::Struct>::layout().descriptor(stringify!($field)),
            )
        }
    };
    (@access [$($attr:tt)*] $field:ident, UInt8) => {
        $crate::define_struct!(@int [$($attr)*] $field, u8);
    };
    (@access [$($attr:tt)*] $field:ident, Int8) => {
        $crate::define_struct!(@int [$($attr)*] $field, i8);
    };
    (@access [$($attr:tt)*] $field:ident, UInt16) => {
        $crate::define_struct!(@int [$($attr)*] $field, u16);
    };
    (@access [$($attr:tt)*] $field:ident, Int16) => {
        $crate::define_struct!(@int [$($attr)*] $field, i16);
    };
    (@access [$($attr:tt)*] $field:ident, UInt32) => {
        $crate::define_struct!(@int [$($attr)*] $field, u32);
    };
    (@access [$($attr:tt)*] $field:ident, Int32) => {
        $crate::define_struct!(@int [$($attr)*] $field, i32);
    };
    (@access [$($attr:tt)*] $field:ident, AtomicU32) => {
        $crate::define_struct!(@int [$($attr)*] $field, u32);
    };
    (@access [$($attr:tt)*] $field:ident, CString($($args:tt)*)) => {
        $($attr)*
        pub fn $field(&self) -> $crate::field::StrField<'_> {
            $crate::field::StrField::new(
                &self.view,
                <Self as $crate::Struct>::layout().descriptor(stringify!($field)),
            )
        }
    };
    (@access [$($attr:tt)*] $field:ident, Embedded($ty:ty)) => {
        $($attr)*
        pub fn $field(&self) -> $ty {
            let field = <Self as $crate::Struct>::layout().descriptor(stringify!($field));
            <$ty as $crate::Struct>::bind(self.view.sub_view(field.offset, field.size))
        }
    };
    (@access [$($attr:tt)*] $field:ident, Pointer($ty:ty)) => {
        $($attr)*
        pub fn $field(&self) -> $crate::pointer::PtrField<'_, $ty> {
            $crate::pointer::PtrField::new(
                &self.view,
                <Self as $crate::Struct>::pointer_cache(self),
                <Self as $crate::Struct>::layout().descriptor(stringify!($field)),
            )
        }
    };

    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field:ident : $kind:ident $( ( $($args:tt)* ) )?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug)]
        $vis struct $name {
            view: $crate::MemoryView,
            pointers: $crate::pointer::PointerCache,
        }

        impl $crate::Struct for $name {
            fn layout() -> &'static $crate::layout::TypeLayout {
                static LAYOUT: ::std::sync::OnceLock<$crate::layout::TypeLayout> =
                    ::std::sync::OnceLock::new();
                LAYOUT.get_or_init(|| {
                    #[allow(unused_mut)]
                    let mut builder = $crate::layout::LayoutBuilder::new(stringify!($name));
                    $(
                        $crate::define_struct!(@declare builder, $field, $kind $( ( $($args)* ) )?);
                    )*
                    builder.finish()
                })
            }

            fn bind(view: $crate::MemoryView) -> Self {
                Self {
                    view,
                    pointers: ::std::default::Default::default(),
                }
            }

            fn view(&self) -> &$crate::MemoryView {
                &self.view
            }

            fn pointer_cache(&self) -> &$crate::pointer::PointerCache {
                &self.pointers
            }
        }

        impl $name {
            $(
                $crate::define_struct!(
                    @access [$(#[$field_meta])*] $field, $kind $( ( $($args)* ) )?
                );
            )*
        }
    };
}
