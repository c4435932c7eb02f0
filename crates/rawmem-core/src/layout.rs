//! Type layouts: the registration-time schema of a struct's binary shape.
//!
//! A [`LayoutBuilder`] appends one [`FieldDescriptor`] per declared field,
//! packing fields back to back with no padding. [`LayoutBuilder::finish`]
//! freezes the result into a [`TypeLayout`], which is then shared by every
//! instance of the type.

use indexmap::IndexMap;

use crate::codec::{StringEncoding, MAX_INT_BYTES};

/// Width of a pointer cell in bytes.
pub const POINTER_SIZE: u32 = 4;

/// Width and alignment of an atomic cell in bytes.
pub const ATOMIC_CELL_SIZE: u32 = 4;

/// What a field stores and how its bytes are interpreted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// Little-endian integer of the descriptor's `size`.
    Integer {
        /// Whether the value is two's-complement signed.
        signed: bool,
        /// Whether the cell is used with atomic operations (4-byte aligned).
        atomic: bool,
    },
    /// Fixed-width text, truncated at the first terminator on read.
    FixedString {
        /// Text encoding.
        encoding: StringEncoding,
    },
    /// Another struct laid out inline.
    Embedded {
        /// Name of the embedded type.
        type_name: &'static str,
    },
    /// A 4-byte arena offset referring to another struct.
    Pointer {
        /// Name of the pointee type.
        target: &'static str,
    },
}

/// One field of a [`TypeLayout`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Declared field name.
    pub name: &'static str,
    /// Byte offset from the start of the struct.
    pub offset: u32,
    /// Number of bytes the field occupies.
    pub size: u32,
    /// Arena alignment this field needs (1 for everything but atomic cells
    /// and structs that contain them).
    pub align: u32,
    /// Interpretation of the bytes.
    pub kind: FieldKind,
}

impl FieldDescriptor {
    /// One past the last byte of the field.
    pub fn end(&self) -> u32 {
        self.offset + self.size
    }

    /// Whether this is a signed integer field.
    pub fn is_signed(&self) -> bool {
        matches!(self.kind, FieldKind::Integer { signed: true, .. })
    }

    /// Encoding of a string field, `None` for any other kind.
    pub fn encoding(&self) -> Option<StringEncoding> {
        match self.kind {
            FieldKind::FixedString { encoding } => Some(encoding),
            _ => None,
        }
    }
}

/// Frozen binary layout of one struct type.
#[derive(Clone, Debug)]
pub struct TypeLayout {
    name: &'static str,
    fields: IndexMap<&'static str, FieldDescriptor>,
    size: u32,
    align: u32,
}

impl TypeLayout {
    /// Type name the layout was registered under.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Total size in bytes.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Required arena alignment of an instance's first byte.
    pub fn align(&self) -> u32 {
        self.align
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the type declares no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in declaration (and therefore byte) order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.values()
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    /// Look up a field that is known to exist.
    ///
    /// # Panics
    ///
    /// Panics if the type has no field called `name`. Generated accessors
    /// only ask for fields they declared.
    pub fn descriptor(&self, name: &str) -> &FieldDescriptor {
        match self.fields.get(name) {
            Some(field) => field,
            None => panic!("type {} has no field {name}", self.name),
        }
    }
}

/// Accumulates field declarations for one type.
#[derive(Debug)]
pub struct LayoutBuilder {
    name: &'static str,
    fields: IndexMap<&'static str, FieldDescriptor>,
    size: u32,
    align: u32,
}

impl LayoutBuilder {
    /// Start an empty layout for the type `name`.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fields: IndexMap::new(),
            size: 0,
            align: 1,
        }
    }

    /// Declare an integer field of `bytes` width (1, 2 or 4).
    ///
    /// # Panics
    ///
    /// Panics on any other width.
    pub fn integer(&mut self, name: &'static str, bytes: u32, signed: bool) -> &mut Self {
        assert!(
            matches!(bytes, 1 | 2 | 4) && bytes as usize <= MAX_INT_BYTES,
            "integer field {name} must be 1, 2 or 4 bytes wide, got {bytes}"
        );
        self.push(
            name,
            bytes,
            1,
            FieldKind::Integer {
                signed,
                atomic: false,
            },
        )
    }

    /// Declare an unsigned 4-byte cell usable with atomic operations.
    ///
    /// # Panics
    ///
    /// Panics if the cell would not start on a 4-byte boundary.
    pub fn atomic_u32(&mut self, name: &'static str) -> &mut Self {
        self.push(
            name,
            ATOMIC_CELL_SIZE,
            ATOMIC_CELL_SIZE,
            FieldKind::Integer {
                signed: false,
                atomic: true,
            },
        )
    }

    /// Declare a fixed-width string field of `width` bytes.
    pub fn string(&mut self, name: &'static str, width: u32, encoding: StringEncoding) -> &mut Self {
        self.push(name, width, 1, FieldKind::FixedString { encoding })
    }

    /// Declare an inline copy of another type.
    ///
    /// # Panics
    ///
    /// Panics if `nested` needs an alignment the current offset cannot give.
    pub fn embedded(&mut self, name: &'static str, nested: &TypeLayout) -> &mut Self {
        self.push(
            name,
            nested.size(),
            nested.align(),
            FieldKind::Embedded {
                type_name: nested.name(),
            },
        )
    }

    /// Declare a pointer cell referring to the type named `target`.
    ///
    /// Only the target's name is recorded; its layout is consulted at
    /// dereference time, so a type may point to itself.
    pub fn pointer(&mut self, name: &'static str, target: &'static str) -> &mut Self {
        self.push(name, POINTER_SIZE, 1, FieldKind::Pointer { target })
    }

    /// Freeze the declarations into a [`TypeLayout`].
    pub fn finish(self) -> TypeLayout {
        TypeLayout {
            name: self.name,
            fields: self.fields,
            size: self.size,
            align: self.align,
        }
    }

    fn push(&mut self, name: &'static str, size: u32, align: u32, kind: FieldKind) -> &mut Self {
        assert!(
            !self.fields.contains_key(name),
            "duplicate field {name} in type {}",
            self.name
        );
        assert!(
            self.size % align == 0,
            "field {name} of type {} needs {align}-byte alignment but sits at offset {}",
            self.name,
            self.size
        );
        let offset = self.size;
        self.size = offset
            .checked_add(size)
            .unwrap_or_else(|| panic!("type {} exceeds u32::MAX bytes", self.name));
        self.align = self.align.max(align);
        self.fields.insert(
            name,
            FieldDescriptor {
                name,
                offset,
                size,
                align,
                kind,
            },
        );
        self
    }
}
