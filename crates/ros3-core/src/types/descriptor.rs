// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type descriptors: the runtime schema attached to every topic.

use std::sync::Arc;

const FNV1A_OFFSET_BASIS_64: u64 = 0xcbf2_9ce4_8422_2325;
const FNV1A_PRIME_64: u64 = 0x0000_0100_0000_01b3;

/// Primitive type kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    /// Single byte character.
    Char,
    /// UTF-8 string, optionally bounded (in bytes, terminator excluded).
    String { max_length: Option<usize> },
}

impl PrimitiveKind {
    /// Size in bytes (None for strings).
    pub fn size(&self) -> Option<usize> {
        match self {
            Self::Bool | Self::U8 | Self::I8 | Self::Char => Some(1),
            Self::U16 | Self::I16 => Some(2),
            Self::U32 | Self::I32 | Self::F32 => Some(4),
            Self::U64 | Self::I64 | Self::F64 => Some(8),
            Self::String { .. } => None,
        }
    }

    /// CDR alignment requirement.
    pub fn alignment(&self) -> usize {
        match self {
            Self::Bool | Self::U8 | Self::I8 | Self::Char => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 | Self::String { .. } => 4,
            Self::U64 | Self::I64 | Self::F64 => 8,
        }
    }

    fn tag(&self) -> u8 {
        match self {
            Self::Bool => 1,
            Self::U8 => 2,
            Self::U16 => 3,
            Self::U32 => 4,
            Self::U64 => 5,
            Self::I8 => 6,
            Self::I16 => 7,
            Self::I32 => 8,
            Self::I64 => 9,
            Self::F32 => 10,
            Self::F64 => 11,
            Self::Char => 12,
            Self::String { .. } => 13,
        }
    }
}

/// Type kind enumeration.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    /// Primitive type.
    Primitive(PrimitiveKind),
    /// Struct with named fields, encoded in declaration order.
    Struct(Vec<FieldDescriptor>),
    /// Sequence (dynamic length).
    Sequence(SequenceDescriptor),
    /// Array (fixed length).
    Array(ArrayDescriptor),
    /// Enumeration (encoded as u32).
    Enum(EnumDescriptor),
    /// Reference to another named type.
    Nested(Arc<TypeDescriptor>),
}

/// A complete type descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    /// Type name (fully qualified for top-level message types).
    pub name: String,
    /// Type kind.
    pub kind: TypeKind,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn primitive(name: impl Into<String>, kind: PrimitiveKind) -> Self {
        Self::new(name, TypeKind::Primitive(kind))
    }

    pub fn struct_type(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self::new(name, TypeKind::Struct(fields))
    }

    /// Anonymous unbounded sequence of `element`.
    pub fn sequence_of(element: Arc<TypeDescriptor>) -> Self {
        Self::new("", TypeKind::Sequence(SequenceDescriptor::unbounded(element)))
    }

    /// Anonymous fixed-length array of `element`.
    pub fn array_of(element: Arc<TypeDescriptor>, length: usize) -> Self {
        Self::new("", TypeKind::Array(ArrayDescriptor::new(element, length)))
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, TypeKind::Primitive(_))
    }

    pub fn is_struct(&self) -> bool {
        matches!(self.resolve().kind, TypeKind::Struct(_))
    }

    /// Follow `Nested` references to the defining descriptor.
    pub fn resolve(&self) -> &TypeDescriptor {
        let mut current = self;
        while let TypeKind::Nested(inner) = &current.kind {
            current = inner;
        }
        current
    }

    /// Fields if this is a struct.
    pub fn fields(&self) -> Option<&[FieldDescriptor]> {
        match &self.resolve().kind {
            TypeKind::Struct(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields()?.iter().find(|f| f.name == name)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields()?.iter().position(|f| f.name == name)
    }

    /// Minimum CDR size (strings and sequences counted as their length prefix).
    pub fn min_size(&self) -> usize {
        match &self.kind {
            TypeKind::Primitive(p) => p.size().unwrap_or(4),
            TypeKind::Struct(fields) => {
                let mut size = 0;
                for field in fields {
                    let align = field.type_desc.alignment();
                    size = (size + align - 1) & !(align - 1);
                    size += field.type_desc.min_size();
                }
                size
            }
            TypeKind::Sequence(_) => 4,
            TypeKind::Array(arr) => arr.element_type.min_size() * arr.length,
            TypeKind::Enum(_) => 4,
            TypeKind::Nested(inner) => inner.min_size(),
        }
    }

    /// CDR alignment requirement.
    pub fn alignment(&self) -> usize {
        match &self.kind {
            TypeKind::Primitive(p) => p.alignment(),
            TypeKind::Struct(fields) => fields
                .iter()
                .map(|f| f.type_desc.alignment())
                .max()
                .unwrap_or(1),
            TypeKind::Sequence(seq) => seq.element_type.alignment().max(4),
            TypeKind::Array(arr) => arr.element_type.alignment(),
            TypeKind::Enum(_) => 4,
            TypeKind::Nested(inner) => inner.alignment(),
        }
    }

    /// Size of the `#[repr(C)]` in-memory layout, or `None` when the type has
    /// variable-length members (strings, sequences).
    pub fn native_size(&self) -> Option<usize> {
        match &self.kind {
            TypeKind::Primitive(p) => p.size(),
            TypeKind::Struct(fields) => {
                let mut size = 0usize;
                let mut max_align = 1usize;
                for field in fields {
                    let align = field.type_desc.native_alignment()?;
                    max_align = max_align.max(align);
                    size = (size + align - 1) & !(align - 1);
                    size += field.type_desc.native_size()?;
                }
                Some((size + max_align - 1) & !(max_align - 1))
            }
            TypeKind::Sequence(_) => None,
            TypeKind::Array(arr) => arr
                .element_type
                .native_size()
                .and_then(|s| s.checked_mul(arr.length)),
            TypeKind::Enum(_) => Some(4),
            TypeKind::Nested(inner) => inner.native_size(),
        }
    }

    fn native_alignment(&self) -> Option<usize> {
        match &self.kind {
            TypeKind::Primitive(p) => p.size(),
            TypeKind::Struct(fields) => fields.iter().try_fold(1usize, |acc, f| {
                f.type_desc.native_alignment().map(|a| acc.max(a))
            }),
            TypeKind::Sequence(_) => None,
            TypeKind::Array(arr) => arr.element_type.native_alignment(),
            TypeKind::Enum(_) => Some(4),
            TypeKind::Nested(inner) => inner.native_alignment(),
        }
    }

    /// Structural 64-bit identity (FNV-1a over the canonical schema walk).
    ///
    /// Two descriptors hash equal iff they have the same top-level name and
    /// the same shape: field names and order, element kinds, bounds, lengths
    /// and enum values.
    pub fn type_hash(&self) -> u64 {
        let mut hasher = SchemaHasher::new();
        hasher.descriptor(self);
        hasher.finish()
    }
}

struct SchemaHasher(u64);

impl SchemaHasher {
    fn new() -> Self {
        Self(FNV1A_OFFSET_BASIS_64)
    }

    fn bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.0 ^= u64::from(byte);
            self.0 = self.0.wrapping_mul(FNV1A_PRIME_64);
        }
    }

    fn str(&mut self, s: &str) {
        self.bytes(&(s.len() as u32).to_le_bytes());
        self.bytes(s.as_bytes());
    }

    fn bound(&mut self, bound: Option<usize>) {
        self.bytes(&(bound.map_or(u64::MAX, |b| b as u64)).to_le_bytes());
    }

    fn descriptor(&mut self, desc: &TypeDescriptor) {
        self.str(&desc.name);
        match &desc.kind {
            TypeKind::Primitive(p) => {
                self.bytes(&[b'P', p.tag()]);
                if let PrimitiveKind::String { max_length } = p {
                    self.bound(*max_length);
                }
            }
            TypeKind::Struct(fields) => {
                self.bytes(&[b'S']);
                self.bytes(&(fields.len() as u32).to_le_bytes());
                for field in fields {
                    self.str(&field.name);
                    self.descriptor(&field.type_desc);
                }
            }
            TypeKind::Sequence(seq) => {
                self.bytes(&[b'Q']);
                self.bound(seq.max_length);
                self.descriptor(&seq.element_type);
            }
            TypeKind::Array(arr) => {
                self.bytes(&[b'A']);
                self.bytes(&(arr.length as u64).to_le_bytes());
                self.descriptor(&arr.element_type);
            }
            TypeKind::Enum(e) => {
                self.bytes(&[b'E']);
                for variant in &e.variants {
                    self.str(&variant.name);
                    self.bytes(&variant.value.to_le_bytes());
                }
            }
            TypeKind::Nested(inner) => {
                self.bytes(&[b'N']);
                self.descriptor(inner);
            }
        }
    }

    fn finish(self) -> u64 {
        self.0
    }
}

/// Field descriptor for struct members.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub type_desc: Arc<TypeDescriptor>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, type_desc: Arc<TypeDescriptor>) -> Self {
        Self {
            name: name.into(),
            type_desc,
        }
    }
}

/// Sequence type descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceDescriptor {
    pub element_type: Arc<TypeDescriptor>,
    /// Maximum length (None = unbounded).
    pub max_length: Option<usize>,
}

impl SequenceDescriptor {
    pub fn unbounded(element_type: Arc<TypeDescriptor>) -> Self {
        Self {
            element_type,
            max_length: None,
        }
    }

    pub fn bounded(element_type: Arc<TypeDescriptor>, max_length: usize) -> Self {
        Self {
            element_type,
            max_length: Some(max_length),
        }
    }
}

/// Array type descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayDescriptor {
    pub element_type: Arc<TypeDescriptor>,
    pub length: usize,
}

impl ArrayDescriptor {
    pub fn new(element_type: Arc<TypeDescriptor>, length: usize) -> Self {
        Self {
            element_type,
            length,
        }
    }
}

/// Enumeration type descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDescriptor {
    pub variants: Vec<EnumVariant>,
}

impl EnumDescriptor {
    pub fn new(variants: Vec<EnumVariant>) -> Self {
        Self { variants }
    }

    pub fn variant(&self, name: &str) -> Option<&EnumVariant> {
        self.variants.iter().find(|v| v.name == name)
    }

    pub fn variant_by_value(&self, value: u32) -> Option<&EnumVariant> {
        self.variants.iter().find(|v| v.value == value)
    }
}

/// Enum variant.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumVariant {
    pub name: String,
    pub value: u32,
}

impl EnumVariant {
    pub fn new(name: impl Into<String>, value: u32) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}
