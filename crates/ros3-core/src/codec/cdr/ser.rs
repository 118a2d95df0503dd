// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema-driven CDR serializer.
//!
//! The Rust value supplies the data and the [`TypeDescriptor`] supplies the
//! layout. Every serde call is checked against the schema node it lands on,
//! so a field out of order or a kind mismatch fails instead of producing
//! bytes another implementation would misread.

use crate::core::rt::Buffer;
use crate::core::ser::{SerError, SerResult};
use crate::types::{FieldDescriptor, PrimitiveKind, TypeDescriptor, TypeKind};
use serde::ser::{self, Impossible, Serialize};

/// Appends CDR primitives to a buffer, aligning relative to `origin`.
pub(super) struct CdrWriter<'b> {
    out: &'b mut Buffer,
    origin: usize,
    big_endian: bool,
}

macro_rules! write_number {
    ($name:ident, $ty:ty) => {
        fn $name(&mut self, value: $ty) -> SerResult<()> {
            self.align(std::mem::size_of::<$ty>())?;
            let bytes = if self.big_endian {
                value.to_be_bytes()
            } else {
                value.to_le_bytes()
            };
            self.out.extend_from_slice(&bytes)
        }
    };
}

impl<'b> CdrWriter<'b> {
    pub(super) fn new(out: &'b mut Buffer, big_endian: bool) -> Self {
        Self {
            origin: out.len(),
            out,
            big_endian,
        }
    }

    pub(super) fn align(&mut self, alignment: usize) -> SerResult<()> {
        let offset = self.out.len() - self.origin;
        let padding = (alignment - offset % alignment) % alignment;
        if padding > 0 {
            self.out.put_zeros(padding)?;
        }
        Ok(())
    }

    fn write_u8(&mut self, value: u8) -> SerResult<()> {
        self.out.extend_from_slice(&[value])
    }

    fn write_i8(&mut self, value: i8) -> SerResult<()> {
        self.write_u8(value as u8)
    }

    write_number!(write_u16, u16);
    write_number!(write_u32, u32);
    write_number!(write_u64, u64);
    write_number!(write_i16, i16);
    write_number!(write_i32, i32);
    write_number!(write_i64, i64);
    write_number!(write_f32, f32);
    write_number!(write_f64, f64);

    fn write_length(&mut self, len: usize) -> SerResult<()> {
        let len = u32::try_from(len).map_err(|_| SerError::invalid("length exceeds u32"))?;
        self.write_u32(len)
    }

    fn write_string(&mut self, value: &str) -> SerResult<()> {
        if value.as_bytes().contains(&0) {
            return Err(SerError::invalid("string contains an interior NUL"));
        }
        self.write_length(value.len() + 1)?;
        self.out.extend_from_slice(value.as_bytes())?;
        self.write_u8(0)
    }
}

/// Encode `value` as a CDR body (no encapsulation header), then pad to 4.
pub(super) fn serialize_body<T>(
    value: &T,
    schema: &TypeDescriptor,
    out: &mut Buffer,
    big_endian: bool,
) -> SerResult<()>
where
    T: Serialize + ?Sized,
{
    let mut writer = CdrWriter::new(out, big_endian);
    value.serialize(ValueSerializer::new(&mut writer, schema))?;
    writer.align(4)
}

fn describe(schema: &TypeDescriptor) -> String {
    let shape = match &schema.kind {
        TypeKind::Primitive(PrimitiveKind::String { .. }) => "string".to_string(),
        TypeKind::Primitive(p) => format!("{:?}", p).to_lowercase(),
        TypeKind::Struct(_) => "struct".to_string(),
        TypeKind::Sequence(_) => "sequence".to_string(),
        TypeKind::Array(arr) => format!("array[{}]", arr.length),
        TypeKind::Enum(_) => "enum".to_string(),
        TypeKind::Nested(inner) => return describe(inner),
    };
    if schema.name.is_empty() {
        shape
    } else {
        format!("{} `{}`", shape, schema.name)
    }
}

struct ValueSerializer<'w, 'b, 's> {
    w: &'w mut CdrWriter<'b>,
    schema: &'s TypeDescriptor,
}

impl<'w, 'b, 's> ValueSerializer<'w, 'b, 's> {
    fn new(w: &'w mut CdrWriter<'b>, schema: &'s TypeDescriptor) -> Self {
        Self {
            w,
            schema: schema.resolve(),
        }
    }

    fn mismatch(&self, rust: &str) -> SerError {
        SerError::schema(format!("{} value for {}", rust, describe(self.schema)))
    }

    fn expect(&self, wanted: PrimitiveKind, rust: &str) -> SerResult<()> {
        match self.schema.kind {
            TypeKind::Primitive(kind) if kind == wanted => Ok(()),
            _ => Err(self.mismatch(rust)),
        }
    }

    fn compound(self, shape: Shape<'s>) -> Compound<'w, 'b, 's> {
        Compound {
            w: self.w,
            shape,
            index: 0,
        }
    }

    fn tuple_shape(&self, len: usize) -> SerResult<Shape<'s>> {
        let schema = self.schema;
        match &schema.kind {
            TypeKind::Array(arr) if arr.length == len => Ok(Shape::Elements {
                element: &arr.element_type,
                len,
            }),
            TypeKind::Struct(fields) if fields.len() == len => Ok(Shape::Fields(fields)),
            _ => Err(self.mismatch(&format!("tuple of {}", len))),
        }
    }
}

macro_rules! serialize_number {
    ($method:ident, $ty:ty, $kind:ident, $write:ident) => {
        fn $method(self, value: $ty) -> SerResult<()> {
            self.expect(PrimitiveKind::$kind, stringify!($ty))?;
            self.w.$write(value)
        }
    };
}

impl<'w, 'b, 's> ser::Serializer for ValueSerializer<'w, 'b, 's> {
    type Ok = ();
    type Error = SerError;
    type SerializeSeq = Compound<'w, 'b, 's>;
    type SerializeTuple = Compound<'w, 'b, 's>;
    type SerializeTupleStruct = Compound<'w, 'b, 's>;
    type SerializeTupleVariant = Impossible<(), SerError>;
    type SerializeMap = Impossible<(), SerError>;
    type SerializeStruct = Compound<'w, 'b, 's>;
    type SerializeStructVariant = Impossible<(), SerError>;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn serialize_bool(self, value: bool) -> SerResult<()> {
        self.expect(PrimitiveKind::Bool, "bool")?;
        self.w.write_u8(u8::from(value))
    }

    serialize_number!(serialize_u8, u8, U8, write_u8);
    serialize_number!(serialize_u16, u16, U16, write_u16);
    serialize_number!(serialize_u32, u32, U32, write_u32);
    serialize_number!(serialize_u64, u64, U64, write_u64);
    serialize_number!(serialize_i8, i8, I8, write_i8);
    serialize_number!(serialize_i16, i16, I16, write_i16);
    serialize_number!(serialize_i32, i32, I32, write_i32);
    serialize_number!(serialize_i64, i64, I64, write_i64);
    serialize_number!(serialize_f32, f32, F32, write_f32);
    serialize_number!(serialize_f64, f64, F64, write_f64);

    fn serialize_char(self, value: char) -> SerResult<()> {
        self.expect(PrimitiveKind::Char, "char")?;
        let byte = u8::try_from(u32::from(value))
            .map_err(|_| SerError::invalid(format!("char {:?} does not fit one byte", value)))?;
        self.w.write_u8(byte)
    }

    fn serialize_str(self, value: &str) -> SerResult<()> {
        match self.schema.kind {
            TypeKind::Primitive(PrimitiveKind::String { max_length }) => {
                if let Some(max) = max_length {
                    if value.len() > max {
                        return Err(SerError::schema(format!(
                            "string of {} bytes exceeds bound {}",
                            value.len(),
                            max
                        )));
                    }
                }
                self.w.write_string(value)
            }
            _ => Err(self.mismatch("string")),
        }
    }

    fn serialize_bytes(self, value: &[u8]) -> SerResult<()> {
        let schema = self.schema;
        match &schema.kind {
            TypeKind::Sequence(seq)
                if seq.element_type.resolve().kind == TypeKind::Primitive(PrimitiveKind::U8) =>
            {
                if let Some(max) = seq.max_length {
                    if value.len() > max {
                        return Err(SerError::schema(format!(
                            "sequence of {} exceeds bound {}",
                            value.len(),
                            max
                        )));
                    }
                }
                self.w.write_length(value.len())?;
                self.w.out.extend_from_slice(value)
            }
            TypeKind::Array(arr)
                if arr.length == value.len()
                    && arr.element_type.resolve().kind
                        == TypeKind::Primitive(PrimitiveKind::U8) =>
            {
                self.w.out.extend_from_slice(value)
            }
            _ => Err(self.mismatch("bytes")),
        }
    }

    fn serialize_none(self) -> SerResult<()> {
        Err(SerError::unsupported("Option (no plain CDR representation)"))
    }

    fn serialize_some<T: ?Sized + Serialize>(self, _value: &T) -> SerResult<()> {
        Err(SerError::unsupported("Option (no plain CDR representation)"))
    }

    fn serialize_unit(self) -> SerResult<()> {
        Err(SerError::unsupported("unit"))
    }

    fn serialize_unit_struct(self, name: &'static str) -> SerResult<()> {
        match &self.schema.kind {
            TypeKind::Struct(fields) if fields.is_empty() => Ok(()),
            _ => Err(self.mismatch(name)),
        }
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> SerResult<()> {
        let schema = self.schema;
        match &schema.kind {
            TypeKind::Enum(desc) => {
                let value = desc.variant(variant).map(|v| v.value).ok_or_else(|| {
                    SerError::schema(format!(
                        "variant `{}::{}` missing from {}",
                        name,
                        variant,
                        describe(schema)
                    ))
                })?;
                self.w.write_u32(value)
            }
            _ => Err(self.mismatch(name)),
        }
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> SerResult<()> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _value: &T,
    ) -> SerResult<()> {
        Err(SerError::unsupported(format!(
            "enum variant with data `{}::{}`",
            name, variant
        )))
    }

    fn serialize_seq(self, len: Option<usize>) -> SerResult<Self::SerializeSeq> {
        let len = len.ok_or_else(|| SerError::unsupported("sequence of unknown length"))?;
        let schema = self.schema;
        match &schema.kind {
            TypeKind::Sequence(seq) => {
                if let Some(max) = seq.max_length {
                    if len > max {
                        return Err(SerError::schema(format!(
                            "sequence of {} exceeds bound {}",
                            len, max
                        )));
                    }
                }
                self.w.write_length(len)?;
                Ok(self.compound(Shape::Elements {
                    element: &seq.element_type,
                    len,
                }))
            }
            TypeKind::Array(arr) if arr.length == len => Ok(self.compound(Shape::Elements {
                element: &arr.element_type,
                len,
            })),
            _ => Err(self.mismatch(&format!("sequence of {}", len))),
        }
    }

    fn serialize_tuple(self, len: usize) -> SerResult<Self::SerializeTuple> {
        let shape = self.tuple_shape(len)?;
        Ok(self.compound(shape))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> SerResult<Self::SerializeTupleStruct> {
        let shape = self.tuple_shape(len)?;
        Ok(self.compound(shape))
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> SerResult<Self::SerializeTupleVariant> {
        Err(SerError::unsupported(format!(
            "enum variant with data `{}::{}`",
            name, variant
        )))
    }

    fn serialize_map(self, _len: Option<usize>) -> SerResult<Self::SerializeMap> {
        Err(SerError::unsupported("map"))
    }

    fn serialize_struct(self, name: &'static str, _len: usize) -> SerResult<Self::SerializeStruct> {
        let schema = self.schema;
        match &schema.kind {
            TypeKind::Struct(fields) => Ok(self.compound(Shape::Fields(fields))),
            _ => Err(self.mismatch(name)),
        }
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> SerResult<Self::SerializeStructVariant> {
        Err(SerError::unsupported(format!(
            "enum variant with data `{}::{}`",
            name, variant
        )))
    }
}

#[derive(Clone, Copy)]
enum Shape<'s> {
    Elements {
        element: &'s TypeDescriptor,
        len: usize,
    },
    Fields(&'s [FieldDescriptor]),
}

struct Compound<'w, 'b, 's> {
    w: &'w mut CdrWriter<'b>,
    shape: Shape<'s>,
    index: usize,
}

impl<'w, 'b, 's> Compound<'w, 'b, 's> {
    fn element<T: ?Sized + Serialize>(&mut self, value: &T) -> SerResult<()> {
        let schema: &'s TypeDescriptor = match self.shape {
            Shape::Elements { element, len } => {
                if self.index >= len {
                    return Err(SerError::schema(format!("more than {} elements", len)));
                }
                element
            }
            Shape::Fields(fields) => match fields.get(self.index) {
                Some(field) => &field.type_desc,
                None => {
                    return Err(SerError::schema(format!(
                        "struct declares only {} fields",
                        fields.len()
                    )))
                }
            },
        };
        self.index += 1;
        value.serialize(ValueSerializer::new(&mut *self.w, schema))
    }

    fn field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> SerResult<()> {
        if let Shape::Fields(fields) = self.shape {
            match fields.get(self.index) {
                Some(field) if field.name == key => {}
                Some(field) => {
                    return Err(SerError::schema(format!(
                        "field `{}` out of order, schema expects `{}`",
                        key, field.name
                    )))
                }
                None => return Err(SerError::schema(format!("unexpected field `{}`", key))),
            }
        }
        self.element(value)
    }

    fn finish(self) -> SerResult<()> {
        let expected = match self.shape {
            Shape::Elements { len, .. } => len,
            Shape::Fields(fields) => fields.len(),
        };
        if self.index != expected {
            return Err(SerError::schema(format!(
                "wrote {} of {} members",
                self.index, expected
            )));
        }
        Ok(())
    }
}

impl ser::SerializeSeq for Compound<'_, '_, '_> {
    type Ok = ();
    type Error = SerError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> SerResult<()> {
        self.element(value)
    }

    fn end(self) -> SerResult<()> {
        self.finish()
    }
}

impl ser::SerializeTuple for Compound<'_, '_, '_> {
    type Ok = ();
    type Error = SerError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> SerResult<()> {
        self.element(value)
    }

    fn end(self) -> SerResult<()> {
        self.finish()
    }
}

impl ser::SerializeTupleStruct for Compound<'_, '_, '_> {
    type Ok = ();
    type Error = SerError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> SerResult<()> {
        self.element(value)
    }

    fn end(self) -> SerResult<()> {
        self.finish()
    }
}

impl ser::SerializeStruct for Compound<'_, '_, '_> {
    type Ok = ();
    type Error = SerError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> SerResult<()> {
        self.field(key, value)
    }

    fn skip_field(&mut self, key: &'static str) -> SerResult<()> {
        Err(SerError::unsupported(format!("skipped field `{}`", key)))
    }

    fn end(self) -> SerResult<()> {
        self.finish()
    }
}
