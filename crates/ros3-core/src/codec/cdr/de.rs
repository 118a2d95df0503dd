// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema-driven CDR deserializer.
//!
//! CDR is not self-describing, so `deserialize_any` dispatches on the schema
//! node instead of the bytes. Structs are presented as maps keyed by field
//! name, which lets derived impls match fields by name and skip schema fields
//! they do not declare.

use crate::core::ser::{Cursor, SerError, SerResult};
use crate::types::{FieldDescriptor, PrimitiveKind, TypeDescriptor, TypeKind};
use serde::de::value::StrDeserializer;
use serde::de::{self, DeserializeSeed, IntoDeserializer, Visitor};
use serde::forward_to_deserialize_any;

/// Decode one CDR body (header already stripped). Up to 3 trailing padding
/// bytes are accepted.
pub(super) fn deserialize_body<'de, T>(
    body: &'de [u8],
    big_endian: bool,
    schema: &TypeDescriptor,
) -> SerResult<T>
where
    T: de::Deserialize<'de>,
{
    let mut cursor = Cursor::with_byte_order(body, big_endian);
    let value = T::deserialize(ValueDeserializer::new(&mut cursor, schema))?;
    if cursor.remaining() > 3 {
        return Err(SerError::invalid(format!(
            "{} trailing bytes after message",
            cursor.remaining()
        )));
    }
    Ok(value)
}

fn is_octet(schema: &TypeDescriptor) -> bool {
    schema.resolve().kind == TypeKind::Primitive(PrimitiveKind::U8)
}

struct ValueDeserializer<'r, 'de, 's> {
    r: &'r mut Cursor<'de>,
    schema: &'s TypeDescriptor,
}

impl<'r, 'de, 's> ValueDeserializer<'r, 'de, 's> {
    fn new(r: &'r mut Cursor<'de>, schema: &'s TypeDescriptor) -> Self {
        Self {
            r,
            schema: schema.resolve(),
        }
    }

    fn read_string(&mut self, max_length: Option<usize>) -> SerResult<&'de str> {
        self.r.align(4)?;
        let len = self.r.read_u32()? as usize;
        if len == 0 {
            return Err(SerError::invalid("string length 0 leaves no NUL terminator"));
        }
        if len > self.r.remaining() {
            return Err(SerError::invalid(format!(
                "string length {} exceeds remaining {} bytes",
                len,
                self.r.remaining()
            )));
        }
        let bytes = self.r.read_bytes(len)?;
        let (text, terminator) = bytes.split_at(len - 1);
        if terminator != [0] {
            return Err(SerError::invalid("string missing NUL terminator"));
        }
        if let Some(max) = max_length {
            if text.len() > max {
                return Err(SerError::invalid(format!(
                    "string of {} bytes exceeds bound {}",
                    text.len(),
                    max
                )));
            }
        }
        std::str::from_utf8(text)
            .map_err(|e| SerError::invalid(format!("invalid UTF-8 in string: {}", e)))
    }

    fn read_count(&mut self, element: &TypeDescriptor, max_length: Option<usize>) -> SerResult<usize> {
        self.r.align(4)?;
        let count = self.r.read_u32()? as usize;
        if let Some(max) = max_length {
            if count > max {
                return Err(SerError::invalid(format!(
                    "sequence length {} exceeds bound {}",
                    count, max
                )));
            }
        }
        let min = element.min_size();
        if min > 0 && count.saturating_mul(min) > self.r.remaining() {
            return Err(SerError::invalid(format!(
                "sequence length {} exceeds remaining {} bytes",
                count,
                self.r.remaining()
            )));
        }
        Ok(count)
    }

    fn read_enum(&mut self) -> SerResult<&'s str> {
        let schema = self.schema;
        let TypeKind::Enum(desc) = &schema.kind else {
            return Err(SerError::schema(format!("`{}` is not an enum", schema.name)));
        };
        self.r.align(4)?;
        let value = self.r.read_u32()?;
        desc.variant_by_value(value)
            .map(|v| v.name.as_str())
            .ok_or_else(|| {
                SerError::invalid(format!("unknown value {} for enum `{}`", value, schema.name))
            })
    }

    fn primitive<V: Visitor<'de>>(mut self, kind: PrimitiveKind, visitor: V) -> SerResult<V::Value> {
        match kind {
            PrimitiveKind::Bool => match self.r.read_u8()? {
                0 => visitor.visit_bool(false),
                1 => visitor.visit_bool(true),
                other => Err(SerError::invalid(format!("invalid bool byte 0x{:02x}", other))),
            },
            PrimitiveKind::U8 => visitor.visit_u8(self.r.read_u8()?),
            PrimitiveKind::I8 => visitor.visit_i8(self.r.read_i8()?),
            PrimitiveKind::Char => visitor.visit_char(char::from(self.r.read_u8()?)),
            PrimitiveKind::U16 => {
                self.r.align(2)?;
                visitor.visit_u16(self.r.read_u16()?)
            }
            PrimitiveKind::I16 => {
                self.r.align(2)?;
                visitor.visit_i16(self.r.read_i16()?)
            }
            PrimitiveKind::U32 => {
                self.r.align(4)?;
                visitor.visit_u32(self.r.read_u32()?)
            }
            PrimitiveKind::I32 => {
                self.r.align(4)?;
                visitor.visit_i32(self.r.read_i32()?)
            }
            PrimitiveKind::F32 => {
                self.r.align(4)?;
                visitor.visit_f32(self.r.read_f32()?)
            }
            PrimitiveKind::U64 => {
                self.r.align(8)?;
                visitor.visit_u64(self.r.read_u64()?)
            }
            PrimitiveKind::I64 => {
                self.r.align(8)?;
                visitor.visit_i64(self.r.read_i64()?)
            }
            PrimitiveKind::F64 => {
                self.r.align(8)?;
                visitor.visit_f64(self.r.read_f64()?)
            }
            PrimitiveKind::String { max_length } => {
                visitor.visit_borrowed_str(self.read_string(max_length)?)
            }
        }
    }
}

impl<'de> de::Deserializer<'de> for ValueDeserializer<'_, 'de, '_> {
    type Error = SerError;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn deserialize_any<V: Visitor<'de>>(mut self, visitor: V) -> SerResult<V::Value> {
        let schema = self.schema;
        match &schema.kind {
            TypeKind::Primitive(kind) => self.primitive(*kind, visitor),
            TypeKind::Struct(fields) => visitor.visit_map(FieldMap {
                r: self.r,
                fields,
                index: 0,
            }),
            TypeKind::Sequence(seq) => {
                let count = self.read_count(&seq.element_type, seq.max_length)?;
                visitor.visit_seq(Elements {
                    r: self.r,
                    element: &seq.element_type,
                    remaining: count,
                })
            }
            TypeKind::Array(arr) => visitor.visit_seq(Elements {
                r: self.r,
                element: &arr.element_type,
                remaining: arr.length,
            }),
            TypeKind::Enum(_) => visitor.visit_str(self.read_enum()?),
            TypeKind::Nested(inner) => ValueDeserializer::new(self.r, inner).deserialize_any(visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, _visitor: V) -> SerResult<V::Value> {
        Err(SerError::unsupported("Option (no plain CDR representation)"))
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> SerResult<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        mut self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> SerResult<V::Value> {
        if !matches!(self.schema.kind, TypeKind::Enum(_)) {
            return self.deserialize_any(visitor);
        }
        let variant: StrDeserializer<'_, SerError> = self.read_enum()?.into_deserializer();
        visitor.visit_enum(variant)
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, len: usize, visitor: V) -> SerResult<V::Value> {
        let schema = self.schema;
        match &schema.kind {
            TypeKind::Struct(fields) if fields.len() == len => visitor.visit_seq(FieldSeq {
                r: self.r,
                fields,
                index: 0,
            }),
            TypeKind::Struct(fields) => Err(SerError::schema(format!(
                "tuple of {} for struct `{}` with {} fields",
                len,
                schema.name,
                fields.len()
            ))),
            TypeKind::Array(arr) if arr.length != len => Err(SerError::schema(format!(
                "tuple of {} for array of {}",
                len, arr.length
            ))),
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        len: usize,
        visitor: V,
    ) -> SerResult<V::Value> {
        self.deserialize_tuple(len, visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(mut self, visitor: V) -> SerResult<V::Value> {
        let schema = self.schema;
        match &schema.kind {
            TypeKind::Sequence(seq) if is_octet(&seq.element_type) => {
                let count = self.read_count(&seq.element_type, seq.max_length)?;
                visitor.visit_borrowed_bytes(self.r.read_bytes(count)?)
            }
            TypeKind::Array(arr) if is_octet(&arr.element_type) => {
                visitor.visit_borrowed_bytes(self.r.read_bytes(arr.length)?)
            }
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> SerResult<V::Value> {
        self.deserialize_bytes(visitor)
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        unit unit_struct seq map struct identifier ignored_any
    }
}

/// Repeated elements of one schema (sequences, arrays).
struct Elements<'r, 'de, 's> {
    r: &'r mut Cursor<'de>,
    element: &'s TypeDescriptor,
    remaining: usize,
}

impl<'de> de::SeqAccess<'de> for Elements<'_, 'de, '_> {
    type Error = SerError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> SerResult<Option<T::Value>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        seed.deserialize(ValueDeserializer::new(&mut *self.r, self.element))
            .map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining)
    }
}

/// Struct fields presented positionally (tuple targets).
struct FieldSeq<'r, 'de, 's> {
    r: &'r mut Cursor<'de>,
    fields: &'s [FieldDescriptor],
    index: usize,
}

impl<'de> de::SeqAccess<'de> for FieldSeq<'_, 'de, '_> {
    type Error = SerError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> SerResult<Option<T::Value>> {
        let Some(field) = self.fields.get(self.index) else {
            return Ok(None);
        };
        self.index += 1;
        seed.deserialize(ValueDeserializer::new(&mut *self.r, &field.type_desc))
            .map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.fields.len() - self.index)
    }
}

/// Struct fields presented as a map keyed by field name.
struct FieldMap<'r, 'de, 's> {
    r: &'r mut Cursor<'de>,
    fields: &'s [FieldDescriptor],
    index: usize,
}

impl<'de> de::MapAccess<'de> for FieldMap<'_, 'de, '_> {
    type Error = SerError;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> SerResult<Option<K::Value>> {
        match self.fields.get(self.index) {
            Some(field) => {
                let key: StrDeserializer<'_, SerError> = field.name.as_str().into_deserializer();
                seed.deserialize(key).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> SerResult<V::Value> {
        let field = self
            .fields
            .get(self.index)
            .ok_or_else(|| SerError::invalid("value requested past the last field"))?;
        self.index += 1;
        seed.deserialize(ValueDeserializer::new(&mut *self.r, &field.type_desc))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.fields.len() - self.index)
    }
}
