// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Plain CDR codec (ROS 2 / DDS wire format).
//!
//! # Layout
//!
//! ```text
//! +------+------+------+------+------------------------------+-----+
//! | 0x00 | 0x01 | opt  | opt  | body (aligned from byte 4)   | pad |
//! +------+------+------+------+------------------------------+-----+
//!   encapsulation   options      fields in schema order        to 4
//! ```
//!
//! - `00 01` = CDR_LE, `00 00` = CDR_BE; options are written as zero
//! - primitives align to their width (1/2/4/8) relative to the body start
//! - strings: u32 length including NUL, bytes, NUL
//! - sequences: u32 count then elements; arrays: elements only
//! - enums: u32 value
//!
//! `"OK"` encodes to `00 01 00 00 03 00 00 00 4F 4B 00 00`.

mod de;
mod ser;

use super::{Codec, Format};
use crate::core::rt::Buffer;
use crate::core::ser::{SerError, SerResult};
use crate::error::Result;
use crate::types::TypeDescriptor;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Encapsulation identifier for big-endian plain CDR.
pub const CDR_BE: [u8; 2] = [0x00, 0x00];
/// Encapsulation identifier for little-endian plain CDR.
pub const CDR_LE: [u8; 2] = [0x00, 0x01];
/// Encapsulation header size.
pub const HEADER_LEN: usize = 4;

/// Option bits reserved for the padding count.
const OPTION_PADDING_MASK: u16 = 0x0003;

/// Plain CDR codec. Little-endian unless built with [`CdrCodec::big_endian`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CdrCodec {
    big_endian: bool,
}

impl CdrCodec {
    pub const fn new() -> Self {
        Self { big_endian: false }
    }

    pub const fn big_endian() -> Self {
        Self { big_endian: true }
    }

    pub fn is_big_endian(&self) -> bool {
        self.big_endian
    }
}

/// Append header + body for `value` to `out`.
pub fn encode_into<T>(
    value: &T,
    schema: &TypeDescriptor,
    big_endian: bool,
    out: &mut Buffer,
) -> SerResult<()>
where
    T: Serialize + ?Sized,
{
    out.extend_from_slice(if big_endian { &CDR_BE } else { &CDR_LE })?;
    out.extend_from_slice(&[0, 0])?;
    ser::serialize_body(value, schema, out, big_endian)
}

/// Decode a full encapsulated message (byte order read from the header).
pub fn decode_from<'de, T>(bytes: &'de [u8], schema: &TypeDescriptor) -> SerResult<T>
where
    T: Deserialize<'de>,
{
    if bytes.len() < HEADER_LEN {
        return Err(SerError::ReadFailed {
            offset: bytes.len(),
            reason: "truncated encapsulation header".into(),
        });
    }
    let big_endian = match [bytes[0], bytes[1]] {
        CDR_LE => false,
        CDR_BE => true,
        other => {
            return Err(SerError::unsupported(format!(
                "encapsulation id {:02x} {:02x}",
                other[0], other[1]
            )))
        }
    };
    let options = u16::from_be_bytes([bytes[2], bytes[3]]);
    if options & !OPTION_PADDING_MASK != 0 {
        return Err(SerError::invalid(format!(
            "unsupported encapsulation options 0x{:04x}",
            options
        )));
    }
    de::deserialize_body(&bytes[HEADER_LEN..], big_endian, schema)
}

impl<M> Codec<M> for CdrCodec
where
    M: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn format(&self) -> Format {
        Format::Cdr
    }

    fn encode(&self, message: &M, schema: &TypeDescriptor, out: &mut Buffer) -> Result<()> {
        encode_into(message, schema, self.big_endian, out).map_err(SerError::into_encode)
    }

    fn decode(&self, bytes: &[u8], schema: &TypeDescriptor) -> Result<M> {
        decode_from(bytes, schema).map_err(SerError::into_decode)
    }
}
