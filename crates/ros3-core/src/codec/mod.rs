// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Pluggable message codecs.
//!
//! A codec turns a typed message into bytes inside a pooled [`Buffer`] and
//! back, guided by the topic's [`TypeDescriptor`]. Codecs are stateless
//! values; the [`Format`] they report is part of a topic binding and travels
//! in every envelope.
//!
//! | Codec | Format | Message bound | Notes |
//! |-------|--------|---------------|-------|
//! | [`CdrCodec`] | `Cdr` | `Serialize + DeserializeOwned` | plain CDR, ROS 2 / DDS wire compatible |
//! | [`JsonCodec`] | `Json` | `Serialize + DeserializeOwned` | human readable, debugging and tooling |
//! | [`ArchiveCodec`] | `Archive` | `bytemuck::Pod` | `#[repr(C)]` bytes, zero-copy views |

pub mod archive;
pub mod cdr;
pub mod json;

pub use archive::ArchiveCodec;
pub use cdr::CdrCodec;
pub use json::JsonCodec;

use crate::core::rt::Buffer;
use crate::error::{Error, Result};
use crate::types::TypeDescriptor;
use std::fmt;

/// Wire format tag carried by envelopes and frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Format {
    Cdr = 0,
    Json = 1,
    Archive = 2,
}

impl Format {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parse a wire tag.
    ///
    /// # Errors
    /// [`Error::DecodeError`] for an unknown tag.
    pub fn from_u8(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(Format::Cdr),
            1 => Ok(Format::Json),
            2 => Ok(Format::Archive),
            other => Err(Error::DecodeError(format!("unknown format tag {}", other))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Format::Cdr => "cdr",
            Format::Json => "json",
            Format::Archive => "archive",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Encoder/decoder for messages of type `M`.
///
/// Contract: `decode(encode(m)) == m` for every valid `m`, and encoding is
/// deterministic.
pub trait Codec<M>: Send + Sync + 'static {
    fn format(&self) -> Format;

    /// Append the encoding of `message` to `out`.
    ///
    /// # Errors
    /// [`Error::EncodeError`] when the message does not fit the schema or the format.
    fn encode(&self, message: &M, schema: &TypeDescriptor, out: &mut Buffer) -> Result<()>;

    /// Decode one message from `bytes`.
    ///
    /// # Errors
    /// [`Error::DecodeError`] on malformed or schema-incompatible input.
    fn decode(&self, bytes: &[u8], schema: &TypeDescriptor) -> Result<M>;
}
