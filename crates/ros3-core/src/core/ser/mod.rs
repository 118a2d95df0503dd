// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Byte-level serialization helpers shared by the codecs and the envelope frame.

pub mod cursor;

pub use cursor::{Cursor, CursorMut};

use crate::error::Error;
use std::fmt;

/// Serialization error used within the codec layer.
///
/// Implements the serde error traits so it can flow through derived
/// `Serialize`/`Deserialize` impls; mapped to [`Error::EncodeError`] or
/// [`Error::DecodeError`] at the codec boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerError {
    WriteFailed { offset: usize, reason: String },
    ReadFailed { offset: usize, reason: String },
    InvalidData { reason: String },
    /// Value does not match the schema it is encoded/decoded against.
    SchemaMismatch { reason: String },
    /// Rust shape with no wire representation (maps, options, ...).
    Unsupported { what: String },
    /// Message raised by a serde impl.
    Custom(String),
}

impl SerError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        SerError::InvalidData {
            reason: reason.into(),
        }
    }

    pub fn schema(reason: impl Into<String>) -> Self {
        SerError::SchemaMismatch {
            reason: reason.into(),
        }
    }

    pub fn unsupported(what: impl Into<String>) -> Self {
        SerError::Unsupported { what: what.into() }
    }

    /// Map to the public error raised by an encode call.
    pub fn into_encode(self) -> Error {
        Error::EncodeError(self.to_string())
    }

    /// Map to the public error raised by a decode call.
    pub fn into_decode(self) -> Error {
        Error::DecodeError(self.to_string())
    }
}

impl fmt::Display for SerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerError::WriteFailed { offset, reason } => {
                write!(f, "write failed at offset {}: {}", offset, reason)
            }
            SerError::ReadFailed { offset, reason } => {
                write!(f, "read failed at offset {}: {}", offset, reason)
            }
            SerError::InvalidData { reason } => write!(f, "invalid data: {}", reason),
            SerError::SchemaMismatch { reason } => write!(f, "schema mismatch: {}", reason),
            SerError::Unsupported { what } => write!(f, "unsupported: {}", what),
            SerError::Custom(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for SerError {}

impl serde::ser::Error for SerError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        SerError::Custom(msg.to_string())
    }
}

impl serde::de::Error for SerError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        SerError::Custom(msg.to_string())
    }
}

pub type SerResult<T> = core::result::Result<T, SerError>;
