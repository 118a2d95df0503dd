// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Message envelope and its network frame.
//!
//! An [`Envelope`] is what topic channels and transport sessions carry: the
//! encoded payload plus routing metadata. Remote hops serialize it as a
//! fixed little-endian header followed by the payload:
//!
//! ```text
//! 0      2   3   4         12        20     24        32        40     44
//! +------+---+---+---------+---------+------+---------+---------+------+--------+
//! | "R3" |ver|fmt| seq u64 | node u64| ep   | hash u64| ts u64  | len  | payload|
//! +------+---+---+---------+---------+------+---------+---------+------+--------+
//! ```

use crate::codec::Format;
use crate::core::rt::{Buffer, Sequenced};
use crate::core::ser::{Cursor, CursorMut, SerError};
use crate::error::{Error, Result};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Frame magic.
pub const FRAME_MAGIC: [u8; 2] = *b"R3";
/// Frame layout version.
pub const FRAME_VERSION: u8 = 1;
/// Bytes before the payload.
pub const FRAME_HEADER_LEN: usize = 44;

/// Identity of a publishing endpoint: owning node plus a node-local index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EndpointId {
    pub node: u64,
    pub local: u32,
}

impl EndpointId {
    pub const fn new(node: u64, local: u32) -> Self {
        Self { node, local }
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}.{}", self.node, self.local)
    }
}

/// One published message.
#[derive(Debug)]
pub struct Envelope {
    /// Per-topic sequence (assigned by the topic channel on each hop).
    pub sequence: u64,
    pub publisher: EndpointId,
    pub format: Format,
    /// Structural hash of the schema the payload was encoded against.
    pub type_hash: u64,
    /// Publish time, nanoseconds since the UNIX epoch.
    pub timestamp_ns: u64,
    pub payload: Buffer,
}

impl Sequenced for Envelope {
    fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// Wall clock in nanoseconds since the UNIX epoch (0 if the clock is before it).
pub fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

impl Envelope {
    /// Same metadata and payload bytes under a new sequence number.
    pub fn resequenced(&self, sequence: u64) -> Envelope {
        Envelope {
            sequence,
            publisher: self.publisher,
            format: self.format,
            type_hash: self.type_hash,
            timestamp_ns: self.timestamp_ns,
            payload: Buffer::from_slice(self.payload.as_slice()),
        }
    }

    /// Serialize into a network frame.
    ///
    /// # Errors
    /// [`Error::EncodeError`] when the payload exceeds `u32::MAX` bytes.
    pub fn encode_frame(&self) -> Result<Vec<u8>> {
        let payload = self.payload.as_slice();
        let len = u32::try_from(payload.len())
            .map_err(|_| Error::EncodeError(format!("payload of {} bytes too large", payload.len())))?;

        let mut frame = vec![0u8; FRAME_HEADER_LEN + payload.len()];
        let mut cursor = CursorMut::new(&mut frame);
        Self::write_header(&mut cursor, self, len).map_err(SerError::into_encode)?;
        cursor.write_bytes(payload).map_err(SerError::into_encode)?;
        Ok(frame)
    }

    fn write_header(
        cursor: &mut CursorMut<'_>,
        env: &Envelope,
        len: u32,
    ) -> core::result::Result<(), SerError> {
        cursor.write_bytes(&FRAME_MAGIC)?;
        cursor.write_u8(FRAME_VERSION)?;
        cursor.write_u8(env.format.as_u8())?;
        cursor.write_u64_le(env.sequence)?;
        cursor.write_u64_le(env.publisher.node)?;
        cursor.write_u32_le(env.publisher.local)?;
        cursor.write_u64_le(env.type_hash)?;
        cursor.write_u64_le(env.timestamp_ns)?;
        cursor.write_u32_le(len)
    }

    /// Parse a network frame. The payload is copied into an aligned buffer.
    ///
    /// # Errors
    /// [`Error::DecodeError`] on bad magic, version or format, or truncation.
    pub fn decode_frame(frame: &[u8]) -> Result<Envelope> {
        let mut cursor = Cursor::new(frame);
        let magic = cursor.read_bytes(2).map_err(SerError::into_decode)?;
        if magic != FRAME_MAGIC {
            return Err(Error::DecodeError(format!("bad frame magic {:02x?}", magic)));
        }
        let version = cursor.read_u8().map_err(SerError::into_decode)?;
        if version != FRAME_VERSION {
            return Err(Error::DecodeError(format!("unsupported frame version {}", version)));
        }
        let format = Format::from_u8(cursor.read_u8().map_err(SerError::into_decode)?)?;

        let read = |cursor: &mut Cursor<'_>| -> core::result::Result<_, SerError> {
            Ok((
                cursor.read_u64()?,
                cursor.read_u64()?,
                cursor.read_u32()?,
                cursor.read_u64()?,
                cursor.read_u64()?,
                cursor.read_u32()?,
            ))
        };
        let (sequence, node, local, type_hash, timestamp_ns, len) =
            read(&mut cursor).map_err(SerError::into_decode)?;

        let payload = cursor
            .read_bytes(len as usize)
            .map_err(SerError::into_decode)?;
        if cursor.remaining() != 0 {
            return Err(Error::DecodeError(format!(
                "{} bytes after frame payload",
                cursor.remaining()
            )));
        }

        Ok(Envelope {
            sequence,
            publisher: EndpointId::new(node, local),
            format,
            type_hash,
            timestamp_ns,
            payload: Buffer::from_slice(payload),
        })
    }
}
