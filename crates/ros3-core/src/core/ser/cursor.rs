// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bounds-checked cursors over borrowed byte slices.
//!
//! `CursorMut` writes the little-endian envelope frame header. `Cursor` reads
//! either byte order, picked at construction: CDR bodies announce theirs in
//! the encapsulation header.

use super::{SerError, SerResult};

const SHORT_READ: &str = "unexpected end of buffer";

/// Writer used for envelope frames (little-endian only).
pub struct CursorMut<'a> {
    buffer: &'a mut [u8],
    pos: usize,
}

impl<'a> CursorMut<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer, pos: 0 }
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> SerResult<()> {
        let end = self.pos + data.len();
        let Some(dst) = self.buffer.get_mut(self.pos..end) else {
            return Err(SerError::WriteFailed {
                offset: self.pos,
                reason: "buffer too small".into(),
            });
        };
        dst.copy_from_slice(data);
        self.pos = end;
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> SerResult<()> {
        self.write_bytes(&[value])
    }

    pub fn write_u32_le(&mut self, value: u32) -> SerResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_u64_le(&mut self, value: u64) -> SerResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }
}

/// Zero-copy reader with a fixed byte order.
pub struct Cursor<'a> {
    buffer: &'a [u8],
    pos: usize,
    big_endian: bool,
}

macro_rules! read_number {
    ($($name:ident => $ty:ty),* $(,)?) => {
        $(
            pub fn $name(&mut self) -> SerResult<$ty> {
                let bytes = self.take::<{ std::mem::size_of::<$ty>() }>()?;
                Ok(if self.big_endian {
                    <$ty>::from_be_bytes(bytes)
                } else {
                    <$ty>::from_le_bytes(bytes)
                })
            }
        )*
    };
}

impl<'a> Cursor<'a> {
    /// Little-endian reader.
    pub fn new(buffer: &'a [u8]) -> Self {
        Self::with_byte_order(buffer, false)
    }

    pub fn with_byte_order(buffer: &'a [u8], big_endian: bool) -> Self {
        Self {
            buffer,
            pos: 0,
            big_endian,
        }
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.pos)
    }

    /// Skip padding up to a multiple of `alignment`, counted from the start
    /// of the slice. On failure the position is unchanged.
    pub fn align(&mut self, alignment: usize) -> SerResult<()> {
        if alignment <= 1 {
            return Ok(());
        }
        let aligned = (self.pos + alignment - 1) / alignment * alignment;
        if aligned > self.buffer.len() {
            return Err(SerError::ReadFailed {
                offset: aligned,
                reason: SHORT_READ.into(),
            });
        }
        self.pos = aligned;
        Ok(())
    }

    pub fn read_bytes(&mut self, len: usize) -> SerResult<&'a [u8]> {
        let buffer: &'a [u8] = self.buffer;
        let slice = self
            .pos
            .checked_add(len)
            .and_then(|end| buffer.get(self.pos..end))
            .ok_or_else(|| SerError::ReadFailed {
                offset: self.pos,
                reason: SHORT_READ.into(),
            })?;
        self.pos += len;
        Ok(slice)
    }

    fn take<const N: usize>(&mut self) -> SerResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> SerResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_i8(&mut self) -> SerResult<i8> {
        Ok(self.read_u8()? as i8)
    }

    read_number! {
        read_u16 => u16,
        read_u32 => u32,
        read_u64 => u64,
        read_i16 => i16,
        read_i32 => i32,
        read_i64 => i64,
        read_f32 => f32,
        read_f64 => f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_overflow_reports_offset() {
        let mut buffer = [0u8; 2];
        let mut cursor = CursorMut::new(&mut buffer);
        cursor.write_u8(1).expect("write should succeed");
        cursor.write_u8(2).expect("write should succeed");

        match cursor.write_u32_le(3).unwrap_err() {
            SerError::WriteFailed { offset, reason } => {
                assert_eq!(offset, 2);
                assert_eq!(reason, "buffer too small");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_short_read_reports_offset() {
        let buffer = [0u8; 1];
        let mut cursor = Cursor::new(&buffer);
        assert_eq!(cursor.read_u8().expect("read should succeed"), 0);

        match cursor.read_u8().unwrap_err() {
            SerError::ReadFailed { offset, .. } => assert_eq!(offset, 1),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(cursor.read_bytes(usize::MAX).is_err());
    }

    #[test]
    fn test_failed_align_keeps_position() {
        let buffer = [0u8; 2];
        let mut cursor = Cursor::new(&buffer);
        cursor.read_u16().expect("read should succeed");
        assert!(cursor.align(8).is_err());
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_byte_order_selection() {
        let buffer = [0x12, 0x34, 0x56, 0x78];
        assert_eq!(
            Cursor::new(&buffer).read_u32().expect("read should succeed"),
            0x7856_3412
        );
        assert_eq!(
            Cursor::with_byte_order(&buffer, true)
                .read_u32()
                .expect("read should succeed"),
            0x1234_5678
        );
    }

    #[test]
    fn test_frame_style_header_reads_back() {
        let mut buffer = [0u8; 13];
        let mut writer = CursorMut::new(&mut buffer);
        writer.write_u8(7).expect("write should succeed");
        writer.write_u32_le(0x0A0B_0C0D).expect("write should succeed");
        writer.write_u64_le(u64::MAX - 1).expect("write should succeed");

        let mut reader = Cursor::new(&buffer);
        assert_eq!(reader.read_u8().expect("read should succeed"), 7);
        assert_eq!(reader.read_u32().expect("read should succeed"), 0x0A0B_0C0D);
        assert_eq!(reader.read_u64().expect("read should succeed"), u64::MAX - 1);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_floats_follow_byte_order() {
        let bytes = 1.5f64.to_be_bytes();
        let mut reader = Cursor::with_byte_order(&bytes, true);
        assert_eq!(reader.read_f64().expect("read should succeed"), 1.5);
    }
}
