// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Zero-copy archive codec.
//!
//! The payload is the `#[repr(C)]` memory image of a [`bytemuck::Pod`]
//! message. Encoding is one `memcpy`; receivers either copy the value out
//! ([`Codec::decode`]) or borrow it in place ([`ArchiveCodec::view`]).
//! Pooled buffers are 8-byte aligned, so views over envelope payloads are
//! valid for every primitive alignment.
//!
//! The layout is host-endian: archive topics are meant for peers on the same
//! architecture.

use super::{Codec, Format};
use crate::core::rt::Buffer;
use crate::error::{Error, Result};
use crate::types::TypeDescriptor;
use bytemuck::Pod;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveCodec;

impl ArchiveCodec {
    pub const fn new() -> Self {
        Self
    }

    /// Borrow a message directly from `bytes`.
    ///
    /// # Errors
    /// [`Error::DecodeError`] if the size or alignment is wrong.
    pub fn view<M: Pod>(bytes: &[u8]) -> Result<&M> {
        bytemuck::try_from_bytes(bytes).map_err(|e| {
            Error::DecodeError(format!(
                "archive view of {} bytes as {}: {:?}",
                bytes.len(),
                std::any::type_name::<M>(),
                e
            ))
        })
    }

    fn check_layout<M>(schema: &TypeDescriptor) -> Result<()> {
        let expected = std::mem::size_of::<M>();
        match schema.native_size() {
            Some(size) if size == expected => Ok(()),
            Some(size) => Err(Error::EncodeError(format!(
                "archive layout of `{}` is {} bytes, type is {}",
                schema.name, size, expected
            ))),
            None => Err(Error::EncodeError(format!(
                "`{}` has variable-length members and cannot be archived",
                schema.name
            ))),
        }
    }
}

impl<M> Codec<M> for ArchiveCodec
where
    M: Pod + Send + Sync,
{
    fn format(&self) -> Format {
        Format::Archive
    }

    fn encode(&self, message: &M, schema: &TypeDescriptor, out: &mut Buffer) -> Result<()> {
        Self::check_layout::<M>(schema)?;
        out.extend_from_slice(bytemuck::bytes_of(message))
            .map_err(|e| e.into_encode())
    }

    fn decode(&self, bytes: &[u8], _schema: &TypeDescriptor) -> Result<M> {
        bytemuck::try_pod_read_unaligned(bytes).map_err(|e| {
            Error::DecodeError(format!(
                "archive of {} bytes as {}: {:?}",
                bytes.len(),
                std::any::type_name::<M>(),
                e
            ))
        })
    }
}
