// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! JSON codec (serde_json), for debugging and tooling interop.

use super::{Codec, Format};
use crate::core::rt::Buffer;
use crate::error::{Error, Result};
use crate::types::TypeDescriptor;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Human-readable codec. Field names are preserved; the schema is not
/// consulted beyond the topic-level type check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonCodec {
    pretty: bool,
}

impl JsonCodec {
    pub const fn new() -> Self {
        Self { pretty: false }
    }

    /// Indented output.
    pub const fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl<M> Codec<M> for JsonCodec
where
    M: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn format(&self) -> Format {
        Format::Json
    }

    fn encode(&self, message: &M, _schema: &TypeDescriptor, out: &mut Buffer) -> Result<()> {
        let result = if self.pretty {
            serde_json::to_writer_pretty(&mut *out, message)
        } else {
            serde_json::to_writer(&mut *out, message)
        };
        result.map_err(|e| Error::EncodeError(format!("json: {}", e)))
    }

    fn decode(&self, bytes: &[u8], _schema: &TypeDescriptor) -> Result<M> {
        serde_json::from_slice(bytes).map_err(|e| Error::DecodeError(format!("json: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        values: Vec<i32>,
    }

    fn schema() -> TypeDescriptor {
        TypeDescriptor::struct_type("demo::Sample", Vec::new())
    }

    #[test]
    fn test_json_keeps_field_names() {
        let codec = JsonCodec::new();
        let mut out = Buffer::unpooled(64);
        let sample = Sample {
            name: "lidar".into(),
            values: vec![1, 2],
        };
        codec
            .encode(&sample, &schema(), &mut out)
            .expect("encode should succeed");
        assert_eq!(out.as_slice(), br#"{"name":"lidar","values":[1,2]}"#);

        let back: Sample = codec
            .decode(out.as_slice(), &schema())
            .expect("decode should succeed");
        assert_eq!(back, sample);
    }

    #[test]
    fn test_pretty_output_decodes() {
        let codec = JsonCodec::pretty();
        let mut out = Buffer::unpooled(16);
        let sample = Sample {
            name: "imu".into(),
            values: vec![],
        };
        codec
            .encode(&sample, &schema(), &mut out)
            .expect("encode should succeed");
        assert!(out.as_slice().contains(&b'\n'));
        let back: Sample = codec
            .decode(out.as_slice(), &schema())
            .expect("decode should succeed");
        assert_eq!(back, sample);
    }

    #[test]
    fn test_malformed_json_is_decode_error() {
        let result: Result<Sample> = JsonCodec::new().decode(b"{\"name\":", &schema());
        assert!(matches!(result, Err(Error::DecodeError(_))));
    }
}
