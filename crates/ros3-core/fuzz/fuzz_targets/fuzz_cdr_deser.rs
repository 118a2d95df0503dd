// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fuzz target for CDR decoding
//!
//! Feeds arbitrary bytes to the schema-driven CDR decoder and the raw cursor.
//! None of these operations should panic on any input.

#![no_main]

use libfuzzer_sys::fuzz_target;
use ros3_core::msgs::{RobotState, StringMsg};
use ros3_core::{CdrCodec, Codec, Message};

fuzz_target!(|data: &[u8]| {
    // ----------------------------------------------------------------
    // 1. Low-level cursor reads, both byte orders - must not panic
    // ----------------------------------------------------------------
    for big_endian in [false, true] {
        let mut cursor = ros3_core::core::ser::Cursor::with_byte_order(data, big_endian);
        let _ = cursor.read_u8();
        let _ = cursor.read_u16();
        let _ = cursor.read_u32();
        let _ = cursor.read_u64();
        let _ = cursor.read_f64();
        let _ = cursor.read_bytes(4);
    }

    // ----------------------------------------------------------------
    // 2. Schema-driven decoding - must not panic (DecodeError is fine)
    // ----------------------------------------------------------------
    let codec = CdrCodec::new();
    let _: Result<RobotState, _> = codec.decode(data, &RobotState::type_descriptor());
    let _: Result<StringMsg, _> = codec.decode(data, &StringMsg::type_descriptor());
});
