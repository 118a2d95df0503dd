// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fuzz target for network frame decoding
//!
//! Any frame that decodes must re-encode to the same bytes.

#![no_main]

use libfuzzer_sys::fuzz_target;
use ros3_core::Envelope;

fuzz_target!(|data: &[u8]| {
    if let Ok(envelope) = Envelope::decode_frame(data) {
        let frame = envelope
            .encode_frame()
            .expect("decoded envelope should re-encode");
        assert_eq!(frame.as_slice(), data);
    }
});
