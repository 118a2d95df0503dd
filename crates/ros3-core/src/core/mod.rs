// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Core Runtime Components
//!
//! Low-level infrastructure shared by nodes, codecs and transports.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `rt` | Runtime primitives (sequenced channel, buffer pool, wake signals) |
//! | `ser` | Byte cursors and the codec-internal error type |
//!
//! ## Note
//!
//! Most users should use [`crate::Node`] instead of interacting with core
//! modules directly.

/// Runtime primitives (channel, buffer pool, wake signals).
pub mod rt;
/// Serialization helpers (cursors, `SerError`).
pub mod ser;
