// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime primitives for lock-free data structures and event handling.

pub mod bufpool;
pub mod channel;
pub mod wake;

pub use bufpool::{Buffer, BufferPool, ExhaustionPolicy};
pub use channel::{Channel, ChannelCursor, Sequenced, StartPosition};
pub use wake::{Signal, WakeNotifier};
