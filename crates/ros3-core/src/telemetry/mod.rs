// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Endpoint statistics and latency tracking.
//!
//! Counters are plain atomics bumped on the data path (Relaxed); the
//! `*Stats` structs are point-in-time copies handed to callers.
//!
//! # Usage
//! ```
//! use ros3_core::telemetry::LatencyTracker;
//! use std::time::Duration;
//!
//! let tracker = LatencyTracker::new();
//! tracker.record(Duration::from_micros(3));
//! assert_eq!(tracker.snapshot().count, 1);
//! ```

/// Bounded latency sample ring with percentiles.
pub mod latency;

pub use latency::{LatencySnapshot, LatencyTracker};

use std::sync::atomic::{AtomicU64, Ordering};

/// Publisher counters at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PublisherStats {
    pub messages: u64,
    pub bytes: u64,
}

/// Subscriber counters at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubscriberStats {
    pub received: u64,
    /// Messages skipped by the drop-oldest policy.
    pub dropped: u64,
}

#[derive(Debug, Default)]
pub(crate) struct PublisherCounters {
    messages: AtomicU64,
    bytes: AtomicU64,
}

impl PublisherCounters {
    pub(crate) fn record(&self, bytes: usize) {
        self.messages.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> PublisherStats {
        PublisherStats {
            messages: self.messages.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
        }
    }
}
