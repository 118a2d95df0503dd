// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Publish-to-receive latency tracking.
//!
//! A bounded ring of samples (oldest dropped first) and nearest-rank
//! percentiles over it.
//!
//! # Performance
//! - `record`: one uncontended mutex lock + push
//! - `snapshot`: copy + sort of at most `max_samples` values

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

/// Samples kept by [`LatencyTracker::new`].
pub const DEFAULT_MAX_SAMPLES: usize = 10_000;

/// Bounded latency sample ring.
#[derive(Debug)]
pub struct LatencyTracker {
    samples: Mutex<VecDeque<u64>>,
    max_samples: usize,
}

/// Latency statistics over the retained samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LatencySnapshot {
    pub count: usize,
    pub p50: Duration,
    pub p99: Duration,
    pub p999: Duration,
    pub max: Duration,
    pub mean: Duration,
}

impl LatencyTracker {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_SAMPLES)
    }

    pub fn with_capacity(max_samples: usize) -> Self {
        let max_samples = max_samples.max(1);
        Self {
            samples: Mutex::new(VecDeque::with_capacity(max_samples.min(DEFAULT_MAX_SAMPLES))),
            max_samples,
        }
    }

    /// Add a sample; the oldest is dropped when full.
    pub fn record(&self, latency: Duration) {
        let nanos = u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX);
        let mut samples = self.samples.lock();
        if samples.len() >= self.max_samples {
            samples.pop_front();
        }
        samples.push_back(nanos);
    }

    /// Record `end_ns - start_ns` (clamped at zero for skewed clocks).
    pub fn record_span(&self, start_ns: u64, end_ns: u64) {
        self.record(Duration::from_nanos(end_ns.saturating_sub(start_ns)));
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.samples.lock().clear();
    }

    /// Percentiles over the current samples (all zero when empty).
    pub fn snapshot(&self) -> LatencySnapshot {
        let mut sorted: Vec<u64> = self.samples.lock().iter().copied().collect();
        if sorted.is_empty() {
            return LatencySnapshot::default();
        }
        sorted.sort_unstable();

        let len = sorted.len();
        let at = |per_mille: usize| sorted[((len * per_mille) / 1000).min(len - 1)];
        let sum: u128 = sorted.iter().map(|&v| u128::from(v)).sum();
        let mean = u64::try_from(sum / len as u128).unwrap_or(u64::MAX);

        LatencySnapshot {
            count: len,
            p50: Duration::from_nanos(at(500)),
            p99: Duration::from_nanos(at(990)),
            p999: Duration::from_nanos(at(999)),
            max: Duration::from_nanos(sorted[len - 1]),
            mean: Duration::from_nanos(mean),
        }
    }
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self::new()
    }
}
