// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wake primitives with an atomic fast-path.
//!
//! # Architecture
//! - Atomic flag + sleeper count for the lock-free fast path (hot traffic)
//! - Condvar fallback for threads that actually park (idle consumers,
//!   reliable producers waiting for room, pool checkouts waiting for a buffer)
//! - [`Signal`] pairs the condvar path with a `tokio::sync::Notify` so the same
//!   event wakes both blocked threads and suspended async tasks
//!
//! # Performance
//! - `notify` with no sleeper: two atomic operations, no lock
//! - Cold path: condvar wake (~20 us)

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// Wake notification with an atomic fast-path.
///
/// `wait_timeout` returning `true` only means "progress may have happened";
/// callers always re-check their own condition.
///
/// # Example
/// ```ignore
/// let notifier = WakeNotifier::new();
///
/// // Producer - lock-free unless somebody sleeps
/// channel.push(item);
/// notifier.notify();
///
/// // Consumer
/// while channel.is_empty() {
///     notifier.wait_timeout(Duration::from_millis(10));
/// }
/// ```
#[derive(Debug, Default)]
pub struct WakeNotifier {
    /// Set by `notify`, consumed by waiters.
    data_ready: AtomicBool,
    /// Threads currently inside `wait_timeout`.
    sleepers: AtomicUsize,
    lock: Mutex<()>,
    condvar: Condvar,
}

impl WakeNotifier {
    /// Create a new wake notifier.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal every waiter.
    ///
    /// The condvar is only touched when a thread is parked.
    #[inline]
    pub fn notify(&self) {
        self.data_ready.store(true, Ordering::SeqCst);

        // SeqCst pairs with the sleeper increment in wait_timeout: either we
        // observe the sleeper, or the sleeper observes data_ready.
        if self.sleepers.load(Ordering::SeqCst) > 0 {
            let _guard = self.lock.lock();
            self.condvar.notify_all();
        }
    }

    /// Check if a notification is pending and clear it (lock-free).
    #[inline]
    pub fn check_and_clear(&self) -> bool {
        self.data_ready.swap(false, Ordering::AcqRel)
    }

    /// Wait for a notification with timeout (blocking).
    ///
    /// Returns `true` if notified, `false` on timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.data_ready.swap(false, Ordering::AcqRel) {
            return true;
        }

        let mut guard = self.lock.lock();
        self.sleepers.fetch_add(1, Ordering::SeqCst);

        // Double-check after announcing ourselves
        if self.data_ready.swap(false, Ordering::SeqCst) {
            self.sleepers.fetch_sub(1, Ordering::SeqCst);
            return true;
        }

        let result = self.condvar.wait_for(&mut guard, timeout);
        self.sleepers.fetch_sub(1, Ordering::SeqCst);

        self.data_ready.swap(false, Ordering::AcqRel) || !result.timed_out()
    }
}

/// Data-available signal observed by both threads and async tasks.
///
/// Producers call [`Signal::notify`] after publishing; closing calls
/// [`Signal::close`], which wakes every current and future waiter.
#[derive(Debug, Default)]
pub struct Signal {
    blocking: WakeNotifier,
    task: Notify,
    closed: AtomicBool,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wake one suspended task (a permit is stored if none waits) and every
    /// parked thread.
    #[inline]
    pub fn notify(&self) {
        self.task.notify_one();
        self.blocking.notify();
    }

    /// Mark closed and wake everyone.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.task.notify_waiters();
        self.task.notify_one();
        self.blocking.notify();
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Park the calling thread until notified or `timeout` elapses.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.blocking.wait_timeout(timeout)
    }

    /// Future completing on the next notification.
    ///
    /// Callers must `enable()` the returned future before re-checking their
    /// condition so a notification landing in between is not lost.
    pub fn notified(&self) -> tokio::sync::futures::Notified<'_> {
        self.task.notified()
    }
}
