// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Lock-free pool of fixed-size message buffers.
//!
//! N buffers of S bytes are allocated once at node construction. Free buffers
//! are kept on a Treiber stack of indices whose head packs a 32-bit ABA tag
//! with the top index, so `checkout` and `release` are a single CAS in the
//! uncontended case.
//!
//! Storage is 8-byte aligned: a payload written at offset 0 can be
//! reinterpreted in place by the archive codec.
//!
//! # Performance
//!
//! - checkout: one Acquire load + one CAS
//! - release: one CAS (plus a notifier check when a checkout is blocked)

use super::wake::WakeNotifier;
use crate::core::ser::{SerError, SerResult};
use crate::error::{Error, Result};
use crossbeam::utils::{Backoff, CachePadded};
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Empty-stack marker stored in the low 32 bits of the head.
const NIL: u32 = u32::MAX;
const INDEX_MASK: u64 = 0xFFFF_FFFF;
/// Hard ceiling on a single encoded message.
const MAX_BUFFER_BYTES: usize = 64 * 1024 * 1024;

/// What `checkout` does when every pooled buffer is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustionPolicy {
    /// Wait for a buffer to be released, failing with
    /// [`Error::BufferPoolExhausted`] once `timeout` elapses.
    Block {
        /// Maximum time a checkout may wait.
        timeout: Duration,
    },
    /// Hand out a heap buffer outside the pool. Releasing it is a no-op.
    Unpooled,
}

impl Default for ExhaustionPolicy {
    fn default() -> Self {
        Self::Unpooled
    }
}

/// One pooled buffer plus its free-list link.
struct PoolSlot {
    data: UnsafeCell<Box<[u64]>>,
    next: AtomicU32,
}

struct PoolShared {
    slots: Box<[PoolSlot]>,
    buffer_size: usize,
    /// Packed `(tag << 32) | top_index`.
    head: CachePadded<AtomicU64>,
    available: AtomicUsize,
    unpooled_checkouts: AtomicU64,
    spills: AtomicU64,
    policy: ExhaustionPolicy,
    released: WakeNotifier,
}

// SAFETY: PoolShared is Send + Sync because:
// - slot data is only reachable through a Buffer holding the index
// - the free-list CAS guarantees one holder per index at a time
// - links and head are atomics
unsafe impl Send for PoolShared {}
unsafe impl Sync for PoolShared {}

impl PoolShared {
    fn try_pop(&self) -> Option<u32> {
        let mut head = self.head.load(Ordering::Acquire);
        loop {
            let index = (head & INDEX_MASK) as u32;
            if index == NIL {
                return None;
            }
            let next = self.slots[index as usize].next.load(Ordering::Acquire);
            let tag = (head >> 32).wrapping_add(1);
            let new_head = (tag << 32) | u64::from(next);
            match self.head.compare_exchange_weak(
                head,
                new_head,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.available.fetch_sub(1, Ordering::Relaxed);
                    return Some(index);
                }
                Err(actual) => head = actual,
            }
        }
    }

    fn push(&self, index: u32) {
        debug_assert!((index as usize) < self.slots.len(), "Invalid pool index");

        let mut head = self.head.load(Ordering::Relaxed);
        loop {
            self.slots[index as usize]
                .next
                .store((head & INDEX_MASK) as u32, Ordering::Relaxed);
            let tag = (head >> 32).wrapping_add(1);
            let new_head = (tag << 32) | u64::from(index);
            // Release publishes both the link and the caller's writes.
            match self.head.compare_exchange_weak(
                head,
                new_head,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => head = actual,
            }
        }
        self.available.fetch_add(1, Ordering::Relaxed);

        if matches!(self.policy, ExhaustionPolicy::Block { .. }) {
            self.released.notify();
        }
    }
}

/// Fixed set of reusable byte buffers.
///
/// Cloning is cheap and shares the same buffers.
#[derive(Clone)]
pub struct BufferPool {
    shared: Arc<PoolShared>,
}

impl BufferPool {
    /// Allocate `count` buffers of `buffer_size` bytes.
    ///
    /// # Errors
    /// [`Error::Config`] if `count` or `buffer_size` is zero, or `count`
    /// does not fit the 32-bit index space.
    pub fn new(count: usize, buffer_size: usize, policy: ExhaustionPolicy) -> Result<Self> {
        if count == 0 {
            return Err(Error::Config("buffer pool needs at least one buffer".into()));
        }
        if buffer_size == 0 {
            return Err(Error::Config("buffer size must be non-zero".into()));
        }
        if count >= NIL as usize {
            return Err(Error::Config(format!("buffer pool too large: {}", count)));
        }

        let words = buffer_size.div_ceil(8);
        let slots: Box<[PoolSlot]> = (0..count)
            .map(|i| PoolSlot {
                data: UnsafeCell::new(vec![0u64; words].into_boxed_slice()),
                // Initial free list: 0 -> 1 -> ... -> count-1 -> NIL
                next: AtomicU32::new(if i + 1 < count { (i + 1) as u32 } else { NIL }),
            })
            .collect();

        log::debug!(
            "[pool] allocated {} buffers x {} bytes ({:?})",
            count,
            buffer_size,
            policy
        );

        Ok(Self {
            shared: Arc::new(PoolShared {
                slots,
                buffer_size,
                head: CachePadded::new(AtomicU64::new(0)),
                available: AtomicUsize::new(count),
                unpooled_checkouts: AtomicU64::new(0),
                spills: AtomicU64::new(0),
                policy,
                released: WakeNotifier::new(),
            }),
        })
    }

    /// Check out an empty buffer (logical length 0).
    ///
    /// # Errors
    /// [`Error::BufferPoolExhausted`] when the pool is empty under
    /// [`ExhaustionPolicy::Block`] and no buffer comes back before the timeout.
    pub fn checkout(&self) -> Result<Buffer> {
        if let Some(index) = self.shared.try_pop() {
            return Ok(self.pooled(index));
        }

        match self.shared.policy {
            ExhaustionPolicy::Unpooled => {
                self.shared
                    .unpooled_checkouts
                    .fetch_add(1, Ordering::Relaxed);
                log::trace!("[pool] exhausted, handing out unpooled buffer");
                Ok(Buffer::unpooled(self.shared.buffer_size))
            }
            ExhaustionPolicy::Block { timeout } => self.checkout_blocking(timeout),
        }
    }

    fn checkout_blocking(&self, timeout: Duration) -> Result<Buffer> {
        let deadline = Instant::now() + timeout;
        let backoff = Backoff::new();

        loop {
            if let Some(index) = self.shared.try_pop() {
                return Ok(self.pooled(index));
            }
            if !backoff.is_completed() {
                backoff.snooze();
                continue;
            }
            let now = Instant::now();
            if now >= deadline {
                log::debug!("[pool] checkout timed out after {:?}", timeout);
                return Err(Error::BufferPoolExhausted);
            }
            self.shared.released.wait_timeout(deadline - now);
        }
    }

    fn pooled(&self, index: u32) -> Buffer {
        Buffer {
            storage: Storage::Pooled {
                pool: Arc::clone(&self.shared),
                index,
            },
            len: 0,
            capacity: self.shared.buffer_size,
        }
    }

    /// Return a buffer explicitly (equivalent to dropping it).
    ///
    /// Unpooled buffers are simply freed.
    pub fn release(&self, buffer: Buffer) {
        drop(buffer);
    }

    /// Total number of pooled buffers.
    pub fn capacity(&self) -> usize {
        self.shared.slots.len()
    }

    /// Size in bytes of every buffer.
    pub fn buffer_size(&self) -> usize {
        self.shared.buffer_size
    }

    /// Buffers currently on the free list (snapshot).
    pub fn available(&self) -> usize {
        self.shared.available.load(Ordering::Relaxed)
    }

    /// Number of heap buffers handed out because the pool was empty.
    pub fn unpooled_checkouts(&self) -> u64 {
        self.shared.unpooled_checkouts.load(Ordering::Relaxed)
    }

    /// Pooled buffers that outgrew `buffer_size` and moved to the heap.
    pub fn spills(&self) -> u64 {
        self.shared.spills.load(Ordering::Relaxed)
    }

    pub fn policy(&self) -> ExhaustionPolicy {
        self.shared.policy
    }
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("capacity", &self.capacity())
            .field("buffer_size", &self.buffer_size())
            .field("available", &self.available())
            .finish()
    }
}

enum Storage {
    Pooled { pool: Arc<PoolShared>, index: u32 },
    Unpooled(Box<[u64]>),
}

/// Byte buffer checked out from a [`BufferPool`] (or heap fallback).
///
/// Only bytes `0..len()` are observable; the logical length starts at zero on
/// every checkout so stale bytes from a previous holder never leak.
pub struct Buffer {
    storage: Storage,
    len: usize,
    capacity: usize,
}

impl Buffer {
    /// Heap buffer outside any pool.
    pub fn unpooled(capacity: usize) -> Self {
        Self {
            storage: Storage::Unpooled(vec![0u64; capacity.div_ceil(8)].into_boxed_slice()),
            len: 0,
            capacity,
        }
    }

    /// Unpooled buffer holding a copy of `bytes`.
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut buffer = Self::unpooled(bytes.len());
        buffer.len = bytes.len();
        buffer.words_mut_bytes()[..bytes.len()].copy_from_slice(bytes);
        buffer
    }

    fn words(&self) -> &[u64] {
        match &self.storage {
            // SAFETY:
            // 1. The slot outlives us: we hold an Arc on the pool.
            // 2. The free-list CAS gave this Buffer exclusive ownership of `index`.
            // 3. Shared access only hands out &[u8], mutable access requires &mut self.
            Storage::Pooled { pool, index } => unsafe { &*pool.slots[*index as usize].data.get() },
            Storage::Unpooled(words) => words,
        }
    }

    fn words_mut_bytes(&mut self) -> &mut [u8] {
        let words: &mut [u64] = match &mut self.storage {
            // SAFETY: same ownership argument as `words`, plus &mut self
            // guarantees no outstanding shared borrow.
            Storage::Pooled { pool, index } => unsafe {
                &mut *pool.slots[*index as usize].data.get()
            },
            Storage::Unpooled(words) => words,
        };
        bytemuck::cast_slice_mut(words)
    }

    /// Logical length.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// `true` when the buffer belongs to a pool (release re-admits it).
    pub fn is_pooled(&self) -> bool {
        matches!(self.storage, Storage::Pooled { .. })
    }

    /// Written bytes.
    pub fn as_slice(&self) -> &[u8] {
        let bytes: &[u8] = bytemuck::cast_slice(self.words());
        &bytes[..self.len]
    }

    /// Written bytes, mutable (used to patch headers in place).
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        let len = self.len;
        &mut self.words_mut_bytes()[..len]
    }

    /// Reset logical length to zero.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Append bytes.
    ///
    /// Writing past `capacity()` spills the contents to a larger heap buffer
    /// and hands the pooled slot back.
    pub fn extend_from_slice(&mut self, data: &[u8]) -> SerResult<()> {
        let end = self.reserve_tail(data.len())?;
        let start = self.len;
        self.words_mut_bytes()[start..end].copy_from_slice(data);
        self.len = end;
        Ok(())
    }

    /// Append `count` zero bytes.
    pub fn put_zeros(&mut self, count: usize) -> SerResult<()> {
        let end = self.reserve_tail(count)?;
        let start = self.len;
        self.words_mut_bytes()[start..end].fill(0);
        self.len = end;
        Ok(())
    }

    fn reserve_tail(&mut self, additional: usize) -> SerResult<usize> {
        let end = self
            .len
            .checked_add(additional)
            .filter(|end| *end <= MAX_BUFFER_BYTES)
            .ok_or_else(|| SerError::WriteFailed {
                offset: self.len,
                reason: format!("message exceeds {} bytes", MAX_BUFFER_BYTES),
            })?;
        if end > self.capacity {
            self.spill(end);
        }
        Ok(end)
    }

    fn spill(&mut self, needed: usize) {
        let capacity = needed.max(self.capacity.saturating_mul(2)).max(64);
        let mut words = vec![0u64; capacity.div_ceil(8)].into_boxed_slice();
        bytemuck::cast_slice_mut::<u64, u8>(&mut words)[..self.len].copy_from_slice(self.as_slice());

        let previous = std::mem::replace(&mut self.storage, Storage::Unpooled(words));
        if let Storage::Pooled { pool, index } = previous {
            pool.spills.fetch_add(1, Ordering::Relaxed);
            pool.push(index);
        }
        self.capacity = capacity;
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl std::io::Write for Buffer {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.extend_from_slice(data)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::WriteZero, e.to_string()))?;
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if let Storage::Pooled { pool, index } = &self.storage {
            self.len = 0;
            pool.push(*index);
        }
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("len", &self.len)
            .field("capacity", &self.capacity)
            .field("pooled", &self.is_pooled())
            .finish()
    }
}
