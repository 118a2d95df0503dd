// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bounded multi-producer / multi-consumer sequenced ring.
//!
//! One `Channel` backs one topic. Producers share a single tail counter, so
//! the claimed position *is* the per-topic sequence number and every consumer
//! observes the same total order. Each subscriber owns a [`ChannelCursor`]
//! (its head counter); several threads may take from the same cursor.
//!
//! Protocol:
//! - Producer: claim `seq` on the tail (one `fetch_add`, or a CAS loop when a
//!   reliable cursor constrains admission), wait for the slot's previous lap
//!   to be committed, store the payload, then publish `stamp = seq + 1` with
//!   Release.
//! - Consumer: load head, Acquire-load the slot stamp, load the payload and
//!   check its sequence, then CAS the head forward. A stale or contended slot
//!   means a bounded retry.
//! - Overflow: best-effort cursors skip forward to the newest `window`
//!   messages (counted as drops); reliable cursors make producers wait for
//!   room, up to a timeout.
//!
//! Storage is rounded up to a power of two for index masking; the logical
//! capacity (history depth) is enforced through cursor windows.
//!
//! A plain ring drops a slot's payload as soon as every attached cursor has
//! read past it, so pooled buffers go back to the pool right after the last
//! subscriber takes them. A [`Channel::retaining`] ring also keeps the last
//! `capacity` committed messages for transient-local replay.
//!
//! # Performance
//!
//! - uncontended publish: one atomic increment + one payload store + one stamp store
//! - uncontended take: two Acquire loads + one CAS + one head scan per cursor

use super::wake::{Signal, WakeNotifier};
use crate::error::{Error, Result};
use arc_swap::{ArcSwap, ArcSwapOption};
use crossbeam::utils::{Backoff, CachePadded};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Upper bound on one park of a blocked reliable producer.
const SPACE_RECHECK: Duration = Duration::from_millis(2);

/// Values stored in a channel carry the sequence they were published under.
pub trait Sequenced {
    fn sequence(&self) -> u64;
}

/// Where a new cursor starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPosition {
    /// Only messages published after attach (volatile).
    Latest,
    /// The most recent `window` retained messages first (transient-local).
    Retained,
}

struct Slot<T> {
    /// `seq + 1` of the last committed occupant; 0 = never written.
    stamp: AtomicU64,
    value: ArcSwapOption<T>,
}

/// A consumer position on a [`Channel`].
pub struct ChannelCursor {
    head: CachePadded<AtomicU64>,
    window: u64,
    reliable: bool,
    dropped: AtomicU64,
    signal: Signal,
}

impl ChannelCursor {
    /// Messages skipped by the drop-oldest policy.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn window(&self) -> usize {
        self.window as usize
    }

    pub fn is_reliable(&self) -> bool {
        self.reliable
    }

    /// Next sequence this cursor will read.
    pub fn position(&self) -> u64 {
        self.head.load(Ordering::Acquire)
    }

    pub fn signal(&self) -> &Signal {
        &self.signal
    }

    pub fn is_closed(&self) -> bool {
        self.signal.is_closed()
    }
}

/// Bounded sequenced MPMC ring (see module docs).
pub struct Channel<T> {
    slots: Box<[Slot<T>]>,
    mask: u64,
    capacity: u64,
    /// Admission waits on reliable cursors.
    reliable: bool,
    /// Keep consumed payloads for late joiners.
    retain: bool,
    tail: CachePadded<AtomicU64>,
    cursors: ArcSwap<Vec<Arc<ChannelCursor>>>,
    closed: AtomicBool,
    /// Reliable producers park here until a cursor advances.
    space: WakeNotifier,
}

impl<T: Sequenced> Channel<T> {
    /// Create a ring holding `capacity` messages (storage rounded up to a power of two).
    ///
    /// `reliable` enables the blocking admission path; it must be set for any
    /// channel that will carry reliable cursors.
    pub fn new(capacity: usize, reliable: bool) -> Self {
        Self::build(capacity, reliable, false)
    }

    /// Like [`Channel::new`], but the last `capacity` messages stay stored
    /// after every cursor has read them.
    pub fn retaining(capacity: usize, reliable: bool) -> Self {
        Self::build(capacity, reliable, true)
    }

    fn build(capacity: usize, reliable: bool, retain: bool) -> Self {
        let capacity = capacity.max(1);
        let storage = capacity.next_power_of_two();
        let slots = (0..storage)
            .map(|_| Slot {
                stamp: AtomicU64::new(0),
                value: ArcSwapOption::empty(),
            })
            .collect();

        Self {
            slots,
            mask: (storage - 1) as u64,
            capacity: capacity as u64,
            reliable,
            retain,
            tail: CachePadded::new(AtomicU64::new(0)),
            cursors: ArcSwap::from_pointee(Vec::new()),
            closed: AtomicBool::new(false),
            space: WakeNotifier::new(),
        }
    }

    /// Logical capacity (history depth).
    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    /// Slot count (power of two).
    pub fn storage(&self) -> usize {
        self.slots.len()
    }

    pub fn is_retaining(&self) -> bool {
        self.retain
    }

    /// Slots currently holding a payload.
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.value.load().is_some()).count()
    }

    /// Next sequence to be claimed (== number of messages ever published).
    pub fn tail(&self) -> u64 {
        self.tail.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of attached cursors.
    pub fn cursor_count(&self) -> usize {
        self.cursors.load().len()
    }

    /// Publish a value built for its claimed sequence.
    ///
    /// Returns the stored value (shared with consumers).
    ///
    /// # Errors
    /// - [`Error::ChannelClosed`] once the channel is closed
    /// - [`Error::Timeout`] when a reliable cursor stays full for `block_timeout`
    pub fn publish<F>(&self, make: F, block_timeout: Duration) -> Result<Arc<T>>
    where
        F: FnOnce(u64) -> T,
    {
        if self.is_closed() {
            return Err(Error::ChannelClosed);
        }

        let seq = if self.reliable {
            self.claim_with_room(block_timeout)?
        } else {
            self.tail.fetch_add(1, Ordering::AcqRel)
        };

        Ok(self.commit(seq, make(seq)))
    }

    fn claim_with_room(&self, block_timeout: Duration) -> Result<u64> {
        let backoff = Backoff::new();
        let mut deadline: Option<Instant> = None;

        loop {
            if self.is_closed() {
                return Err(Error::ChannelClosed);
            }

            let tail = self.tail.load(Ordering::Acquire);
            if self.has_room(tail) {
                if self
                    .tail
                    .compare_exchange_weak(tail, tail + 1, Ordering::AcqRel, Ordering::Relaxed)
                    .is_ok()
                {
                    return Ok(tail);
                }
                backoff.spin();
                continue;
            }

            if !backoff.is_completed() {
                backoff.snooze();
                continue;
            }

            let deadline = *deadline.get_or_insert_with(|| Instant::now() + block_timeout);
            let now = Instant::now();
            if now >= deadline {
                log::debug!(
                    "[channel] reliable publish timed out after {:?} (tail={})",
                    block_timeout,
                    tail
                );
                return Err(Error::Timeout);
            }
            self.space.wait_timeout((deadline - now).min(SPACE_RECHECK));
        }
    }

    /// True when every open reliable cursor can accept sequence `tail`.
    fn has_room(&self, tail: u64) -> bool {
        self.cursors.load().iter().all(|cursor| {
            !cursor.reliable
                || cursor.is_closed()
                || tail.saturating_sub(cursor.head.load(Ordering::SeqCst)) < cursor.window
        })
    }

    fn commit(&self, seq: u64, value: T) -> Arc<T> {
        let slot = &self.slots[(seq & self.mask) as usize];
        let storage = self.mask + 1;
        let previous_lap = if seq >= storage { seq - storage + 1 } else { 0 };

        // The producer one lap behind may still be storing into this slot.
        let backoff = Backoff::new();
        while slot.stamp.load(Ordering::Acquire) != previous_lap {
            backoff.snooze();
        }

        let value = Arc::new(value);
        slot.value.store(Some(Arc::clone(&value)));
        slot.stamp.store(seq + 1, Ordering::Release);

        let cursors = self.cursors.load();
        for cursor in cursors.iter() {
            cursor.signal.notify();
        }
        if self.retain {
            // `seq` pushed the oldest retained message out of the history.
            if let Some(expired) = seq.checked_sub(self.capacity) {
                self.release(expired);
            }
        } else if cursors.is_empty() {
            // Nobody can read it: volatile joiners start after `seq`.
            self.release(seq);
        }
        value
    }

    /// Drop the payload stored for `seq` once no attached cursor still needs
    /// it and it is outside the retained history.
    fn release(&self, seq: u64) {
        if self.retain && seq + self.capacity >= self.tail.load(Ordering::Acquire) {
            return;
        }
        let passed = self
            .cursors
            .load()
            .iter()
            .all(|cursor| cursor.head.load(Ordering::Acquire) > seq);
        if !passed {
            return;
        }
        let slot = &self.slots[(seq & self.mask) as usize];
        let current = slot.value.load();
        if current.as_ref().map(|value| value.sequence()) == Some(seq) {
            // Fails harmlessly when the next lap already replaced it.
            let _ = slot.value.compare_and_swap(&current, None);
        }
    }

    /// Release every stored sequence the remaining cursors have passed.
    fn sweep(&self) {
        let tail = self.tail.load(Ordering::Acquire);
        let floor = self
            .cursors
            .load()
            .iter()
            .map(|cursor| cursor.head.load(Ordering::Acquire))
            .min()
            .unwrap_or(tail)
            .min(tail);
        for seq in floor.saturating_sub(self.mask + 1)..floor {
            self.release(seq);
        }
    }

    /// Attach a consumer.
    ///
    /// `window` is clamped to `1..=capacity`.
    pub fn attach(&self, window: usize, reliable: bool, start: StartPosition) -> Arc<ChannelCursor> {
        let window = (window as u64).clamp(1, self.capacity);
        let tail = self.tail.load(Ordering::Acquire);
        let head = match start {
            StartPosition::Retained if self.retain => tail.saturating_sub(window),
            _ => tail,
        };

        let cursor = Arc::new(ChannelCursor {
            head: CachePadded::new(AtomicU64::new(head)),
            window,
            reliable: reliable && self.reliable,
            dropped: AtomicU64::new(0),
            signal: Signal::new(),
        });

        self.cursors.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(Arc::clone(&cursor));
            next
        });

        if self.is_closed() {
            cursor.signal.close();
        }
        cursor
    }

    /// Close and remove a cursor; pending waits on it fail with `ChannelClosed`.
    pub fn detach(&self, cursor: &Arc<ChannelCursor>) {
        cursor.signal.close();
        self.cursors.rcu(|current| {
            current
                .iter()
                .filter(|c| !Arc::ptr_eq(c, cursor))
                .cloned()
                .collect::<Vec<_>>()
        });
        // A departed reliable cursor may have been the only thing blocking producers.
        self.space.notify();
        self.sweep();
    }

    /// Take the next message for `cursor`, or `None` when nothing is ready.
    pub fn try_take(&self, cursor: &ChannelCursor) -> Option<Arc<T>> {
        loop {
            let head = cursor.head.load(Ordering::Acquire);
            let tail = self.tail.load(Ordering::Acquire);
            if head >= tail {
                return None;
            }

            // Drop-oldest: keep only the newest `window` messages.
            if !cursor.reliable && tail - head > cursor.window {
                let skip_to = tail - cursor.window;
                if cursor
                    .head
                    .compare_exchange(head, skip_to, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    cursor.dropped.fetch_add(skip_to - head, Ordering::Relaxed);
                    log::trace!("[channel] cursor dropped {} stale messages", skip_to - head);
                    for seq in head.max(skip_to.saturating_sub(self.mask + 1))..skip_to {
                        self.release(seq);
                    }
                }
                continue;
            }

            let slot = &self.slots[(head & self.mask) as usize];
            if slot.stamp.load(Ordering::Acquire) <= head {
                // Claimed but not committed yet.
                return None;
            }

            let Some(value) = slot.value.load_full() else {
                // Released before this cursor was listed (it attached while
                // the message was being committed).
                if cursor
                    .head
                    .compare_exchange(head, head + 1, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    cursor.dropped.fetch_add(1, Ordering::Relaxed);
                }
                continue;
            };
            let seq = value.sequence();

            if seq == head {
                if cursor
                    .head
                    .compare_exchange(head, head + 1, Ordering::SeqCst, Ordering::Acquire)
                    .is_ok()
                {
                    if self.reliable {
                        self.space.notify();
                    }
                    self.release(head);
                    return Some(value);
                }
                // Another thread on this cursor took it.
                continue;
            }

            if seq > head {
                // Lapped: this slot was overwritten before we got to it.
                if cursor
                    .head
                    .compare_exchange(head, head + 1, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    cursor.dropped.fetch_add(1, Ordering::Relaxed);
                }
                continue;
            }

            return None;
        }
    }

    /// Messages waiting for `cursor` (bounded by its window).
    pub fn pending(&self, cursor: &ChannelCursor) -> usize {
        let head = cursor.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        tail.saturating_sub(head).min(cursor.window) as usize
    }

    /// Close the channel: producers fail, every cursor is woken and closed.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        for cursor in self.cursors.load().iter() {
            cursor.signal.close();
        }
        self.space.notify();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    const NO_WAIT: Duration = Duration::from_millis(0);

    #[derive(Debug)]
    struct Item {
        seq: u64,
        value: u32,
    }

    impl Sequenced for Item {
        fn sequence(&self) -> u64 {
            self.seq
        }
    }

    fn push(channel: &Channel<Item>, value: u32) -> Result<u64> {
        channel
            .publish(|seq| Item { seq, value }, Duration::from_millis(20))
            .map(|item| item.seq)
    }

    #[test]
    fn test_storage_is_power_of_two() {
        let channel: Channel<Item> = Channel::new(10, false);
        assert_eq!(channel.capacity(), 10);
        assert_eq!(channel.storage(), 16);
    }

    #[test]
    fn test_single_producer_order() {
        let channel = Channel::new(8, false);
        let cursor = channel.attach(8, false, StartPosition::Latest);
        for v in 0..5 {
            push(&channel, v).expect("publish should succeed");
        }
        let seqs: Vec<u64> = std::iter::from_fn(|| channel.try_take(&cursor))
            .map(|item| item.seq)
            .collect();
        assert_eq!(seqs, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_drop_oldest_keeps_newest_window() {
        let channel = Channel::new(10, false);
        let cursor = channel.attach(10, false, StartPosition::Latest);
        for v in 1..=15 {
            push(&channel, v).expect("publish should succeed");
        }
        assert_eq!(channel.pending(&cursor), 10);
        let values: Vec<u32> = std::iter::from_fn(|| channel.try_take(&cursor))
            .map(|item| item.value)
            .collect();
        assert_eq!(values, (6..=15).collect::<Vec<_>>());
        assert_eq!(cursor.dropped(), 5);
    }

    #[test]
    fn test_lapped_slot_is_skipped() {
        // window == storage: overwritten slots are detected by sequence
        let channel = Channel::new(4, false);
        let cursor = channel.attach(4, false, StartPosition::Latest);
        for v in 0..9 {
            push(&channel, v).expect("publish should succeed");
        }
        let values: Vec<u32> = std::iter::from_fn(|| channel.try_take(&cursor))
            .map(|item| item.value)
            .collect();
        assert_eq!(values, vec![5, 6, 7, 8]);
    }

    #[test]
    fn test_every_cursor_sees_every_message() {
        let channel = Channel::new(8, false);
        let a = channel.attach(8, false, StartPosition::Latest);
        let b = channel.attach(8, false, StartPosition::Latest);
        push(&channel, 1).expect("publish should succeed");
        push(&channel, 2).expect("publish should succeed");
        assert_eq!(channel.try_take(&a).map(|i| i.value), Some(1));
        assert_eq!(channel.try_take(&b).map(|i| i.value), Some(1));
        assert_eq!(channel.try_take(&b).map(|i| i.value), Some(2));
        assert_eq!(channel.try_take(&a).map(|i| i.value), Some(2));
        assert!(channel.try_take(&a).is_none());
    }

    #[test]
    fn test_retained_start_replays_history() {
        let channel = Channel::retaining(4, false);
        for v in 0..6 {
            push(&channel, v).expect("publish should succeed");
        }
        let late = channel.attach(3, false, StartPosition::Retained);
        let values: Vec<u32> = std::iter::from_fn(|| channel.try_take(&late))
            .map(|item| item.value)
            .collect();
        assert_eq!(values, vec![3, 4, 5]);

        let volatile = channel.attach(3, false, StartPosition::Latest);
        assert!(channel.try_take(&volatile).is_none());
    }

    #[test]
    fn test_taken_payloads_are_released() {
        let channel = Channel::new(8, false);
        let fast = channel.attach(8, false, StartPosition::Latest);
        let slow = channel.attach(8, false, StartPosition::Latest);
        for v in 0..3 {
            push(&channel, v).expect("publish should succeed");
        }
        assert_eq!(channel.occupied(), 3);

        while channel.try_take(&fast).is_some() {}
        // `slow` still needs all three.
        assert_eq!(channel.occupied(), 3);

        let first = channel.try_take(&slow).expect("message should be ready");
        assert_eq!(first.value, 0);
        assert_eq!(channel.occupied(), 2);
        while channel.try_take(&slow).is_some() {}
        assert_eq!(channel.occupied(), 0);

        // The consumer's own handle outlives the slot.
        assert_eq!(Arc::strong_count(&first), 1);
    }

    #[test]
    fn test_unread_payloads_released_without_cursors() {
        let channel = Channel::new(4, false);
        push(&channel, 0).expect("publish should succeed");
        assert_eq!(channel.occupied(), 0);

        let cursor = channel.attach(4, false, StartPosition::Latest);
        push(&channel, 1).expect("publish should succeed");
        push(&channel, 2).expect("publish should succeed");
        assert_eq!(channel.occupied(), 2);
        channel.detach(&cursor);
        assert_eq!(channel.occupied(), 0);
    }

    #[test]
    fn test_skipped_payloads_are_released() {
        let channel = Channel::new(4, false);
        let cursor = channel.attach(2, false, StartPosition::Latest);
        for v in 0..4 {
            push(&channel, v).expect("publish should succeed");
        }
        assert_eq!(channel.occupied(), 4);
        assert_eq!(channel.try_take(&cursor).map(|i| i.value), Some(2));
        assert_eq!(channel.occupied(), 1);
        assert_eq!(cursor.dropped(), 2);
    }

    #[test]
    fn test_retaining_ring_keeps_history() {
        let channel = Channel::retaining(4, false);
        let cursor = channel.attach(4, false, StartPosition::Latest);
        for v in 0..6 {
            push(&channel, v).expect("publish should succeed");
        }
        while channel.try_take(&cursor).is_some() {}
        assert_eq!(channel.occupied(), 4);
        assert!(channel.is_retaining());

        // Storage rounds 3 up to 4; only the history depth stays pinned.
        let channel = Channel::retaining(3, false);
        let cursor = channel.attach(3, false, StartPosition::Latest);
        for v in 0..10 {
            push(&channel, v).expect("publish should succeed");
            assert!(channel.try_take(&cursor).is_some());
        }
        assert_eq!(channel.occupied(), 3);
        let late = channel.attach(3, false, StartPosition::Retained);
        let values: Vec<u32> = std::iter::from_fn(|| channel.try_take(&late))
            .map(|item| item.value)
            .collect();
        assert_eq!(values, vec![7, 8, 9]);
    }

    #[test]
    fn test_retained_start_on_plain_ring_starts_at_tail() {
        let channel = Channel::new(4, false);
        push(&channel, 0).expect("publish should succeed");
        let late = channel.attach(4, false, StartPosition::Retained);
        assert!(channel.try_take(&late).is_none());
        assert_eq!(late.dropped(), 0);
    }

    #[test]
    fn test_reliable_full_times_out() {
        let channel = Channel::new(2, true);
        let _cursor = channel.attach(2, true, StartPosition::Latest);
        push(&channel, 0).expect("publish should succeed");
        push(&channel, 1).expect("publish should succeed");
        assert_eq!(push(&channel, 2), Err(Error::Timeout));
        // Timed-out publish claimed nothing.
        assert_eq!(channel.tail(), 2);
    }

    #[test]
    fn test_reliable_unblocks_when_consumer_takes() {
        let channel = Arc::new(Channel::new(2, true));
        let cursor = channel.attach(2, true, StartPosition::Latest);
        push(&channel, 0).expect("publish should succeed");
        push(&channel, 1).expect("publish should succeed");

        let consumer = {
            let channel = Arc::clone(&channel);
            let cursor = Arc::clone(&cursor);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                channel.try_take(&cursor).map(|i| i.value)
            })
        };
        let seq = channel
            .publish(|seq| Item { seq, value: 2 }, Duration::from_secs(5))
            .expect("publish should unblock")
            .seq;
        assert_eq!(seq, 2);
        assert_eq!(consumer.join().expect("consumer panicked"), Some(0));
    }

    #[test]
    fn test_detach_releases_blocked_producer() {
        let channel = Channel::new(1, true);
        let cursor = channel.attach(1, true, StartPosition::Latest);
        push(&channel, 0).expect("publish should succeed");
        channel.detach(&cursor);
        assert!(cursor.is_closed());
        assert!(channel
            .publish(|seq| Item { seq, value: 1 }, NO_WAIT)
            .is_ok());
    }

    #[test]
    fn test_closed_channel_rejects_publish() {
        let channel = Channel::new(4, false);
        let cursor = channel.attach(4, false, StartPosition::Latest);
        channel.close();
        assert!(cursor.is_closed());
        assert_eq!(push(&channel, 1), Err(Error::ChannelClosed));
    }

    #[test]
    fn test_mpmc_reliable_no_loss_no_duplicates() {
        const PRODUCERS: u32 = 4;
        const PER_PRODUCER: u32 = 5_000;

        let channel = Arc::new(Channel::<Item>::new(64, true));
        let cursor = channel.attach(64, true, StartPosition::Latest);

        let consumers: Vec<_> = (0..2)
            .map(|_| {
                let channel = Arc::clone(&channel);
                let cursor = Arc::clone(&cursor);
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    loop {
                        match channel.try_take(&cursor) {
                            Some(item) => seen.push(item.seq),
                            None if channel.is_closed() && channel.pending(&cursor) == 0 => {
                                break
                            }
                            None => {
                                cursor.signal().wait_timeout(Duration::from_millis(5));
                            }
                        }
                    }
                    seen
                })
            })
            .collect();

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let channel = Arc::clone(&channel);
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        channel
                            .publish(
                                |seq| Item {
                                    seq,
                                    value: p * PER_PRODUCER + i,
                                },
                                Duration::from_secs(10),
                            )
                            .expect("reliable publish should succeed");
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().expect("producer panicked");
        }
        while channel.pending(&cursor) > 0 {
            thread::sleep(Duration::from_millis(1));
        }
        channel.close();

        let mut all = HashSet::new();
        for consumer in consumers {
            let seen = consumer.join().expect("consumer panicked");
            assert!(seen.windows(2).all(|w| w[0] < w[1]), "per-thread order");
            for seq in seen {
                assert!(all.insert(seq), "duplicate sequence {}", seq);
            }
        }
        assert_eq!(all.len(), (PRODUCERS * PER_PRODUCER) as usize);
        assert_eq!(cursor.dropped(), 0);
    }
}
