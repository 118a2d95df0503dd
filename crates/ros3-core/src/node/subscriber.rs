// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed subscriber.
//!
//! A subscriber owns one cursor on its topic channel. Its queue holds at most
//! `history_depth` messages: under BestEffort older ones are skipped and
//! counted in [`SubscriberStats::dropped`], under Reliable publishers wait.
//!
//! Receive flavours:
//! - [`Subscriber::recv`] / [`Subscriber::recv_timeout`]: async, woken by
//!   `tokio::sync::Notify` on publish and close
//! - [`Subscriber::recv_blocking`]: parks the calling thread
//! - [`Subscriber::try_recv`]: never waits

use super::topic::Topic;
use crate::codec::{ArchiveCodec, CdrCodec, Codec};
use crate::core::rt::{ChannelCursor, StartPosition};
use crate::envelope::{now_ns, EndpointId, Envelope};
use crate::error::{Error, Result};
use crate::qos::QoS;
use crate::telemetry::{LatencySnapshot, LatencyTracker, SubscriberStats};
use crate::types::Message;
use bytemuck::Pod;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A received value with its envelope metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample<M> {
    pub value: M,
    /// Sequence on the local topic.
    pub sequence: u64,
    pub publisher: EndpointId,
    /// Publish time, nanoseconds since the UNIX epoch.
    pub timestamp_ns: u64,
}

/// Receives `M` values from one topic, decoded with `C`.
pub struct Subscriber<M, C = CdrCodec> {
    topic: Arc<Topic>,
    codec: C,
    cursor: Arc<ChannelCursor>,
    id: EndpointId,
    qos: QoS,
    received: AtomicU64,
    latency: Option<LatencyTracker>,
    closed: AtomicBool,
    _marker: PhantomData<fn() -> M>,
}

impl<M, C> Subscriber<M, C>
where
    M: Message,
    C: Codec<M>,
{
    pub(crate) fn new(
        topic: Arc<Topic>,
        codec: C,
        id: EndpointId,
        qos: QoS,
        track_latency: bool,
    ) -> Self {
        let start = if qos.is_transient_local() {
            StartPosition::Retained
        } else {
            StartPosition::Latest
        };
        let cursor = topic
            .channel
            .attach(qos.history_depth, qos.is_reliable(), start);
        topic.add_subscriber(id.local);
        log::debug!(
            "[topic] {} +subscriber {} ({}, {} pending)",
            topic.name,
            id,
            qos,
            topic.channel.pending(&cursor)
        );

        Self {
            topic,
            codec,
            cursor,
            id,
            qos,
            received: AtomicU64::new(0),
            latency: track_latency.then(LatencyTracker::new),
            closed: AtomicBool::new(false),
            _marker: PhantomData,
        }
    }

    /// Wait for the next message.
    ///
    /// # Errors
    /// - [`Error::ChannelClosed`] once the subscriber, topic or node closes
    /// - [`Error::DecodeError`] for a payload the codec rejects (the message is consumed)
    pub async fn recv(&self) -> Result<M> {
        let envelope = self.next_envelope().await?;
        self.decode(&envelope)
    }

    /// [`Subscriber::recv`] with a deadline.
    ///
    /// # Errors
    /// [`Error::Timeout`] when nothing arrives within `timeout`, otherwise as `recv`.
    pub async fn recv_timeout(&self, timeout: Duration) -> Result<M> {
        tokio::time::timeout(timeout, self.recv())
            .await
            .map_err(|_| Error::Timeout)?
    }

    /// Block the calling thread until a message arrives or `timeout` elapses.
    ///
    /// # Errors
    /// [`Error::Timeout`], [`Error::ChannelClosed`] or [`Error::DecodeError`].
    pub fn recv_blocking(&self, timeout: Duration) -> Result<M> {
        let envelope = self.next_envelope_blocking(timeout)?;
        self.decode(&envelope)
    }

    /// Take a message if one is ready.
    ///
    /// # Errors
    /// [`Error::ChannelClosed`] or [`Error::DecodeError`].
    pub fn try_recv(&self) -> Result<Option<M>> {
        match self.take()? {
            Some(envelope) => self.decode(&envelope).map(Some),
            None => Ok(None),
        }
    }

    pub async fn recv_sample(&self) -> Result<Sample<M>> {
        let envelope = self.next_envelope().await?;
        self.sample(&envelope)
    }

    pub async fn recv_sample_timeout(&self, timeout: Duration) -> Result<Sample<M>> {
        tokio::time::timeout(timeout, self.recv_sample())
            .await
            .map_err(|_| Error::Timeout)?
    }

    pub fn recv_sample_blocking(&self, timeout: Duration) -> Result<Sample<M>> {
        let envelope = self.next_envelope_blocking(timeout)?;
        self.sample(&envelope)
    }

    pub fn try_recv_sample(&self) -> Result<Option<Sample<M>>> {
        match self.take()? {
            Some(envelope) => self.sample(&envelope).map(Some),
            None => Ok(None),
        }
    }

    fn decode(&self, envelope: &Envelope) -> Result<M> {
        self.codec
            .decode(envelope.payload.as_slice(), &self.topic.descriptor)
            .map_err(|e| {
                log::debug!(
                    "[topic] {} seq {} failed to decode: {}",
                    self.topic.name,
                    envelope.sequence,
                    e
                );
                e
            })
    }

    fn sample(&self, envelope: &Envelope) -> Result<Sample<M>> {
        Ok(Sample {
            value: self.decode(envelope)?,
            sequence: envelope.sequence,
            publisher: envelope.publisher,
            timestamp_ns: envelope.timestamp_ns,
        })
    }

    async fn next_envelope(&self) -> Result<Arc<Envelope>> {
        loop {
            let notified = self.cursor.signal().notified();
            tokio::pin!(notified);
            // Register before checking so a publish in between is not lost.
            notified.as_mut().enable();

            if let Some(envelope) = self.take()? {
                return Ok(envelope);
            }
            notified.await;
        }
    }

    fn next_envelope_blocking(&self, timeout: Duration) -> Result<Arc<Envelope>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(envelope) = self.take()? {
                return Ok(envelope);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(Error::Timeout);
            }
            self.cursor.signal().wait_timeout(deadline - now);
        }
    }
}

impl<M, C> Subscriber<M, C> {
    fn take(&self) -> Result<Option<Arc<Envelope>>> {
        if self.is_closed() {
            return Err(Error::ChannelClosed);
        }
        let Some(envelope) = self.topic.channel.try_take(&self.cursor) else {
            return Ok(None);
        };
        self.received.fetch_add(1, Ordering::Relaxed);
        if let Some(latency) = &self.latency {
            latency.record_span(envelope.timestamp_ns, now_ns());
        }
        Ok(Some(envelope))
    }

    /// Absolute topic name.
    pub fn topic(&self) -> &str {
        &self.topic.name
    }

    pub fn id(&self) -> EndpointId {
        self.id
    }

    /// QoS this subscriber requested.
    pub fn qos(&self) -> QoS {
        self.qos
    }

    /// Messages ready to take (at most `history_depth`).
    pub fn pending(&self) -> usize {
        self.topic.channel.pending(&self.cursor)
    }

    pub fn stats(&self) -> SubscriberStats {
        SubscriberStats {
            received: self.received.load(Ordering::Relaxed),
            dropped: self.cursor.dropped(),
        }
    }

    /// Publish-to-receive latency, when the node tracks it.
    pub fn latency(&self) -> Option<LatencySnapshot> {
        self.latency.as_ref().map(LatencyTracker::snapshot)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.cursor.is_closed()
    }

    /// Detach from the topic; pending and later receives fail with
    /// `ChannelClosed`.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.topic.channel.detach(&self.cursor);
        self.topic.remove_subscriber(self.id.local);
        log::debug!(
            "[topic] {} -subscriber {} (received={}, dropped={})",
            self.topic.name,
            self.id,
            self.received.load(Ordering::Relaxed),
            self.cursor.dropped()
        );
    }
}

impl<M> Subscriber<M, ArchiveCodec>
where
    M: Message + Pod,
{
    /// Take the next message without copying it out of its buffer.
    ///
    /// # Errors
    /// [`Error::ChannelClosed`], or [`Error::DecodeError`] when the payload
    /// does not have the size and alignment of `M`.
    pub fn try_recv_archived(&self) -> Result<Option<Archived<M>>> {
        match self.take()? {
            Some(envelope) => Archived::new(envelope).map(Some),
            None => Ok(None),
        }
    }
}

impl<M, C> Drop for Subscriber<M, C> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<M, C> fmt::Debug for Subscriber<M, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("topic", &self.topic.name)
            .field("id", &self.id)
            .field("qos", &self.qos)
            .field("pending", &self.pending())
            .finish()
    }
}

/// Borrowed view of an archived message inside its envelope buffer.
pub struct Archived<M> {
    envelope: Arc<Envelope>,
    _marker: PhantomData<fn() -> M>,
}

impl<M: Pod> Archived<M> {
    fn new(envelope: Arc<Envelope>) -> Result<Self> {
        ArchiveCodec::view::<M>(envelope.payload.as_slice())?;
        Ok(Self {
            envelope,
            _marker: PhantomData,
        })
    }

    pub fn sequence(&self) -> u64 {
        self.envelope.sequence
    }

    pub fn publisher(&self) -> EndpointId {
        self.envelope.publisher
    }

    pub fn timestamp_ns(&self) -> u64 {
        self.envelope.timestamp_ns
    }
}

impl<M: Pod> Deref for Archived<M> {
    type Target = M;

    fn deref(&self) -> &M {
        // Size and alignment were checked in `new`; the payload is immutable.
        bytemuck::from_bytes(self.envelope.payload.as_slice())
    }
}

impl<M: Pod + fmt::Debug> fmt::Debug for Archived<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archived")
            .field("sequence", &self.sequence())
            .field("value", &**self)
            .finish()
    }
}
