// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed publisher.

use super::topic::Topic;
use super::NodeInner;
use crate::codec::{CdrCodec, Codec, Format};
use crate::envelope::{now_ns, EndpointId, Envelope};
use crate::error::{Error, Result};
use crate::qos::QoS;
use crate::telemetry::{PublisherCounters, PublisherStats};
use crate::types::Message;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Sends `M` values on one topic, encoded with `C`.
///
/// `publish` takes `&self` and may be called from many threads at once; all
/// publishers of a topic share its sequence counter.
pub struct Publisher<M, C = CdrCodec> {
    node: Arc<NodeInner>,
    topic: Arc<Topic>,
    codec: C,
    id: EndpointId,
    qos: QoS,
    counters: PublisherCounters,
    closed: AtomicBool,
    _marker: PhantomData<fn(&M)>,
}

impl<M, C> Publisher<M, C>
where
    M: Message,
    C: Codec<M>,
{
    pub(crate) fn new(node: Arc<NodeInner>, topic: Arc<Topic>, codec: C, qos: QoS) -> Self {
        let id = node.next_endpoint_id();
        topic.add_publisher(id.local);
        log::debug!("[topic] {} +publisher {} ({})", topic.name, id, qos);
        Self {
            node,
            topic,
            codec,
            id,
            qos,
            counters: PublisherCounters::default(),
            closed: AtomicBool::new(false),
            _marker: PhantomData,
        }
    }

    /// Encode and publish `message`; returns its per-topic sequence number.
    ///
    /// On a session that delivers to other nodes the envelope is also handed
    /// to the transport; a transport error is returned after local
    /// subscribers already have the message.
    ///
    /// # Errors
    /// - [`Error::ChannelClosed`] after `close()` or node stop
    /// - [`Error::BufferPoolExhausted`] under a blocking pool policy
    /// - [`Error::EncodeError`] when the codec rejects the value
    /// - [`Error::Timeout`] when a Reliable subscriber (local, or behind a
    ///   reliable hub mailbox) stays full, or the transport keeps failing
    pub fn publish(&self, message: &M) -> Result<u64> {
        if self.is_closed() {
            return Err(Error::ChannelClosed);
        }

        let mut payload = self.node.pool.checkout()?;
        self.codec
            .encode(message, &self.topic.descriptor, &mut payload)?;
        let bytes = payload.len();

        let envelope = self.topic.channel.publish(
            |sequence| Envelope {
                sequence,
                publisher: self.id,
                format: self.topic.format,
                type_hash: self.topic.type_hash,
                timestamp_ns: now_ns(),
                payload,
            },
            self.node.config.reliable_block_timeout,
        )?;
        self.counters.record(bytes);
        log::trace!(
            "[topic] {} seq {} published by {} ({} bytes)",
            self.topic.name,
            envelope.sequence,
            self.id,
            bytes
        );

        if self.node.remote {
            self.node.session.send(&self.topic.name, &envelope)?;
        }
        Ok(envelope.sequence)
    }
}

impl<M, C> Publisher<M, C> {
    /// Absolute topic name.
    pub fn topic(&self) -> &str {
        &self.topic.name
    }

    pub fn id(&self) -> EndpointId {
        self.id
    }

    /// QoS this publisher was bound with.
    pub fn qos(&self) -> QoS {
        self.qos
    }

    pub fn format(&self) -> Format {
        self.topic.format
    }

    pub fn stats(&self) -> PublisherStats {
        self.counters.snapshot()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.topic.is_closed()
    }

    /// Unbind from the topic. Later `publish` calls fail with `ChannelClosed`.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.topic.remove_publisher(self.id.local);
        log::debug!("[topic] {} -publisher {}", self.topic.name, self.id);
    }
}

impl<M, C> Drop for Publisher<M, C> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<M, C> fmt::Debug for Publisher<M, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("topic", &self.topic.name)
            .field("id", &self.id)
            .field("qos", &self.qos)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}
