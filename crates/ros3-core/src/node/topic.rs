// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-node topic state.

use crate::codec::Format;
use crate::core::rt::Channel;
use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::qos::QoS;
use crate::types::TypeDescriptor;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Snapshot of one topic, as listed by [`crate::Node::topics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicInfo {
    pub name: String,
    pub type_name: String,
    pub format: Format,
    pub qos: QoS,
    pub publishers: usize,
    pub subscribers: usize,
}

#[derive(Debug, Default)]
struct Endpoints {
    publishers: BTreeSet<u32>,
    subscribers: BTreeSet<u32>,
}

/// A named channel with its established schema, format and QoS.
///
/// The first binding fixes all three; later bindings are checked against them.
pub(crate) struct Topic {
    pub(crate) name: String,
    pub(crate) descriptor: Arc<TypeDescriptor>,
    pub(crate) type_hash: u64,
    pub(crate) format: Format,
    pub(crate) qos: QoS,
    pub(crate) channel: Channel<Envelope>,
    endpoints: Mutex<Endpoints>,
    pump_started: AtomicBool,
}

impl Topic {
    pub(crate) fn new(name: String, descriptor: Arc<TypeDescriptor>, format: Format, qos: QoS) -> Self {
        let type_hash = descriptor.type_hash();
        let channel = if qos.is_transient_local() {
            Channel::retaining(qos.history_depth, qos.is_reliable())
        } else {
            Channel::new(qos.history_depth, qos.is_reliable())
        };
        Self {
            channel,
            name,
            descriptor,
            type_hash,
            format,
            qos,
            endpoints: Mutex::new(Endpoints::default()),
            pump_started: AtomicBool::new(false),
        }
    }

    /// Reject a binding whose schema or format differs from the topic's.
    pub(crate) fn check_binding(&self, descriptor: &TypeDescriptor, format: Format) -> Result<()> {
        let hash = descriptor.type_hash();
        if hash == self.type_hash && format == self.format {
            return Ok(());
        }
        log::debug!(
            "[topic] {} rejects {}/{} (established {}/{})",
            self.name,
            descriptor.name,
            format,
            self.descriptor.name,
            self.format
        );
        Err(Error::TypeMismatch {
            topic: self.name.clone(),
            expected: format!("{} ({})", self.descriptor.name, self.format),
            found: format!("{} ({})", descriptor.name, format),
        })
    }

    pub(crate) fn add_publisher(&self, id: u32) {
        self.endpoints.lock().publishers.insert(id);
    }

    pub(crate) fn remove_publisher(&self, id: u32) {
        self.endpoints.lock().publishers.remove(&id);
    }

    pub(crate) fn add_subscriber(&self, id: u32) {
        self.endpoints.lock().subscribers.insert(id);
    }

    pub(crate) fn remove_subscriber(&self, id: u32) {
        self.endpoints.lock().subscribers.remove(&id);
    }

    pub(crate) fn has_pump(&self) -> bool {
        self.pump_started.load(Ordering::Acquire)
    }

    pub(crate) fn mark_pump_started(&self) {
        self.pump_started.store(true, Ordering::Release);
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.channel.is_closed()
    }

    pub(crate) fn close(&self) {
        self.channel.close();
    }

    pub(crate) fn info(&self) -> TopicInfo {
        let endpoints = self.endpoints.lock();
        TopicInfo {
            name: self.name.clone(),
            type_name: self.descriptor.name.clone(),
            format: self.format,
            qos: self.qos,
            publishers: endpoints.publishers.len(),
            subscribers: endpoints.subscribers.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PrimitiveKind, TypeDescriptorBuilder};

    fn point() -> Arc<TypeDescriptor> {
        Arc::new(
            TypeDescriptorBuilder::new("geo::Point")
                .field("x", PrimitiveKind::F64)
                .field("y", PrimitiveKind::F64)
                .build(),
        )
    }

    #[test]
    fn test_binding_checks() {
        let topic = Topic::new("/p".into(), point(), Format::Cdr, QoS::default());
        assert!(topic.check_binding(&point(), Format::Cdr).is_ok());

        let err = topic
            .check_binding(&point(), Format::Json)
            .expect_err("format differs");
        assert!(matches!(err, Error::TypeMismatch { ref topic, .. } if topic == "/p"));

        let other = TypeDescriptorBuilder::new("geo::Point")
            .field("x", PrimitiveKind::F32)
            .build();
        assert!(topic.check_binding(&other, Format::Cdr).is_err());
    }

    #[test]
    fn test_endpoint_accounting() {
        let topic = Topic::new("/p".into(), point(), Format::Cdr, QoS::reliable().keep_last(4));
        topic.add_publisher(1);
        topic.add_subscriber(2);
        topic.add_subscriber(3);
        topic.remove_subscriber(2);

        let info = topic.info();
        assert_eq!(info.type_name, "geo::Point");
        assert_eq!(info.publishers, 1);
        assert_eq!(info.subscribers, 1);
        assert_eq!(info.qos.history_depth, 4);
        assert_eq!(topic.channel.capacity(), 4);
        assert!(!topic.channel.is_retaining());

        assert!(!topic.has_pump());
        topic.mark_pump_started();
        assert!(topic.has_pump());
        topic.close();
        assert!(topic.is_closed());
    }
}
