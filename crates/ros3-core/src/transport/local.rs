// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process transport.
//!
//! [`LocalTransport::new`] gives each node a private hub: nothing leaves the
//! node and no receive pumps run. [`LocalTransport::shared`] gives a hub that
//! every clone of the handle joins; a send enqueues a copy into the mailbox
//! of every *other* session that registered the topic.
//!
//! Mailboxes are [`Channel`]s with the reliability of the registered topic.
//! A best-effort mailbox drops the oldest envelopes for a slow receiver. A
//! reliable one makes the sender wait up to the hub's block timeout and then
//! fail with [`Error::Timeout`].

use super::{NodeIdentity, PeerInfo, Session, Transport};
use crate::core::rt::{Channel, ChannelCursor, StartPosition};
use crate::config::DEFAULT_RELIABLE_BLOCK_TIMEOUT;
use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::qos::QoS;
use arc_swap::ArcSwap;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Envelopes buffered per session and topic.
pub const DEFAULT_MAILBOX_DEPTH: usize = 256;

const BACKEND_NAME: &str = "local";

/// Process-local transport (see module docs).
#[derive(Clone)]
pub struct LocalTransport {
    hub: Option<Arc<Hub>>,
}

struct Hub {
    sessions: ArcSwap<Vec<Arc<LocalSession>>>,
    mailbox_depth: usize,
    /// How long a send waits on a full reliable mailbox.
    block_timeout: Duration,
}

struct Mailbox {
    channel: Channel<Envelope>,
    cursor: Arc<ChannelCursor>,
}

impl Mailbox {
    fn new(depth: usize, reliable: bool) -> Self {
        let channel = Channel::new(depth, reliable);
        let cursor = channel.attach(depth, reliable, StartPosition::Latest);
        Self { channel, cursor }
    }
}

struct LocalSession {
    identity: NodeIdentity,
    hub: Option<Arc<Hub>>,
    mailboxes: DashMap<String, Arc<Mailbox>>,
    closed: AtomicBool,
}

impl LocalTransport {
    /// Private hub: intra-node delivery only.
    pub fn new() -> Self {
        Self { hub: None }
    }

    /// Hub shared by every clone of the returned handle.
    pub fn shared() -> Self {
        Self::shared_with_depth(DEFAULT_MAILBOX_DEPTH)
    }

    /// Shared hub with a custom per-topic mailbox depth.
    pub fn shared_with_depth(mailbox_depth: usize) -> Self {
        Self::shared_with(mailbox_depth, DEFAULT_RELIABLE_BLOCK_TIMEOUT)
    }

    /// Shared hub with a custom mailbox depth and reliable-send timeout.
    pub fn shared_with(mailbox_depth: usize, block_timeout: Duration) -> Self {
        Self {
            hub: Some(Arc::new(Hub {
                sessions: ArcSwap::from_pointee(Vec::new()),
                mailbox_depth: mailbox_depth.max(1),
                block_timeout,
            })),
        }
    }

    pub fn is_shared(&self) -> bool {
        self.hub.is_some()
    }

    /// Sessions currently attached to the hub (0 for a private transport).
    pub fn session_count(&self) -> usize {
        self.hub.as_ref().map_or(0, |hub| hub.sessions.load().len())
    }
}

impl Default for LocalTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for LocalTransport {
    fn name(&self) -> &str {
        BACKEND_NAME
    }

    fn open(&self, identity: &NodeIdentity) -> Result<Arc<dyn Session>> {
        let session = Arc::new(LocalSession {
            identity: identity.clone(),
            hub: self.hub.clone(),
            mailboxes: DashMap::new(),
            closed: AtomicBool::new(false),
        });

        if let Some(hub) = &self.hub {
            hub.sessions.rcu(|current| {
                let mut next = Vec::clone(current);
                next.push(Arc::clone(&session));
                next
            });
            log::debug!(
                "[transport] {} joined local hub ({} sessions)",
                identity,
                hub.sessions.load().len()
            );
        }
        Ok(session)
    }
}

impl LocalSession {
    /// The topic's mailbox, created on first use; the first registration
    /// fixes its reliability.
    fn mailbox(&self, topic: &str, reliable: bool) -> Option<Arc<Mailbox>> {
        let hub = self.hub.as_ref()?;
        let entry = self
            .mailboxes
            .entry(topic.to_string())
            .or_insert_with(|| Arc::new(Mailbox::new(hub.mailbox_depth, reliable)));
        Some(Arc::clone(entry.value()))
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Session for LocalSession {
    fn send(&self, topic: &str, envelope: &Envelope) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ChannelClosed);
        }
        let Some(hub) = &self.hub else {
            return Ok(());
        };

        let mut outcome = Ok(());
        for peer in hub.sessions.load().iter() {
            if std::ptr::eq(Arc::as_ptr(peer), self) || peer.is_closed() {
                continue;
            }
            let Some(mailbox) = peer.mailboxes.get(topic).map(|m| Arc::clone(m.value())) else {
                continue;
            };
            match mailbox
                .channel
                .publish(|seq| envelope.resequenced(seq), hub.block_timeout)
            {
                Ok(_) => log::trace!(
                    "[transport] {} -> {} on {} (seq {})",
                    self.identity.name,
                    peer.identity.name,
                    topic,
                    envelope.sequence
                ),
                // A peer closing concurrently is not the sender's failure.
                Err(Error::ChannelClosed) => {}
                Err(e) => {
                    log::debug!(
                        "[transport] {} -> {} on {} failed: {}",
                        self.identity.name,
                        peer.identity.name,
                        topic,
                        e
                    );
                    outcome = Err(e);
                }
            }
        }
        outcome
    }

    fn recv(&self, topic: &str, timeout: Duration) -> Result<Arc<Envelope>> {
        if self.is_closed() {
            return Err(Error::ChannelClosed);
        }
        let Some(mailbox) = self.mailbox(topic, false) else {
            // Private hub: nothing can ever arrive.
            std::thread::sleep(timeout);
            return Err(Error::Timeout);
        };

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(envelope) = mailbox.channel.try_take(&mailbox.cursor) {
                return Ok(envelope);
            }
            if mailbox.cursor.is_closed() || self.is_closed() {
                return Err(Error::ChannelClosed);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(Error::Timeout);
            }
            mailbox.cursor.signal().wait_timeout(deadline - now);
        }
    }

    fn register(&self, topic: &str, qos: &QoS) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ChannelClosed);
        }
        self.mailbox(topic, qos.is_reliable());
        Ok(())
    }

    fn discover_peers(&self) -> Result<Vec<PeerInfo>> {
        let Some(hub) = &self.hub else {
            return Ok(Vec::new());
        };
        Ok(hub
            .sessions
            .load()
            .iter()
            .filter(|peer| !std::ptr::eq(Arc::as_ptr(peer), self) && !peer.is_closed())
            .map(|peer| PeerInfo {
                node_id: peer.identity.node_id,
                name: peer.identity.name.clone(),
                backend: BACKEND_NAME.to_string(),
            })
            .collect())
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        for mailbox in self.mailboxes.iter() {
            mailbox.channel.close();
        }
        if let Some(hub) = &self.hub {
            hub.sessions.rcu(|current| {
                current
                    .iter()
                    .filter(|peer| !std::ptr::eq(Arc::as_ptr(peer), self))
                    .cloned()
                    .collect::<Vec<_>>()
            });
            log::debug!("[transport] {} left local hub", self.identity);
        }
    }

    fn delivers_remote(&self) -> bool {
        self.hub.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Format;
    use crate::core::rt::Buffer;
    use crate::envelope::EndpointId;
    use std::thread;

    fn envelope(node: u64, seq: u64, payload: &[u8]) -> Envelope {
        Envelope {
            sequence: seq,
            publisher: EndpointId::new(node, 0),
            format: Format::Cdr,
            type_hash: 7,
            timestamp_ns: 0,
            payload: Buffer::from_slice(payload),
        }
    }

    const SHORT: Duration = Duration::from_millis(20);

    #[test]
    fn test_private_hub_delivers_nothing() {
        let transport = LocalTransport::new();
        let session = transport
            .open(&NodeIdentity::new("solo", 1))
            .expect("open should succeed");
        assert!(!session.delivers_remote());
        session
            .send("/chatter", &envelope(1, 0, b"x"))
            .expect("send should succeed");
        assert!(matches!(session.recv("/chatter", SHORT), Err(Error::Timeout)));
        assert!(session.discover_peers().expect("discover should succeed").is_empty());
    }

    #[test]
    fn test_shared_hub_skips_sender() {
        let hub = LocalTransport::shared();
        let a = hub.open(&NodeIdentity::new("a", 1)).expect("open should succeed");
        let b = hub.open(&NodeIdentity::new("b", 2)).expect("open should succeed");
        a.register("/chatter", &QoS::best_effort()).expect("register should succeed");
        b.register("/chatter", &QoS::best_effort()).expect("register should succeed");

        a.send("/chatter", &envelope(1, 5, b"hello"))
            .expect("send should succeed");

        let got = b.recv("/chatter", SHORT).expect("recv should succeed");
        assert_eq!(got.payload.as_slice(), b"hello");
        assert_eq!(got.publisher.node, 1);
        assert_eq!(got.sequence, 0, "mailbox assigns its own sequence");
        assert!(matches!(a.recv("/chatter", SHORT), Err(Error::Timeout)));
    }

    #[test]
    fn test_unregistered_topic_not_queued() {
        let hub = LocalTransport::shared();
        let a = hub.open(&NodeIdentity::new("a", 1)).expect("open should succeed");
        let b = hub.open(&NodeIdentity::new("b", 2)).expect("open should succeed");

        a.send("/early", &envelope(1, 0, b"lost")).expect("send should succeed");
        b.register("/early", &QoS::best_effort()).expect("register should succeed");
        assert!(matches!(b.recv("/early", SHORT), Err(Error::Timeout)));
    }

    #[test]
    fn test_reliable_mailbox_applies_backpressure() {
        let hub = LocalTransport::shared_with(2, Duration::from_millis(10));
        let a = hub.open(&NodeIdentity::new("a", 1)).expect("open should succeed");
        let b = hub.open(&NodeIdentity::new("b", 2)).expect("open should succeed");
        b.register("/cmd", &QoS::reliable()).expect("register should succeed");

        a.send("/cmd", &envelope(1, 0, b"0")).expect("send should succeed");
        a.send("/cmd", &envelope(1, 1, b"1")).expect("send should succeed");
        assert!(matches!(
            a.send("/cmd", &envelope(1, 2, b"2")),
            Err(Error::Timeout)
        ));

        // Nothing was overwritten; room frees up as the receiver drains.
        let first = b.recv("/cmd", SHORT).expect("recv should succeed");
        assert_eq!(first.payload.as_slice(), b"0");
        a.send("/cmd", &envelope(1, 3, b"3")).expect("send should succeed");
        let rest: Vec<Vec<u8>> = (0..2)
            .map(|_| b.recv("/cmd", SHORT).expect("recv should succeed").payload.as_slice().to_vec())
            .collect();
        assert_eq!(rest, vec![b"1".to_vec(), b"3".to_vec()]);
    }

    #[test]
    fn test_best_effort_mailbox_never_blocks() {
        let hub = LocalTransport::shared_with(2, Duration::from_secs(5));
        let a = hub.open(&NodeIdentity::new("a", 1)).expect("open should succeed");
        let b = hub.open(&NodeIdentity::new("b", 2)).expect("open should succeed");
        b.register("/scan", &QoS::best_effort()).expect("register should succeed");
        for seq in 0..5 {
            a.send("/scan", &envelope(1, seq, &[seq as u8]))
                .expect("send should succeed");
        }
        let got = b.recv("/scan", SHORT).expect("recv should succeed");
        assert_eq!(got.payload.as_slice(), &[3]);
    }

    #[test]
    fn test_peers_and_close() {
        let hub = LocalTransport::shared();
        let a = hub.open(&NodeIdentity::new("a", 1)).expect("open should succeed");
        let b = hub.clone().open(&NodeIdentity::new("b", 2)).expect("open should succeed");
        assert_eq!(hub.session_count(), 2);

        let peers = a.discover_peers().expect("discover should succeed");
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].node_id, 2);
        assert_eq!(peers[0].backend, "local");

        b.close();
        assert_eq!(hub.session_count(), 1);
        assert!(a.discover_peers().expect("discover should succeed").is_empty());
        assert!(matches!(b.recv("/t", SHORT), Err(Error::ChannelClosed)));
    }

    #[test]
    fn test_close_wakes_blocked_recv() {
        let hub = LocalTransport::shared();
        let session = hub.open(&NodeIdentity::new("a", 1)).expect("open should succeed");
        session.register("/t", &QoS::best_effort()).expect("register should succeed");

        let waiter = {
            let session = Arc::clone(&session);
            thread::spawn(move || session.recv("/t", Duration::from_secs(5)))
        };
        thread::sleep(Duration::from_millis(20));
        session.close();
        let result = waiter.join().expect("waiter thread panicked");
        assert!(matches!(result, Err(Error::ChannelClosed)));
    }
}
