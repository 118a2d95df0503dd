// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Network transport over an opaque backend.
//!
//! The backend only moves bytes per topic (`connect`/`send`/`recv`/
//! `discover`); this module owns framing ([`Envelope::encode_frame`]) and the
//! retry discipline. Every backend error is treated as transient and retried
//! with exponential backoff; when the attempts run out the caller gets
//! [`Error::Timeout`].

use super::{NodeIdentity, PeerInfo, Session, Transport};
use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::qos::QoS;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Byte-level contract of a network backend.
///
/// Implementations must be safe to call from several threads: the node sends
/// from publisher threads and receives from one pump thread per topic.
pub trait NetworkBackend: Send + Sync + 'static {
    /// Join the network as `identity`.
    fn connect(&self, identity: &NodeIdentity) -> io::Result<()>;

    /// Send one frame on `topic`.
    fn send(&self, topic: &str, frame: &[u8]) -> io::Result<()>;

    /// Wait up to `timeout` for the next frame on `topic`.
    ///
    /// `Ok(None)` means nothing arrived in time.
    fn recv(&self, topic: &str, timeout: Duration) -> io::Result<Option<Vec<u8>>>;

    /// Nodes currently visible.
    fn discover(&self) -> io::Result<Vec<PeerInfo>>;

    /// Start receiving `topic`.
    fn subscribe(&self, _topic: &str) -> io::Result<()> {
        Ok(())
    }

    /// Leave the network.
    fn disconnect(&self) {}
}

/// Exponential backoff for backend calls.
///
/// Delay before retry `n` (1-based) is `initial_backoff * 2^(n-1)`, capped at
/// `max_backoff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total tries, including the first one (>= 1).
    pub attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 4,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            initial_backoff,
            max_backoff,
        }
    }

    /// One try, no retry.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }

    /// Run `op` until it succeeds or the attempts are spent.
    ///
    /// # Errors
    /// [`Error::Timeout`] after the last failed attempt.
    pub fn run<T, F>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> io::Result<T>,
    {
        let attempts = self.attempts.max(1);
        let mut retry = 0;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) => {
                    retry += 1;
                    if retry >= attempts {
                        log::warn!(
                            "[transport] {} failed after {} attempts: {}",
                            what,
                            attempts,
                            e
                        );
                        return Err(Error::Timeout);
                    }
                    let delay = self.backoff(retry);
                    log::warn!(
                        "[transport] {} failed ({}), retry {}/{} in {:?}",
                        what,
                        e,
                        retry,
                        attempts - 1,
                        delay
                    );
                    std::thread::sleep(delay);
                }
            }
        }
    }
}

/// [`Transport`] adapter over a [`NetworkBackend`].
pub struct NetworkTransport<B> {
    name: String,
    backend: Arc<B>,
    retry: RetryPolicy,
}

impl<B: NetworkBackend> NetworkTransport<B> {
    pub fn new(name: impl Into<String>, backend: B) -> Self {
        Self::from_arc(name, Arc::new(backend))
    }

    /// Wrap a backend the caller keeps a handle on.
    pub fn from_arc(name: impl Into<String>, backend: Arc<B>) -> Self {
        Self {
            name: name.into(),
            backend,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }
}

impl<B: NetworkBackend> Transport for NetworkTransport<B> {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self, identity: &NodeIdentity) -> Result<Arc<dyn Session>> {
        self.retry
            .run("connect", || self.backend.connect(identity))?;
        log::info!("[transport] {} connected to {}", identity, self.name);
        Ok(Arc::new(NetworkSession {
            backend: Arc::clone(&self.backend),
            identity: identity.clone(),
            retry: self.retry,
            closed: AtomicBool::new(false),
            frames_sent: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
        }))
    }
}

struct NetworkSession<B> {
    backend: Arc<B>,
    identity: NodeIdentity,
    retry: RetryPolicy,
    closed: AtomicBool,
    frames_sent: AtomicU64,
    frames_received: AtomicU64,
}

impl<B> NetworkSession<B> {
    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(Error::ChannelClosed)
        } else {
            Ok(())
        }
    }
}

impl<B: NetworkBackend> Session for NetworkSession<B> {
    fn send(&self, topic: &str, envelope: &Envelope) -> Result<()> {
        self.check_open()?;
        let frame = envelope.encode_frame()?;
        self.retry.run("send", || self.backend.send(topic, &frame))?;
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        log::trace!(
            "[transport] sent {} bytes on {} (seq {})",
            frame.len(),
            topic,
            envelope.sequence
        );
        Ok(())
    }

    fn recv(&self, topic: &str, timeout: Duration) -> Result<Arc<Envelope>> {
        self.check_open()?;
        let frame = self
            .retry
            .run("recv", || self.backend.recv(topic, timeout))?;
        // Closed while the backend was waiting.
        self.check_open()?;
        let frame = frame.ok_or(Error::Timeout)?;
        let envelope = Envelope::decode_frame(&frame)?;
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        Ok(Arc::new(envelope))
    }

    fn register(&self, topic: &str, _qos: &QoS) -> Result<()> {
        self.check_open()?;
        self.retry.run("subscribe", || self.backend.subscribe(topic))
    }

    fn discover_peers(&self) -> Result<Vec<PeerInfo>> {
        self.check_open()?;
        let peers = self.retry.run("discover", || self.backend.discover())?;
        Ok(peers
            .into_iter()
            .filter(|peer| peer.node_id != self.identity.node_id)
            .collect())
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.backend.disconnect();
        log::info!(
            "[transport] {} disconnected (sent={}, received={})",
            self.identity,
            self.frames_sent.load(Ordering::Relaxed),
            self.frames_received.load(Ordering::Relaxed)
        );
    }

    fn delivers_remote(&self) -> bool {
        true
    }
}
