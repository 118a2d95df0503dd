// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport layer.
//!
//! A [`Transport`] is a factory registered on the node builder under a
//! backend name; opening it yields the node's single [`Session`]. Sessions
//! move [`Envelope`]s between nodes. Delivery inside one node never goes
//! through a session: it is the topic channel itself.
//!
//! # Modules
//!
//! - `local` - in-process hub ([`LocalTransport`]), private or shared
//! - `network` - adapter over an opaque byte-level [`NetworkBackend`]
//!
//! # Example
//!
//! ```
//! use ros3_core::transport::{LocalTransport, NodeIdentity, Transport};
//!
//! let hub = LocalTransport::shared();
//! let a = hub.open(&NodeIdentity::new("a", 1)).unwrap();
//! let b = hub.clone().open(&NodeIdentity::new("b", 2)).unwrap();
//! assert!(a.delivers_remote());
//! assert_eq!(b.discover_peers().unwrap()[0].name, "a");
//! ```

/// In-process hub transport.
pub mod local;
/// Opaque network backend adapter with retry.
pub mod network;

pub use local::LocalTransport;
pub use network::{NetworkBackend, NetworkTransport, RetryPolicy};

use crate::envelope::Envelope;
use crate::error::Result;
use crate::qos::QoS;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Who is opening a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeIdentity {
    pub name: String,
    pub node_id: u64,
}

impl NodeIdentity {
    pub fn new(name: impl Into<String>, node_id: u64) -> Self {
        Self {
            name: name.into(),
            node_id,
        }
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:016x})", self.name, self.node_id)
    }
}

/// A node reachable through a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    pub node_id: u64,
    pub name: String,
    /// Backend the peer was seen on.
    pub backend: String,
}

/// Session factory, one per backend name.
pub trait Transport: Send + Sync {
    /// Backend name (`"local"`, ...).
    fn name(&self) -> &str;

    /// Open the session a node will use for its whole lifetime.
    ///
    /// # Errors
    /// Backend-specific; network backends surface [`crate::Error::Timeout`]
    /// when connecting keeps failing.
    fn open(&self, identity: &NodeIdentity) -> Result<Arc<dyn Session>>;
}

/// A node's attachment to a backend.
pub trait Session: Send + Sync {
    /// Hand an envelope to every other node interested in `topic`.
    fn send(&self, topic: &str, envelope: &Envelope) -> Result<()>;

    /// Next envelope for `topic` from another node.
    ///
    /// # Errors
    /// - [`crate::Error::Timeout`] when nothing arrives within `timeout`
    /// - [`crate::Error::ChannelClosed`] once the session is closed
    fn recv(&self, topic: &str, timeout: Duration) -> Result<Arc<Envelope>>;

    /// Declare interest in `topic` before the first `recv`.
    ///
    /// Envelopes sent after this call are queued for the session. A backend
    /// that queues must honor `qos`: a Reliable topic loses nothing, and a
    /// sender that cannot enqueue gets [`crate::Error::Timeout`].
    fn register(&self, _topic: &str, _qos: &QoS) -> Result<()> {
        Ok(())
    }

    fn discover_peers(&self) -> Result<Vec<PeerInfo>>;

    /// Stop delivery; pending and later `recv` calls fail with `ChannelClosed`.
    fn close(&self);

    /// Whether envelopes from other nodes arrive here (the node then runs
    /// receive pumps).
    fn delivers_remote(&self) -> bool;
}
