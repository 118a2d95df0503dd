// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Nodes, topics and typed endpoints.
//!
//! A [`Node`] owns its topic registry (there is no process-wide one), its
//! buffer pool and one transport session. Binding a publisher or subscriber
//! establishes or joins a topic:
//!
//! - the first binding fixes the topic's schema, format and QoS
//! - later bindings with another schema or format fail with `TypeMismatch`
//! - subscribers must request no more than the topic offers (`QosIncompatible`)
//!
//! # Example
//!
//! ```
//! use ros3_core::msgs::StringMsg;
//! use ros3_core::{Node, QoS};
//!
//! let node = Node::new("doc_talker").unwrap();
//! let publisher = node.publish::<StringMsg>("chatter", None).unwrap();
//! let subscriber = node
//!     .subscribe::<StringMsg>("/chatter", Some(QoS::best_effort()))
//!     .unwrap();
//!
//! publisher.publish(&StringMsg::new("hello")).unwrap();
//! assert_eq!(subscriber.try_recv().unwrap().unwrap().data, "hello");
//! node.stop();
//! ```

mod name;
mod publisher;
mod pump;
mod subscriber;
mod topic;

pub use name::normalize_topic_name;
pub use publisher::Publisher;
pub use subscriber::{Archived, Sample, Subscriber};
pub use topic::TopicInfo;

use crate::codec::{CdrCodec, Codec, Format};
use crate::config::{NodeConfig, LOCAL_BACKEND};
use crate::core::rt::{BufferPool, ExhaustionPolicy};
use crate::envelope::{now_ns, EndpointId};
use crate::error::{Error, Result};
use crate::qos::{check_compatible, QoS};
use crate::transport::{LocalTransport, NodeIdentity, PeerInfo, Session, Transport};
use crate::types::{Message, TypeDescriptor};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use name::NameLease;
use parking_lot::Mutex;
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use topic::Topic;

/// State shared by a node and its endpoints.
pub(crate) struct NodeInner {
    name: String,
    node_id: u64,
    backend: String,
    pub(crate) config: NodeConfig,
    pub(crate) pool: BufferPool,
    pub(crate) session: Arc<dyn Session>,
    /// Cached `session.delivers_remote()`.
    pub(crate) remote: bool,
    topics: DashMap<String, Arc<Topic>>,
    /// Pool buffers pinned by transient-local history.
    retained: AtomicUsize,
    next_endpoint: AtomicU32,
    stopped: AtomicBool,
    pumps: Mutex<Vec<JoinHandle<()>>>,
    lease: NameLease,
}

impl NodeInner {
    pub(crate) fn next_endpoint_id(&self) -> EndpointId {
        EndpointId::new(self.node_id, self.next_endpoint.fetch_add(1, Ordering::Relaxed))
    }

    fn check_running(&self) -> Result<()> {
        if self.stopped.load(Ordering::Acquire) {
            Err(Error::ChannelClosed)
        } else {
            Ok(())
        }
    }

    /// Account for the buffers a transient-local topic keeps for replay.
    ///
    /// A blocking pool must keep at least one buffer free for publishing.
    fn reserve_retention(&self, topic: &str, depth: usize) -> Result<()> {
        let pinned = self.retained.fetch_add(depth, Ordering::AcqRel) + depth;
        let capacity = self.pool.capacity();
        match self.pool.policy() {
            ExhaustionPolicy::Block { .. } if pinned >= capacity => {
                self.retained.fetch_sub(depth, Ordering::AcqRel);
                Err(Error::InvalidQos(format!(
                    "transient-local history of {} ({} messages) would pin {} of {} pooled buffers",
                    topic, depth, pinned, capacity
                )))
            }
            _ => {
                if pinned >= capacity {
                    log::warn!(
                        "[node] {} retains {} messages on {} pooled buffers; publishes will allocate",
                        self.name,
                        pinned,
                        capacity
                    );
                }
                Ok(())
            }
        }
    }

    /// Find or create `name`, checking schema and format against an existing topic.
    fn bind_topic(
        &self,
        name: &str,
        descriptor: Arc<TypeDescriptor>,
        format: Format,
        qos: Option<QoS>,
    ) -> Result<Arc<Topic>> {
        self.check_running()?;
        let name = normalize_topic_name(name)?;
        if let Some(qos) = &qos {
            qos.validate()?;
        }

        let topic = match self.topics.entry(name) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                let qos = qos.unwrap_or(self.config.default_qos);
                if qos.is_transient_local() {
                    self.reserve_retention(entry.key(), qos.history_depth)?;
                }
                log::debug!(
                    "[node] {} created topic {} ({}, {}, {})",
                    self.name,
                    entry.key(),
                    descriptor.name,
                    format,
                    qos
                );
                let topic = Arc::new(Topic::new(
                    entry.key().clone(),
                    Arc::clone(&descriptor),
                    format,
                    qos,
                ));
                entry.insert(Arc::clone(&topic));
                topic
            }
        };
        topic.check_binding(&descriptor, format)?;
        Ok(topic)
    }

    fn ensure_pump(&self, topic: &Arc<Topic>) -> Result<()> {
        let mut pumps = self.pumps.lock();
        if topic.has_pump() {
            return Ok(());
        }
        self.session.register(&topic.name, &topic.qos)?;
        let handle = pump::spawn(pump::PumpContext {
            topic: Arc::clone(topic),
            session: Arc::clone(&self.session),
            node_id: self.node_id,
            poll_interval: self.config.recv_poll_interval,
            block_timeout: self.config.reliable_block_timeout,
        })?;
        topic.mark_pump_started();
        pumps.push(handle);
        log::debug!("[node] {} started receive pump for {}", self.name, topic.name);
        Ok(())
    }

    fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        for topic in self.topics.iter() {
            topic.close();
        }
        self.session.close();

        let pumps = std::mem::take(&mut *self.pumps.lock());
        for handle in pumps {
            if handle.join().is_err() {
                log::warn!("[node] {} receive pump panicked", self.name);
            }
        }
        self.topics.clear();
        self.retained.store(0, Ordering::Release);
        self.lease.release();
        log::info!("[node] {} stopped", self.name);
    }
}

/// A participant in the pub/sub graph (see module docs).
///
/// Dropping the node stops it.
pub struct Node {
    inner: Arc<NodeInner>,
}

impl Node {
    /// Node with the default configuration and a private local transport.
    ///
    /// # Errors
    /// [`Error::Config`] if `name` is malformed or already used by a live node.
    pub fn new(name: &str) -> Result<Node> {
        Self::builder(name).build()
    }

    pub fn builder(name: &str) -> NodeBuilder {
        NodeBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// 64-bit identity carried in every envelope this node publishes.
    pub fn node_id(&self) -> u64 {
        self.inner.node_id
    }

    pub fn backend(&self) -> &str {
        &self.inner.backend
    }

    pub fn config(&self) -> &NodeConfig {
        &self.inner.config
    }

    pub fn pool(&self) -> &BufferPool {
        &self.inner.pool
    }

    /// Bind a CDR publisher.
    ///
    /// `qos` defaults to the topic's QoS (or the node default for a new topic).
    ///
    /// # Errors
    /// `InvalidTopicName`, `TypeMismatch`, `InvalidQos`, or `QosIncompatible`
    /// when `qos` offers less than the established topic QoS.
    pub fn publish<M>(&self, topic: &str, qos: Option<QoS>) -> Result<Publisher<M>>
    where
        M: Message,
        CdrCodec: Codec<M>,
    {
        self.publish_with(topic, CdrCodec::new(), qos)
    }

    /// Bind a publisher with an explicit codec.
    ///
    /// # Errors
    /// As [`Node::publish`].
    pub fn publish_with<M, C>(
        &self,
        topic: &str,
        codec: C,
        qos: Option<QoS>,
    ) -> Result<Publisher<M, C>>
    where
        M: Message,
        C: Codec<M>,
    {
        let topic = self
            .inner
            .bind_topic(topic, M::type_descriptor(), codec.format(), qos)?;
        if let Some(offered) = &qos {
            check_compatible(offered, &topic.qos)?;
        }
        let qos = qos.unwrap_or(topic.qos);
        Ok(Publisher::new(Arc::clone(&self.inner), topic, codec, qos))
    }

    /// Bind a CDR subscriber.
    ///
    /// `qos` defaults to the topic's QoS. TransientLocal subscribers replay
    /// the topic's retained history.
    ///
    /// # Errors
    /// `InvalidTopicName`, `TypeMismatch`, `InvalidQos`, or `QosIncompatible`
    /// when `qos` requests more than the topic offers.
    pub fn subscribe<M>(&self, topic: &str, qos: Option<QoS>) -> Result<Subscriber<M>>
    where
        M: Message,
        CdrCodec: Codec<M>,
    {
        self.subscribe_with(topic, CdrCodec::new(), qos)
    }

    /// Bind a subscriber with an explicit codec.
    ///
    /// # Errors
    /// As [`Node::subscribe`].
    pub fn subscribe_with<M, C>(
        &self,
        topic: &str,
        codec: C,
        qos: Option<QoS>,
    ) -> Result<Subscriber<M, C>>
    where
        M: Message,
        C: Codec<M>,
    {
        let topic = self
            .inner
            .bind_topic(topic, M::type_descriptor(), codec.format(), qos)?;
        let requested = qos.unwrap_or(topic.qos);
        check_compatible(&topic.qos, &requested)?;

        if self.inner.remote {
            self.inner.ensure_pump(&topic)?;
        }
        Ok(Subscriber::new(
            topic,
            codec,
            self.inner.next_endpoint_id(),
            requested,
            self.inner.config.latency_tracking,
        ))
    }

    /// Topics bound on this node, sorted by name.
    pub fn topics(&self) -> Vec<TopicInfo> {
        let mut topics: Vec<TopicInfo> = self.inner.topics.iter().map(|t| t.info()).collect();
        topics.sort_by(|a, b| a.name.cmp(&b.name));
        topics
    }

    /// Other nodes reachable through this node's session.
    ///
    /// # Errors
    /// `ChannelClosed` after stop; backend errors from network sessions.
    pub fn discover_peers(&self) -> Result<Vec<PeerInfo>> {
        self.inner.check_running()?;
        self.inner.session.discover_peers()
    }

    /// Close every topic (waking pending receives with `ChannelClosed`), close
    /// the session, join receive pumps and release the node name.
    ///
    /// Idempotent.
    pub fn stop(&self) {
        self.inner.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        self.inner.stop();
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.inner.name)
            .field("node_id", &format_args!("{:016x}", self.inner.node_id))
            .field("backend", &self.inner.backend)
            .field("topics", &self.inner.topics.len())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// Builder for [`Node`].
///
/// # Example
///
/// ```
/// use ros3_core::transport::LocalTransport;
/// use ros3_core::{Node, NodeConfig};
/// use std::sync::Arc;
///
/// let hub = LocalTransport::shared();
/// let node = Node::builder("doc_builder")
///     .config(NodeConfig::default().with_latency_tracking(true))
///     .transport("hub", Arc::new(hub))
///     .backend("hub")
///     .build()
///     .unwrap();
/// assert_eq!(node.backend(), "hub");
/// ```
pub struct NodeBuilder {
    name: String,
    config: NodeConfig,
    backend: Option<String>,
    transports: HashMap<String, Arc<dyn Transport>>,
}

impl NodeBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            config: NodeConfig::default(),
            backend: None,
            transports: HashMap::new(),
        }
    }

    pub fn config(mut self, config: NodeConfig) -> Self {
        self.config = config;
        self
    }

    /// Select the backend by name (overrides `NodeConfig::backend`).
    pub fn backend(mut self, name: impl Into<String>) -> Self {
        self.backend = Some(name.into());
        self
    }

    /// Register a transport under `name`. Registering `"local"` replaces the
    /// built-in private hub (e.g. with [`LocalTransport::shared`]).
    pub fn transport(mut self, name: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        self.transports.insert(name.into(), transport);
        self
    }

    /// # Errors
    /// - [`Error::Config`]: invalid config, duplicate node name, unknown backend
    /// - [`Error::InvalidQos`]: invalid default QoS
    /// - errors from opening the transport session
    pub fn build(self) -> Result<Node> {
        let mut config = self.config;
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        config.validate()?;

        let lease = NameLease::claim(&self.name)?;
        let transport: Arc<dyn Transport> = match self.transports.get(&config.backend) {
            Some(transport) => Arc::clone(transport),
            None if config.backend == LOCAL_BACKEND => Arc::new(LocalTransport::new()),
            None => {
                return Err(Error::Config(format!(
                    "unknown backend {:?} (registered: {:?})",
                    config.backend,
                    self.transports.keys().collect::<Vec<_>>()
                )))
            }
        };

        let pool = BufferPool::new(
            config.pool.count,
            config.pool.buffer_size,
            config.pool.exhaustion,
        )?;
        let node_id = generate_node_id(&self.name);
        let session = transport.open(&NodeIdentity::new(self.name.clone(), node_id))?;
        let remote = session.delivers_remote();

        log::info!(
            "[node] {} started (id={:016x}, backend={}, pool={}x{}B, remote={})",
            self.name,
            node_id,
            config.backend,
            config.pool.count,
            config.pool.buffer_size,
            remote
        );

        Ok(Node {
            inner: Arc::new(NodeInner {
                backend: config.backend.clone(),
                name: self.name,
                node_id,
                config,
                pool,
                session,
                remote,
                topics: DashMap::new(),
                retained: AtomicUsize::new(0),
                next_endpoint: AtomicU32::new(0),
                stopped: AtomicBool::new(false),
                pumps: Mutex::new(Vec::new()),
                lease,
            }),
        })
    }
}

fn generate_node_id(name: &str) -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let mut hasher = RandomState::new().build_hasher();
    name.hash(&mut hasher);
    std::process::id().hash(&mut hasher);
    now_ns().hash(&mut hasher);
    COUNTER.fetch_add(1, Ordering::Relaxed).hash(&mut hasher);
    hasher.finish()
}
