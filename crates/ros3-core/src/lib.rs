// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # ros3-core - low-latency pub/sub for robots
//!
//! Typed publish/subscribe with an in-process fast path that is cheap enough
//! to replace function calls, and CDR framing that is wire compatible with
//! ROS 2 / DDS for traffic that leaves the process.
//!
//! ## Quick Start
//!
//! ```rust
//! use ros3_core::msgs::RobotState;
//! use ros3_core::{Node, QoS, Result};
//!
//! fn main() -> Result<()> {
//!     let node = Node::new("quick_start")?;
//!     let publisher = node.publish::<RobotState>("/robot/state", Some(QoS::reliable()))?;
//!     let subscriber = node.subscribe::<RobotState>("/robot/state", None)?;
//!
//!     let seq = publisher.publish(&RobotState {
//!         position: [1.0, 2.0, 0.0],
//!         ..RobotState::default()
//!     })?;
//!     assert_eq!(seq, 0);
//!
//!     let state = subscriber.try_recv()?.expect("message should be queued");
//!     assert_eq!(state.position[1], 2.0);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |   Node -> Publisher<M, C> / Subscriber<M, C>          (node)        |
//! +---------------------------------------------------------------------+
//! |   QoS negotiation | Codec<M>: CDR, JSON, Archive | TypeDescriptor   |
//! +---------------------------------------------------------------------+
//! |   Topic Channel (sequenced MPMC ring) | BufferPool  (core::rt)      |
//! +---------------------------------------------------------------------+
//! |   Transport / Session: LocalTransport | NetworkTransport<Backend>   |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Node`] | Owns a topic registry, a buffer pool and one transport session |
//! | [`Publisher`] | Encodes and publishes typed messages on a topic |
//! | [`Subscriber`] | Bounded queue of typed messages (async, blocking or polling) |
//! | [`QoS`] | Reliability, durability and history depth |
//! | [`Codec`] | Pluggable encoding: [`CdrCodec`], [`JsonCodec`], [`ArchiveCodec`] |
//!
//! ## Logging
//!
//! The crate logs through the `log` facade with bracketed component prefixes
//! (`[node]`, `[topic]`, `[transport]`, ...) and never installs a logger.

/// Message codecs (CDR, JSON, zero-copy archive).
pub mod codec;
/// Node configuration and YAML loading.
pub mod config;
/// Runtime primitives (buffer pool, channel, wake) and byte cursors.
pub mod core;
/// Message envelope and network frame.
pub mod envelope;
/// Error taxonomy.
pub mod error;
/// Built-in robotics messages.
pub mod msgs;
/// Nodes, topics, publishers and subscribers.
pub mod node;
/// Quality of Service policies and compatibility rules.
pub mod qos;
/// Endpoint statistics and latency tracking.
pub mod telemetry;
/// Local and network transports.
pub mod transport;
/// Message schemas.
pub mod types;

pub use codec::{ArchiveCodec, CdrCodec, Codec, Format, JsonCodec};
pub use config::{NodeConfig, PoolConfig};
pub use crate::core::rt::{Buffer, BufferPool, ExhaustionPolicy};
pub use envelope::{EndpointId, Envelope};
pub use error::{Error, Result};
pub use node::{Archived, Node, NodeBuilder, Publisher, Sample, Subscriber, TopicInfo};
pub use qos::{Durability, QoS, Reliability};
pub use telemetry::{LatencySnapshot, PublisherStats, SubscriberStats};
pub use transport::{LocalTransport, NetworkBackend, NetworkTransport, PeerInfo, RetryPolicy};
pub use types::{Message, TypeDescriptor, TypeDescriptorBuilder};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
