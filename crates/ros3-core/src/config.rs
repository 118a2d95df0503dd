// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Node configuration.
//!
//! Everything a node needs is passed in a [`NodeConfig`] at construction;
//! nothing is read from environment variables or other process-wide state.
//!
//! # Example YAML
//!
//! ```yaml
//! # node.yaml
//! backend: local
//! reliable_block_timeout_ms: 100
//! recv_poll_interval_ms: 20
//! latency_tracking: true
//! pool:
//!   count: 128
//!   buffer_size: 8192
//!   exhaustion: BLOCK
//!   block_timeout_ms: 5
//! qos:
//!   reliability: RELIABLE
//!   durability: TRANSIENT_LOCAL
//!   history_depth: 50
//! ```
//!
//! Durations use `_ms` keys; enum values are case-insensitive.

use crate::core::rt::ExhaustionPolicy;
use crate::error::{Error, Result};
use crate::qos::QoS;
use std::time::Duration;

/// Default pooled buffer count.
pub const DEFAULT_POOL_COUNT: usize = 64;
/// Default pooled buffer size in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;
/// Default wait for a Reliable publish to find room.
pub const DEFAULT_RELIABLE_BLOCK_TIMEOUT: Duration = Duration::from_millis(100);
/// Default wait per receive-pump poll.
pub const DEFAULT_RECV_POLL_INTERVAL: Duration = Duration::from_millis(20);
/// Backend name of [`crate::transport::LocalTransport`].
pub const LOCAL_BACKEND: &str = "local";

/// Buffer pool sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of pooled buffers.
    pub count: usize,
    /// Bytes per buffer.
    pub buffer_size: usize,
    pub exhaustion: ExhaustionPolicy,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            count: DEFAULT_POOL_COUNT,
            buffer_size: DEFAULT_BUFFER_SIZE,
            exhaustion: ExhaustionPolicy::default(),
        }
    }
}

impl PoolConfig {
    pub fn new(count: usize, buffer_size: usize) -> Self {
        Self {
            count,
            buffer_size,
            ..Self::default()
        }
    }

    pub fn with_exhaustion(mut self, exhaustion: ExhaustionPolicy) -> Self {
        self.exhaustion = exhaustion;
        self
    }

    /// # Errors
    /// [`Error::Config`] on a zero count or size.
    pub fn validate(&self) -> Result<()> {
        if self.count == 0 {
            return Err(Error::Config("pool.count must be at least 1".into()));
        }
        if self.count >= u32::MAX as usize {
            return Err(Error::Config(format!("pool.count {} too large", self.count)));
        }
        if self.buffer_size == 0 {
            return Err(Error::Config("pool.buffer_size must be at least 1".into()));
        }
        Ok(())
    }
}

/// Per-node configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    pub pool: PoolConfig,
    /// QoS for topics bound without an explicit one.
    pub default_qos: QoS,
    /// Transport backend name.
    pub backend: String,
    /// Longest a Reliable publish waits for a full subscriber.
    pub reliable_block_timeout: Duration,
    /// Receive-pump wait per `Session::recv` call; bounds stop latency.
    pub recv_poll_interval: Duration,
    /// Record publish-to-receive latency on subscribers.
    pub latency_tracking: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            default_qos: QoS::default(),
            backend: LOCAL_BACKEND.to_string(),
            reliable_block_timeout: DEFAULT_RELIABLE_BLOCK_TIMEOUT,
            recv_poll_interval: DEFAULT_RECV_POLL_INTERVAL,
            latency_tracking: false,
        }
    }
}

impl NodeConfig {
    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_default_qos(mut self, qos: QoS) -> Self {
        self.default_qos = qos;
        self
    }

    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = backend.into();
        self
    }

    pub fn with_reliable_block_timeout(mut self, timeout: Duration) -> Self {
        self.reliable_block_timeout = timeout;
        self
    }

    pub fn with_recv_poll_interval(mut self, interval: Duration) -> Self {
        self.recv_poll_interval = interval;
        self
    }

    pub fn with_latency_tracking(mut self, enabled: bool) -> Self {
        self.latency_tracking = enabled;
        self
    }

    /// Check every field (fail-fast at node build).
    ///
    /// # Errors
    /// - [`Error::Config`] for pool, backend or interval problems
    /// - [`Error::InvalidQos`] for the default QoS
    pub fn validate(&self) -> Result<()> {
        self.pool.validate()?;
        self.default_qos.validate()?;
        if self.backend.trim().is_empty() {
            return Err(Error::Config("backend name is empty".into()));
        }
        if self.recv_poll_interval.is_zero() {
            return Err(Error::Config("recv_poll_interval must be positive".into()));
        }
        let blocking = matches!(self.pool.exhaustion, ExhaustionPolicy::Block { .. });
        if blocking
            && self.default_qos.is_transient_local()
            && self.default_qos.history_depth >= self.pool.count
        {
            return Err(Error::Config(format!(
                "transient-local history depth {} pins every pooled buffer (pool count {})",
                self.default_qos.history_depth, self.pool.count
            )));
        }
        Ok(())
    }

    /// Parse a YAML document (see module docs) over the defaults.
    ///
    /// # Errors
    /// [`Error::Config`] on syntax errors, unknown keys or bad values.
    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let raw: yaml::YamlNodeConfig = serde_yaml::from_str(yaml)
            .map_err(|e| Error::Config(format!("failed to parse YAML: {}", e)))?;
        let config = raw.into_config()?;
        config.validate()?;
        log::debug!("[config] loaded node config from YAML: {:?}", config);
        Ok(config)
    }

    /// Read and parse a YAML file.
    ///
    /// # Errors
    /// [`Error::Config`] when the file cannot be read or parsed.
    #[cfg(feature = "yaml")]
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }
}

#[cfg(feature = "yaml")]
mod yaml {
    use super::{NodeConfig, PoolConfig};
    use crate::core::rt::ExhaustionPolicy;
    use crate::error::{Error, Result};
    use crate::qos::{Durability, QoS, Reliability};
    use serde::Deserialize;
    use std::time::Duration;

    const DEFAULT_BLOCK_TIMEOUT_MS: u64 = 10;

    /// Root document; absent keys keep their defaults.
    #[derive(Debug, Default, Deserialize)]
    #[serde(default, deny_unknown_fields)]
    pub(super) struct YamlNodeConfig {
        pub backend: Option<String>,
        pub reliable_block_timeout_ms: Option<u64>,
        pub recv_poll_interval_ms: Option<u64>,
        pub latency_tracking: Option<bool>,
        pub pool: Option<YamlPool>,
        pub qos: Option<YamlQos>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default, deny_unknown_fields)]
    pub(super) struct YamlPool {
        pub count: Option<usize>,
        pub buffer_size: Option<usize>,
        /// BLOCK or UNPOOLED
        pub exhaustion: Option<String>,
        pub block_timeout_ms: Option<u64>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default, deny_unknown_fields)]
    pub(super) struct YamlQos {
        /// RELIABLE or BEST_EFFORT
        pub reliability: Option<String>,
        /// VOLATILE or TRANSIENT_LOCAL
        pub durability: Option<String>,
        pub history_depth: Option<usize>,
    }

    impl YamlNodeConfig {
        pub(super) fn into_config(self) -> Result<NodeConfig> {
            let mut config = NodeConfig::default();
            if let Some(backend) = self.backend {
                config.backend = backend;
            }
            if let Some(ms) = self.reliable_block_timeout_ms {
                config.reliable_block_timeout = Duration::from_millis(ms);
            }
            if let Some(ms) = self.recv_poll_interval_ms {
                config.recv_poll_interval = Duration::from_millis(ms);
            }
            if let Some(enabled) = self.latency_tracking {
                config.latency_tracking = enabled;
            }
            if let Some(pool) = self.pool {
                config.pool = pool.into_pool()?;
            }
            if let Some(qos) = self.qos {
                config.default_qos = qos.into_qos()?;
            }
            Ok(config)
        }
    }

    impl YamlPool {
        fn into_pool(self) -> Result<PoolConfig> {
            let mut pool = PoolConfig::default();
            if let Some(count) = self.count {
                pool.count = count;
            }
            if let Some(size) = self.buffer_size {
                pool.buffer_size = size;
            }
            let kind = self.exhaustion.as_deref().map(str::to_uppercase);
            pool.exhaustion = match (kind.as_deref(), self.block_timeout_ms) {
                // A timeout alone implies blocking.
                (None, Some(ms)) => ExhaustionPolicy::Block {
                    timeout: Duration::from_millis(ms),
                },
                (None, None) | (Some("UNPOOLED"), None) => ExhaustionPolicy::Unpooled,
                (Some("UNPOOLED"), Some(_)) => {
                    return Err(Error::Config(
                        "pool.block_timeout_ms requires exhaustion: BLOCK".into(),
                    ))
                }
                (Some("BLOCK"), ms) => ExhaustionPolicy::Block {
                    timeout: Duration::from_millis(ms.unwrap_or(DEFAULT_BLOCK_TIMEOUT_MS)),
                },
                (Some(other), _) => {
                    return Err(Error::Config(format!(
                        "invalid pool.exhaustion: {}",
                        other
                    )))
                }
            };
            Ok(pool)
        }
    }

    impl YamlQos {
        fn into_qos(self) -> Result<QoS> {
            let mut qos = QoS::default();
            if let Some(rel) = self.reliability {
                qos.reliability = match rel.to_uppercase().as_str() {
                    "RELIABLE" => Reliability::Reliable,
                    "BEST_EFFORT" => Reliability::BestEffort,
                    _ => return Err(Error::Config(format!("invalid qos.reliability: {}", rel))),
                };
            }
            if let Some(dur) = self.durability {
                qos.durability = match dur.to_uppercase().as_str() {
                    "VOLATILE" => Durability::Volatile,
                    "TRANSIENT_LOCAL" => Durability::TransientLocal,
                    _ => return Err(Error::Config(format!("invalid qos.durability: {}", dur))),
                };
            }
            if let Some(depth) = self.history_depth {
                qos.history_depth = depth;
            }
            Ok(qos)
        }
    }
}
