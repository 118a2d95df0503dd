// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Quality of Service for topics, publishers and subscribers.
//!
//! # Supported Policies
//!
//! - **Reliability**: BestEffort (drop oldest on overflow) or Reliable
//!   (publisher waits for room, bounded by `reliable_block_timeout`)
//! - **Durability**: Volatile or TransientLocal (late subscribers replay the
//!   retained history)
//! - **History**: KeepLast(depth); the depth is the topic ring capacity and
//!   the exact bound on every subscriber queue
//!
//! # Examples
//!
//! ```
//! use ros3_core::qos::{Durability, QoS, Reliability};
//!
//! let qos = QoS::reliable().transient_local().keep_last(50);
//! assert_eq!(qos.reliability, Reliability::Reliable);
//! assert_eq!(qos.durability, Durability::TransientLocal);
//! assert_eq!(qos.history_depth, 50);
//! assert!(qos.validate().is_ok());
//! ```

mod compat;

pub use compat::check_compatible;

use crate::error::{Error, Result};
use std::fmt;

/// Default history depth.
pub const DEFAULT_HISTORY_DEPTH: usize = 10;

/// Delivery guarantee on queue overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Reliability {
    /// Drop the oldest unread message to admit the newest.
    #[default]
    BestEffort,
    /// Never drop locally; the publisher waits for room.
    Reliable,
}

impl Reliability {
    pub(crate) fn rank(self) -> u8 {
        match self {
            Reliability::BestEffort => 0,
            Reliability::Reliable => 1,
        }
    }
}

/// What a late subscriber sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Durability {
    /// Only messages published after the subscriber bound.
    #[default]
    Volatile,
    /// The last `history_depth` messages are replayed on bind.
    TransientLocal,
}

impl Durability {
    pub(crate) fn rank(self) -> u8 {
        match self {
            Durability::Volatile => 0,
            Durability::TransientLocal => 1,
        }
    }
}

/// QoS profile (reliability, durability, history depth).
///
/// Validated when a topic is bound (fail-fast on invalid config).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QoS {
    pub reliability: Reliability,
    pub durability: Durability,
    /// KeepLast depth (>= 1).
    pub history_depth: usize,
}

impl Default for QoS {
    fn default() -> Self {
        Self {
            reliability: Reliability::BestEffort,
            durability: Durability::Volatile,
            history_depth: DEFAULT_HISTORY_DEPTH,
        }
    }
}

impl QoS {
    /// BestEffort, Volatile, depth 10.
    pub fn best_effort() -> Self {
        Self::default()
    }

    /// Reliable, Volatile, depth 10.
    pub fn reliable() -> Self {
        Self {
            reliability: Reliability::Reliable,
            ..Self::default()
        }
    }

    pub fn volatile(mut self) -> Self {
        self.durability = Durability::Volatile;
        self
    }

    pub fn transient_local(mut self) -> Self {
        self.durability = Durability::TransientLocal;
        self
    }

    pub fn keep_last(mut self, depth: usize) -> Self {
        self.history_depth = depth;
        self
    }

    pub fn with_reliability(mut self, reliability: Reliability) -> Self {
        self.reliability = reliability;
        self
    }

    pub fn is_reliable(&self) -> bool {
        self.reliability == Reliability::Reliable
    }

    pub fn is_transient_local(&self) -> bool {
        self.durability == Durability::TransientLocal
    }

    /// # Errors
    /// [`Error::InvalidQos`] when `history_depth` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.history_depth == 0 {
            return Err(Error::InvalidQos("history_depth must be at least 1".into()));
        }
        Ok(())
    }
}

impl fmt::Display for QoS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}/{:?}/KeepLast({})",
            self.reliability, self.durability, self.history_depth
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile() {
        let qos = QoS::default();
        assert_eq!(qos.reliability, Reliability::BestEffort);
        assert_eq!(qos.durability, Durability::Volatile);
        assert_eq!(qos.history_depth, 10);
        assert_eq!(qos, QoS::best_effort());
    }

    #[test]
    fn test_builders_chain() {
        let qos = QoS::best_effort().transient_local().keep_last(3).volatile();
        assert_eq!(qos.durability, Durability::Volatile);
        assert_eq!(qos.history_depth, 3);
        assert!(QoS::reliable().is_reliable());
        assert_eq!(
            QoS::reliable().transient_local().to_string(),
            "Reliable/TransientLocal/KeepLast(10)"
        );
    }

    #[test]
    fn test_zero_depth_rejected() {
        assert!(matches!(
            QoS::default().keep_last(0).validate(),
            Err(Error::InvalidQos(_))
        ));
    }
}
