// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! QoS compatibility checking (requested vs offered).
//!
//! # Compatibility Rules
//!
//! | Policy      | Rule                                               |
//! |-------------|----------------------------------------------------|
//! | Reliability | offered >= requested (Reliable > BestEffort)       |
//! | Durability  | offered >= requested (TransientLocal > Volatile)   |
//! | History     | offered depth >= requested depth                   |
//!
//! "Offered" is the topic (for subscribers) or a publisher's explicit QoS
//! (checked against the topic it binds to).

use super::QoS;
use crate::error::{Error, Result};

/// Check that `offered` satisfies `requested`.
///
/// # Errors
/// [`Error::QosIncompatible`] naming the first failing policy.
pub fn check_compatible(offered: &QoS, requested: &QoS) -> Result<()> {
    if offered.reliability.rank() < requested.reliability.rank() {
        log::debug!(
            "[QOS] Reliability mismatch (offered={:?}, requested={:?})",
            offered.reliability,
            requested.reliability
        );
        return Err(Error::QosIncompatible(format!(
            "reliability: offered {:?}, requested {:?}",
            offered.reliability, requested.reliability
        )));
    }

    if offered.durability.rank() < requested.durability.rank() {
        log::debug!(
            "[QOS] Durability mismatch (offered={:?}, requested={:?})",
            offered.durability,
            requested.durability
        );
        return Err(Error::QosIncompatible(format!(
            "durability: offered {:?}, requested {:?}",
            offered.durability, requested.durability
        )));
    }

    if offered.history_depth < requested.history_depth {
        log::debug!(
            "[QOS] History mismatch (offered=KeepLast({}), requested=KeepLast({}))",
            offered.history_depth,
            requested.history_depth
        );
        return Err(Error::QosIncompatible(format!(
            "history: offered depth {}, requested depth {}",
            offered.history_depth, requested.history_depth
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reliability_rules() {
        assert!(check_compatible(&QoS::reliable(), &QoS::best_effort()).is_ok());
        assert!(check_compatible(&QoS::reliable(), &QoS::reliable()).is_ok());
        assert!(check_compatible(&QoS::best_effort(), &QoS::best_effort()).is_ok());

        let err = check_compatible(&QoS::best_effort(), &QoS::reliable()).unwrap_err();
        assert!(matches!(err, Error::QosIncompatible(msg) if msg.starts_with("reliability")));
    }

    #[test]
    fn test_durability_rules() {
        let tl = QoS::best_effort().transient_local();
        assert!(check_compatible(&tl, &QoS::best_effort()).is_ok());
        assert!(matches!(
            check_compatible(&QoS::best_effort(), &tl),
            Err(Error::QosIncompatible(msg)) if msg.starts_with("durability")
        ));
    }

    #[test]
    fn test_history_depth_rules() {
        let deep = QoS::best_effort().keep_last(100);
        let shallow = QoS::best_effort().keep_last(5);
        assert!(check_compatible(&deep, &shallow).is_ok());
        assert!(matches!(
            check_compatible(&shallow, &deep),
            Err(Error::QosIncompatible(msg)) if msg.starts_with("history")
        ));
    }
}
