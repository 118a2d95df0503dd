// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error taxonomy shared by every ros3 operation.
//!
//! Binding-time errors ([`Error::InvalidTopicName`], [`Error::TypeMismatch`],
//! [`Error::QosIncompatible`]) are returned synchronously from
//! `Node::publish`/`Node::subscribe` and create no resource. Per-message errors
//! ([`Error::EncodeError`], [`Error::DecodeError`], [`Error::BufferPoolExhausted`])
//! fail only the call that produced them. [`Error::ChannelClosed`] and
//! [`Error::Timeout`] terminate only the pending call.
//!
//! [`Error::Config`] and [`Error::InvalidQos`] are startup-time
//! misconfiguration and the only class a caller is expected to treat as fatal.

/// Errors returned by ros3 operations.
///
/// # Example
///
/// ```rust,no_run
/// use ros3_core::{Error, Node, QoS};
/// use ros3_core::msgs::StringMsg;
///
/// let node = Node::new("talker")?;
/// match node.subscribe::<StringMsg>("/chatter", Some(QoS::reliable())) {
///     Err(Error::QosIncompatible(reason)) => println!("rejected: {}", reason),
///     Err(e) => println!("other error: {}", e),
///     Ok(_) => println!("bound"),
/// }
/// # Ok::<(), ros3_core::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ========================================================================
    // Binding Errors
    // ========================================================================
    /// Topic name is empty or violates the naming rules.
    InvalidTopicName(String),
    /// Publish/subscribe type disagrees with the topic's established descriptor.
    TypeMismatch {
        /// Topic name.
        topic: String,
        /// Type (and format) the topic was established with.
        expected: String,
        /// Type (and format) of the rejected binding.
        found: String,
    },
    /// QoS negotiation failed at bind time.
    QosIncompatible(String),

    // ========================================================================
    // Per-message Errors
    // ========================================================================
    /// Buffer pool had no free buffer before the configured deadline.
    BufferPoolExhausted,
    /// Message could not be encoded (unsupported or oversized field).
    EncodeError(String),
    /// Bytes could not be decoded (truncated, malformed, unsupported header).
    DecodeError(String),

    // ========================================================================
    // Call Termination
    // ========================================================================
    /// Subscriber, topic or node was closed while (or before) the call ran.
    ChannelClosed,
    /// Deadline elapsed (reliable backpressure, receive timeout, backend retries).
    Timeout,

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Node configuration rejected at startup.
    Config(String),
    /// QoS policy is invalid (e.g. zero history depth).
    InvalidQos(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidTopicName(name) => write!(f, "Invalid topic name: '{}'", name),
            Error::TypeMismatch {
                topic,
                expected,
                found,
            } => write!(
                f,
                "Type mismatch on {}: topic carries {}, binding requested {}",
                topic, expected, found
            ),
            Error::QosIncompatible(msg) => write!(f, "QoS incompatible: {}", msg),
            Error::BufferPoolExhausted => write!(f, "Buffer pool exhausted"),
            Error::EncodeError(msg) => write!(f, "Encode error: {}", msg),
            Error::DecodeError(msg) => write!(f, "Decode error: {}", msg),
            Error::ChannelClosed => write!(f, "Channel closed"),
            Error::Timeout => write!(f, "Operation timed out"),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::InvalidQos(msg) => write!(f, "Invalid QoS: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

/// Convenient alias for API results using the public `Error` type.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(Error::ChannelClosed.to_string(), "Channel closed");
        assert_eq!(
            Error::InvalidTopicName(String::new()).to_string(),
            "Invalid topic name: ''"
        );
        let mismatch = Error::TypeMismatch {
            topic: "/odom".into(),
            expected: "RobotState/cdr".into(),
            found: "StringMsg/cdr".into(),
        };
        assert!(mismatch.to_string().contains("/odom"));
        assert!(mismatch.to_string().contains("StringMsg/cdr"));
    }

    #[test]
    fn test_error_is_std_error() {
        fn takes_std(_: &dyn std::error::Error) {}
        takes_std(&Error::Timeout);
    }
}
