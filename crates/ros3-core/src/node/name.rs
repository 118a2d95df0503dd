// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Topic name rules and the process-wide set of live node names.
//!
//! Topic names are `/`-separated segments of `[A-Za-z0-9_]`, none starting
//! with a digit. A relative name gets a leading `/`. Node names follow the
//! same rule for a single segment.

use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

fn live_nodes() -> &'static Mutex<HashSet<String>> {
    static LIVE_NODES: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();
    LIVE_NODES.get_or_init(|| Mutex::new(HashSet::new()))
}

fn valid_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validate `name` and return its absolute form.
///
/// # Errors
/// [`Error::InvalidTopicName`] for empty names, empty segments, a trailing
/// `/`, or characters outside `[A-Za-z0-9_]`.
///
/// # Examples
/// ```
/// use ros3_core::node::normalize_topic_name;
///
/// assert_eq!(normalize_topic_name("chatter").unwrap(), "/chatter");
/// assert_eq!(normalize_topic_name("/robot1/odom").unwrap(), "/robot1/odom");
/// assert!(normalize_topic_name("/robot1//odom").is_err());
/// assert!(normalize_topic_name("/2fast").is_err());
/// ```
pub fn normalize_topic_name(name: &str) -> Result<String> {
    let reject = |reason: &str| Err(Error::InvalidTopicName(format!("{:?}: {}", name, reason)));

    if name.is_empty() {
        return reject("empty name");
    }
    let relative = name.strip_prefix('/').unwrap_or(name);
    if relative.is_empty() {
        return reject("no segments");
    }
    if relative.ends_with('/') {
        return reject("trailing '/'");
    }
    for segment in relative.split('/') {
        if segment.is_empty() {
            return reject("empty segment");
        }
        if !valid_segment(segment) {
            return reject("segments are [A-Za-z0-9_] and must not start with a digit");
        }
    }
    Ok(format!("/{}", relative))
}

/// Claim on a node name; released by [`NameLease::release`] or on drop.
#[derive(Debug)]
pub(crate) struct NameLease {
    name: String,
    released: AtomicBool,
}

impl NameLease {
    /// # Errors
    /// [`Error::Config`] if the name is malformed or already held by a live node.
    pub(crate) fn claim(name: &str) -> Result<Self> {
        if !valid_segment(name) {
            return Err(Error::Config(format!(
                "invalid node name {:?}: expected [A-Za-z0-9_] not starting with a digit",
                name
            )));
        }
        if !live_nodes().lock().insert(name.to_string()) {
            return Err(Error::Config(format!("node name {:?} is already in use", name)));
        }
        Ok(Self {
            name: name.to_string(),
            released: AtomicBool::new(false),
        })
    }

    pub(crate) fn release(&self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            live_nodes().lock().remove(&self.name);
        }
    }
}

impl Drop for NameLease {
    fn drop(&mut self) {
        self.release();
    }
}
