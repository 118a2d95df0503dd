// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Receive pumps: one thread per subscribed topic, moving envelopes from the
//! transport session into the topic channel.
//!
//! The pump drops echoes of its own node and envelopes whose type hash or
//! format disagree with the topic, then re-publishes the rest under a local
//! sequence. On a Reliable topic a full channel stalls the pump instead of
//! losing the envelope, which in turn backs up the session's mailbox. It
//! exits when the topic or the session closes; the poll interval bounds how
//! long that takes.

use super::topic::Topic;
use crate::error::{Error, Result};
use crate::transport::Session;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub(crate) struct PumpContext {
    pub(crate) topic: Arc<Topic>,
    pub(crate) session: Arc<dyn Session>,
    pub(crate) node_id: u64,
    pub(crate) poll_interval: Duration,
    pub(crate) block_timeout: Duration,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PumpStats {
    pub(crate) forwarded: u64,
    pub(crate) echoes: u64,
    pub(crate) rejected: u64,
    /// Times a Reliable topic stayed full for a whole block timeout.
    pub(crate) stalls: u64,
}

/// Start the pump thread for `ctx.topic`.
pub(crate) fn spawn(ctx: PumpContext) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("ros3-pump{}", ctx.topic.name))
        .spawn(move || {
            let stats = run(&ctx);
            log::debug!(
                "[pump] {} exited (forwarded={}, echoes={}, rejected={}, stalls={})",
                ctx.topic.name,
                stats.forwarded,
                stats.echoes,
                stats.rejected,
                stats.stalls
            );
        })
        .map_err(|e| Error::Config(format!("failed to spawn receive pump: {}", e)))
}

pub(crate) fn run(ctx: &PumpContext) -> PumpStats {
    let topic = &ctx.topic;
    let mut stats = PumpStats::default();

    while !topic.is_closed() {
        let envelope = match ctx.session.recv(&topic.name, ctx.poll_interval) {
            Ok(envelope) => envelope,
            Err(Error::Timeout) => continue,
            Err(Error::ChannelClosed) => break,
            Err(e) => {
                log::warn!("[pump] {} discarded inbound frame: {}", topic.name, e);
                stats.rejected += 1;
                continue;
            }
        };

        if envelope.publisher.node == ctx.node_id {
            stats.echoes += 1;
            continue;
        }
        if envelope.type_hash != topic.type_hash || envelope.format != topic.format {
            log::warn!(
                "[pump] {} discarded envelope from {}: type {:016x}/{} != {:016x}/{}",
                topic.name,
                envelope.publisher,
                envelope.type_hash,
                envelope.format,
                topic.type_hash,
                topic.format
            );
            stats.rejected += 1;
            continue;
        }

        let published = loop {
            match topic
                .channel
                .publish(|sequence| envelope.resequenced(sequence), ctx.block_timeout)
            {
                Err(Error::Timeout) => {
                    stats.stalls += 1;
                    log::trace!("[pump] {} waiting for reliable subscribers", topic.name);
                }
                other => break other,
            }
        };
        match published {
            Ok(local) => {
                stats.forwarded += 1;
                log::trace!(
                    "[pump] {} remote seq {} -> local seq {}",
                    topic.name,
                    envelope.sequence,
                    local.sequence
                );
            }
            Err(Error::ChannelClosed) => break,
            Err(e) => {
                log::debug!("[pump] {} dropped remote message: {}", topic.name, e);
                stats.rejected += 1;
            }
        }
    }
    stats
}
