// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Example readability over pedantic

//! Two nodes sharing one in-process hub.
//!
//! Run with: cargo run --example two_nodes

use ros3_core::msgs::StringMsg;
use ros3_core::transport::LocalTransport;
use ros3_core::{Node, QoS};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let hub = LocalTransport::shared();

    let listener = Node::builder("listener")
        .transport("local", Arc::new(hub.clone()))
        .build()?;
    let talker = Node::builder("talker")
        .transport("local", Arc::new(hub))
        .build()?;

    let subscriber = listener.subscribe::<StringMsg>("chatter", Some(QoS::reliable()))?;
    let publisher = talker.publish::<StringMsg>("chatter", Some(QoS::reliable()))?;

    println!("talker sees peers: {:?}", talker.discover_peers()?);

    let receiver = thread::spawn(move || {
        for _ in 0..3 {
            match subscriber.recv_blocking(Duration::from_secs(1)) {
                Ok(msg) => println!("[listener] heard: {}", msg.data),
                Err(e) => {
                    println!("[listener] {}", e);
                    break;
                }
            }
        }
    });

    for i in 0..3 {
        publisher.publish(&StringMsg::new(format!("hello #{}", i)))?;
        thread::sleep(Duration::from_millis(10));
    }

    receiver.join().map_err(|_| "listener thread panicked")?;
    Ok(())
}
