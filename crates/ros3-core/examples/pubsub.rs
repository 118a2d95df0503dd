// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Example readability over pedantic

//! Basic Pub/Sub Example
//!
//! Demonstrates:
//! - Creating a Node
//! - Binding a reliable publisher and subscriber on one topic
//! - Receiving from a tokio task
//! - Reading endpoint statistics
//!
//! Run with: cargo run --example pubsub

use ros3_core::msgs::RobotState;
use ros3_core::{Node, NodeConfig, QoS};
use std::time::Duration;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("ros3-core {} - basic pub/sub\n", ros3_core::VERSION);

    let node = Node::builder("pubsub_example")
        .config(NodeConfig::default().with_latency_tracking(true))
        .build()?;

    let publisher = node.publish::<RobotState>("/robot/state", Some(QoS::reliable()))?;
    let subscriber = node.subscribe::<RobotState>("/robot/state", None)?;

    for i in 0..5 {
        let state = RobotState {
            position: [f64::from(i) * 0.1, 0.0, 0.0],
            velocity: [0.1, 0.0, 0.0],
            timestamp: ros3_core::envelope::now_ns() as i64,
        };
        let seq = publisher.publish(&state)?;
        println!("[pub] seq={} x={:.1}", seq, state.position[0]);

        let received = subscriber.recv_timeout(Duration::from_millis(100)).await?;
        println!("[sub] x={:.1} t={}", received.position[0], received.timestamp);
    }

    println!("\npublisher: {:?}", publisher.stats());
    println!("subscriber: {:?}", subscriber.stats());
    if let Some(latency) = subscriber.latency() {
        println!("latency p50={:?} p99={:?}", latency.p50, latency.p99);
    }

    node.stop();
    Ok(())
}
