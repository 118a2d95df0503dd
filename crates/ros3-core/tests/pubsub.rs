// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process publish/subscribe integration tests.
//!
//! Every test uses its own node names: names are unique per process and the
//! test harness runs tests on parallel threads.

use ros3_core::msgs::{JointCommand, RobotState, StringMsg};
use ros3_core::transport::LocalTransport;
use ros3_core::types::PrimitiveKind;
use ros3_core::{
    ArchiveCodec, Error, ExhaustionPolicy, JsonCodec, Message, Node, NodeConfig, PoolConfig, QoS,
    TypeDescriptor, TypeDescriptorBuilder,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Counter {
    producer: u32,
    value: u32,
}

impl Message for Counter {
    fn type_descriptor() -> Arc<TypeDescriptor> {
        static DESC: OnceLock<Arc<TypeDescriptor>> = OnceLock::new();
        DESC.get_or_init(|| {
            Arc::new(
                TypeDescriptorBuilder::new("test_msgs::Counter")
                    .field("producer", PrimitiveKind::U32)
                    .field("value", PrimitiveKind::U32)
                    .build(),
            )
        })
        .clone()
    }
}

#[test]
fn test_single_publisher_order() {
    let node = Node::new("it_order").expect("build should succeed");
    let publisher = node
        .publish::<StringMsg>("/chatter", None)
        .expect("bind should succeed");
    let subscriber = node
        .subscribe::<StringMsg>("/chatter", None)
        .expect("bind should succeed");

    for i in 0..5 {
        let seq = publisher
            .publish(&StringMsg::new(format!("msg {}", i)))
            .expect("publish should succeed");
        assert_eq!(seq, i);
    }

    for i in 0..5u64 {
        let sample = subscriber
            .try_recv_sample()
            .expect("recv should succeed")
            .expect("message should be queued");
        assert_eq!(sample.sequence, i);
        assert_eq!(sample.value.data, format!("msg {}", i));
        assert_eq!(sample.publisher, publisher.id());
        assert!(sample.timestamp_ns > 0);
    }
    assert!(subscriber.try_recv().expect("recv should succeed").is_none());

    let stats = publisher.stats();
    assert_eq!(stats.messages, 5);
    assert!(stats.bytes > 0);
}

#[test]
fn test_best_effort_keeps_newest_history() {
    let node = Node::new("it_drop").expect("build should succeed");
    let publisher = node
        .publish::<Counter>("/counter", Some(QoS::best_effort().keep_last(10)))
        .expect("bind should succeed");
    let subscriber = node
        .subscribe::<Counter>("/counter", None)
        .expect("bind should succeed");

    for value in 1..=15 {
        publisher
            .publish(&Counter { producer: 0, value })
            .expect("publish should succeed");
    }
    assert_eq!(subscriber.pending(), 10);

    let mut received = Vec::new();
    while let Some(counter) = subscriber.try_recv().expect("recv should succeed") {
        received.push(counter.value);
    }
    assert_eq!(received, (6..=15).collect::<Vec<_>>());
    let stats = subscriber.stats();
    assert_eq!(stats.received, 10);
    assert_eq!(stats.dropped, 5);
}

#[test]
fn test_reliable_many_publishers_many_subscribers() {
    const PRODUCERS: u32 = 4;
    const PER_PRODUCER: u32 = 250;
    const CONSUMERS: usize = 3;

    let config = NodeConfig::default().with_reliable_block_timeout(WAIT);
    let node = Node::builder("it_reliable_nxm")
        .config(config)
        .build()
        .expect("build should succeed");
    let qos = QoS::reliable().keep_last(16);

    let subscribers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            node.subscribe::<Counter>("/counter", Some(qos))
                .expect("bind should succeed")
        })
        .collect();
    let publishers: Vec<_> = (0..PRODUCERS)
        .map(|_| {
            node.publish::<Counter>("/counter", Some(qos))
                .expect("bind should succeed")
        })
        .collect();

    thread::scope(|scope| {
        let consumers: Vec<_> = subscribers
            .iter()
            .map(|subscriber| {
                scope.spawn(move || {
                    let mut last: HashMap<u32, u32> = HashMap::new();
                    let mut sequences = Vec::new();
                    for _ in 0..PRODUCERS * PER_PRODUCER {
                        let sample = subscriber
                            .recv_sample_blocking(WAIT)
                            .expect("reliable recv should succeed");
                        let counter = sample.value;
                        if let Some(previous) = last.insert(counter.producer, counter.value) {
                            assert!(counter.value > previous, "per-producer order");
                        }
                        sequences.push(sample.sequence);
                    }
                    sequences
                })
            })
            .collect();

        for (producer, publisher) in publishers.iter().enumerate() {
            scope.spawn(move || {
                for value in 0..PER_PRODUCER {
                    publisher
                        .publish(&Counter {
                            producer: producer as u32,
                            value,
                        })
                        .expect("reliable publish should succeed");
                }
            });
        }

        let expected: Vec<u64> = (0..u64::from(PRODUCERS * PER_PRODUCER)).collect();
        for consumer in consumers {
            let sequences = consumer.join().expect("consumer should not panic");
            assert_eq!(sequences, expected);
        }
    });

    for subscriber in &subscribers {
        assert_eq!(subscriber.stats().dropped, 0);
    }
}

#[test]
fn test_reliable_publish_times_out_on_stalled_subscriber() {
    let config = NodeConfig::default().with_reliable_block_timeout(Duration::from_millis(20));
    let node = Node::builder("it_reliable_stall")
        .config(config)
        .build()
        .expect("build should succeed");
    let qos = QoS::reliable().keep_last(2);
    let publisher = node
        .publish::<Counter>("/stall", Some(qos))
        .expect("bind should succeed");
    let subscriber = node
        .subscribe::<Counter>("/stall", Some(qos))
        .expect("bind should succeed");

    for value in 0..2 {
        publisher
            .publish(&Counter { producer: 0, value })
            .expect("publish should succeed");
    }
    assert!(matches!(
        publisher.publish(&Counter { producer: 0, value: 2 }),
        Err(Error::Timeout)
    ));

    // Draining one message makes room again.
    subscriber.try_recv().expect("recv should succeed");
    publisher
        .publish(&Counter { producer: 0, value: 3 })
        .expect("publish should succeed");
}

#[test]
fn test_qos_negotiation() {
    let node = Node::new("it_qos").expect("build should succeed");
    let _best_effort = node
        .publish::<StringMsg>("/sensor", Some(QoS::best_effort()))
        .expect("bind should succeed");

    assert!(matches!(
        node.subscribe::<StringMsg>("/sensor", Some(QoS::reliable())),
        Err(Error::QosIncompatible(_))
    ));
    assert!(matches!(
        node.subscribe::<StringMsg>("/sensor", Some(QoS::best_effort().transient_local())),
        Err(Error::QosIncompatible(_))
    ));
    assert!(matches!(
        node.subscribe::<StringMsg>("/sensor", Some(QoS::best_effort().keep_last(11))),
        Err(Error::QosIncompatible(_))
    ));
    let narrower = node
        .subscribe::<StringMsg>("/sensor", Some(QoS::best_effort().keep_last(3)))
        .expect("smaller depth is compatible");
    assert_eq!(narrower.qos().history_depth, 3);

    let _reliable = node
        .publish::<StringMsg>("/cmd", Some(QoS::reliable()))
        .expect("bind should succeed");
    let relaxed = node
        .subscribe::<StringMsg>("/cmd", Some(QoS::best_effort()))
        .expect("best effort accepts reliable");
    assert!(!relaxed.qos().is_reliable());

    assert!(matches!(
        node.publish::<StringMsg>("/bad", Some(QoS::reliable().keep_last(0))),
        Err(Error::InvalidQos(_))
    ));
}

#[test]
fn test_transient_local_late_joiner() {
    let node = Node::new("it_latched").expect("build should succeed");
    let qos = QoS::reliable().transient_local().keep_last(5);
    let publisher = node
        .publish::<Counter>("/map", Some(qos))
        .expect("bind should succeed");

    for value in 1..=8 {
        publisher
            .publish(&Counter { producer: 0, value })
            .expect("publish with no subscribers should succeed");
    }

    let late = node
        .subscribe::<Counter>("/map", Some(qos))
        .expect("bind should succeed");
    let mut replayed = Vec::new();
    while let Some(counter) = late.try_recv().expect("recv should succeed") {
        replayed.push(counter.value);
    }
    assert_eq!(replayed, vec![4, 5, 6, 7, 8]);

    let volatile = node
        .subscribe::<Counter>("/map", Some(QoS::reliable().keep_last(5)))
        .expect("bind should succeed");
    assert_eq!(volatile.pending(), 0);
}

#[test]
fn test_type_mismatch_and_invalid_names() {
    let node = Node::new("it_mismatch").expect("build should succeed");
    let _p = node
        .publish::<StringMsg>("/state", None)
        .expect("bind should succeed");

    match node.subscribe::<RobotState>("/state", None) {
        Err(Error::TypeMismatch {
            topic,
            expected,
            found,
        }) => {
            assert_eq!(topic, "/state");
            assert!(expected.contains("std_msgs::String"));
            assert!(found.contains("ros3_msgs::RobotState"));
        }
        other => panic!("expected TypeMismatch, got {:?}", other),
    }
    // Same schema, different format.
    assert!(matches!(
        node.subscribe_with::<StringMsg, _>("/state", JsonCodec::new(), None),
        Err(Error::TypeMismatch { .. })
    ));

    for bad in ["", "/", "a//b", "trailing/", "spa ce", "/bad-dash"] {
        assert!(
            matches!(
                node.publish::<StringMsg>(bad, None),
                Err(Error::InvalidTopicName(_))
            ),
            "{:?} should be rejected",
            bad
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_async_recv_and_close_wakes() {
    let node = Node::new("it_async").expect("build should succeed");
    let publisher = node
        .publish::<StringMsg>("/async", None)
        .expect("bind should succeed");
    let subscriber = Arc::new(
        node.subscribe::<StringMsg>("/async", None)
            .expect("bind should succeed"),
    );

    let waiting = Arc::clone(&subscriber);
    let task = tokio::spawn(async move { waiting.recv().await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    publisher
        .publish(&StringMsg::new("wake up"))
        .expect("publish should succeed");
    let msg = task
        .await
        .expect("task should not panic")
        .expect("recv should succeed");
    assert_eq!(msg.data, "wake up");

    assert!(matches!(
        subscriber.recv_timeout(Duration::from_millis(20)).await,
        Err(Error::Timeout)
    ));

    let waiting = Arc::clone(&subscriber);
    let task = tokio::spawn(async move { waiting.recv().await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    node.stop();
    let result = tokio::time::timeout(WAIT, task)
        .await
        .expect("close should wake the receiver")
        .expect("task should not panic");
    assert!(matches!(result, Err(Error::ChannelClosed)));
}

#[test]
fn test_subscriber_close_wakes_blocking_recv() {
    let node = Node::new("it_close_blocking").expect("build should succeed");
    let subscriber = node
        .subscribe::<StringMsg>("/quiet", None)
        .expect("bind should succeed");

    thread::scope(|scope| {
        let waiter = scope.spawn(|| subscriber.recv_blocking(WAIT));
        thread::sleep(Duration::from_millis(20));
        subscriber.close();
        let result = waiter.join().expect("waiter should not panic");
        assert!(matches!(result, Err(Error::ChannelClosed)));
    });
    assert_eq!(node.topics()[0].subscribers, 0);
}

#[test]
fn test_shared_local_transport_between_nodes() {
    let hub = LocalTransport::shared();
    let talker = Node::builder("it_hub_talker")
        .transport("local", Arc::new(hub.clone()))
        .build()
        .expect("build should succeed");
    let listener = Node::builder("it_hub_listener")
        .transport("local", Arc::new(hub.clone()))
        .build()
        .expect("build should succeed");
    assert_eq!(hub.session_count(), 2);

    let subscriber = listener
        .subscribe::<RobotState>("/robot/state", Some(QoS::reliable()))
        .expect("bind should succeed");
    let publisher = talker
        .publish::<RobotState>("/robot/state", Some(QoS::reliable()))
        .expect("bind should succeed");

    for i in 0..3 {
        publisher
            .publish(&RobotState {
                position: [f64::from(i), 0.0, 0.0],
                velocity: [0.0; 3],
                timestamp: i64::from(i),
            })
            .expect("publish should succeed");
    }

    for i in 0..3 {
        let sample = subscriber
            .recv_sample_blocking(WAIT)
            .expect("remote message should arrive");
        assert_eq!(sample.value.timestamp, i64::from(i));
        assert_eq!(sample.publisher.node, talker.node_id());
        // Re-sequenced on the listener's topic.
        assert_eq!(sample.sequence, i as u64);
    }

    let peers = talker.discover_peers().expect("discover should succeed");
    assert_eq!(peers.len(), 1);
    assert_eq!(peers[0].name, "it_hub_listener");

    listener.stop();
    assert_eq!(hub.session_count(), 1);
}

#[test]
fn test_archive_topic_zero_copy() {
    let node = Node::new("it_archive").expect("build should succeed");
    let publisher = node
        .publish_with::<JointCommand, _>("/joints", ArchiveCodec::new(), None)
        .expect("bind should succeed");
    let subscriber = node
        .subscribe_with::<JointCommand, _>("/joints", ArchiveCodec::new(), None)
        .expect("bind should succeed");
    assert_eq!(node.topics()[0].format, ros3_core::Format::Archive);

    let command = JointCommand::new(3, 0.25, 1.5, -2.0);
    publisher.publish(&command).expect("publish should succeed");
    publisher
        .publish(&JointCommand::new(4, 0.0, 0.0, 0.0))
        .expect("publish should succeed");

    let archived = subscriber
        .try_recv_archived()
        .expect("recv should succeed")
        .expect("message should be queued");
    assert_eq!(*archived, command);
    assert_eq!(archived.joint_id, 3);
    assert_eq!(archived.sequence(), 0);

    let decoded = subscriber
        .try_recv()
        .expect("recv should succeed")
        .expect("message should be queued");
    assert_eq!(decoded.joint_id, 4);
}

#[test]
fn test_json_topic() {
    let node = Node::new("it_json").expect("build should succeed");
    let publisher = node
        .publish_with::<RobotState, _>("/debug/state", JsonCodec::new(), None)
        .expect("bind should succeed");
    let subscriber = node
        .subscribe_with::<RobotState, _>("/debug/state", JsonCodec::new(), None)
        .expect("bind should succeed");

    let state = RobotState {
        position: [1.5, -2.0, 0.25],
        velocity: [0.0, 0.1, 0.0],
        timestamp: 1_700_000_000_000_000_000,
    };
    publisher.publish(&state).expect("publish should succeed");
    assert_eq!(
        subscriber.try_recv().expect("recv should succeed"),
        Some(state)
    );
}

#[test]
fn test_latency_tracking() {
    let config = NodeConfig::default().with_latency_tracking(true);
    let node = Node::builder("it_latency")
        .config(config)
        .build()
        .expect("build should succeed");
    let publisher = node
        .publish::<StringMsg>("/ping", None)
        .expect("bind should succeed");
    let subscriber = node
        .subscribe::<StringMsg>("/ping", None)
        .expect("bind should succeed");

    for _ in 0..5 {
        publisher
            .publish(&StringMsg::new("ping"))
            .expect("publish should succeed");
        subscriber
            .recv_blocking(WAIT)
            .expect("recv should succeed");
    }

    let latency = subscriber.latency().expect("latency is tracked");
    assert_eq!(latency.count, 5);
    assert!(latency.p50 <= latency.p99);
    assert!(latency.p99 <= latency.max);

    let untracked = Node::new("it_latency_off").expect("build should succeed");
    let sub = untracked
        .subscribe::<StringMsg>("/ping", None)
        .expect("bind should succeed");
    assert!(sub.latency().is_none());
}

#[test]
fn test_pool_buffers_are_recycled() {
    let node = Node::new("it_pool").expect("build should succeed");
    let publisher = node
        .publish::<StringMsg>("/pool", Some(QoS::best_effort().keep_last(1)))
        .expect("bind should succeed");
    let capacity = node.pool().capacity();

    // Drop-oldest releases overwritten payloads back to the pool.
    for i in 0..capacity * 4 {
        publisher
            .publish(&StringMsg::new(format!("{}", i)))
            .expect("publish should succeed");
    }
    assert_eq!(node.pool().unpooled_checkouts(), 0);
}

#[test]
fn test_blocking_pool_smaller_than_history_keeps_flowing() {
    let pool = PoolConfig::new(4, 256).with_exhaustion(ExhaustionPolicy::Block {
        timeout: Duration::from_millis(50),
    });
    let node = Node::builder("it_pool_block")
        .config(NodeConfig::default().with_pool(pool))
        .build()
        .expect("build should succeed");
    let qos = QoS::best_effort().keep_last(10);
    let publisher = node
        .publish::<StringMsg>("/small_pool", Some(qos))
        .expect("bind should succeed");
    let subscriber = node
        .subscribe::<StringMsg>("/small_pool", Some(qos))
        .expect("bind should succeed");

    for i in 0..20 {
        publisher
            .publish(&StringMsg::new(format!("m{}", i)))
            .expect("publish should succeed");
        let got = subscriber
            .try_recv()
            .expect("recv should succeed")
            .expect("message should be ready");
        assert_eq!(got.data, format!("m{}", i));
        assert_eq!(node.pool().available(), 4, "round {}", i);
    }
}

#[test]
fn test_pool_usage_is_flat_across_topics() {
    const TOPICS: usize = 5;
    const ROUNDS: usize = 32;
    const IN_FLIGHT: usize = 3;

    let node = Node::new("it_pool_flat").expect("build should succeed");
    let endpoints: Vec<_> = (0..TOPICS)
        .map(|t| {
            let name = format!("/flat_{}", t);
            let publisher = node
                .publish::<StringMsg>(&name, None)
                .expect("bind should succeed");
            let subscriber = node
                .subscribe::<StringMsg>(&name, None)
                .expect("bind should succeed");
            (publisher, subscriber)
        })
        .collect();

    for round in 0..ROUNDS {
        for (publisher, _) in &endpoints {
            for n in 0..IN_FLIGHT {
                publisher
                    .publish(&StringMsg::new(format!("{}:{}", round, n)))
                    .expect("publish should succeed");
            }
        }
        assert_eq!(
            node.pool().available(),
            node.pool().capacity() - TOPICS * IN_FLIGHT
        );
        for (_, subscriber) in &endpoints {
            for n in 0..IN_FLIGHT {
                let got = subscriber
                    .try_recv()
                    .expect("recv should succeed")
                    .expect("message should be ready");
                assert_eq!(got.data, format!("{}:{}", round, n));
            }
        }
    }

    assert_eq!(node.pool().unpooled_checkouts(), 0);
    assert_eq!(node.pool().available(), node.pool().capacity());
}

#[test]
fn test_transient_local_history_pins_only_its_depth() {
    let node = Node::new("it_pool_latched").expect("build should succeed");
    let qos = QoS::reliable().transient_local().keep_last(3);
    let publisher = node
        .publish::<StringMsg>("/latched_pool", Some(qos))
        .expect("bind should succeed");
    let subscriber = node
        .subscribe::<StringMsg>("/latched_pool", Some(qos))
        .expect("bind should succeed");

    for i in 0..10 {
        publisher
            .publish(&StringMsg::new(format!("{}", i)))
            .expect("publish should succeed");
        subscriber
            .try_recv()
            .expect("recv should succeed")
            .expect("message should be ready");
    }
    assert_eq!(node.pool().available(), node.pool().capacity() - 3);
}

fn hub_pair(hub: &LocalTransport, talker: &str, listener: &str) -> (Node, Node) {
    let build = |name: &str| {
        Node::builder(name)
            .transport("local", Arc::new(hub.clone()))
            .build()
            .expect("build should succeed")
    };
    (build(talker), build(listener))
}

#[test]
fn test_reliable_topic_across_hub_loses_nothing() {
    let hub = LocalTransport::shared_with(4, Duration::from_secs(2));
    let (talker, listener) = hub_pair(&hub, "it_rel_hub_talker", "it_rel_hub_listener");
    let qos = QoS::reliable().keep_last(4);
    let subscriber = listener
        .subscribe::<Counter>("/counter", Some(qos))
        .expect("bind should succeed");
    let publisher = talker
        .publish::<Counter>("/counter", Some(qos))
        .expect("bind should succeed");

    thread::scope(|scope| {
        let reader = scope.spawn(|| {
            (0..50)
                .map(|_| {
                    thread::sleep(Duration::from_millis(1));
                    subscriber
                        .recv_blocking(WAIT)
                        .expect("every message should arrive")
                        .value
                })
                .collect::<Vec<_>>()
        });
        for value in 0..50 {
            publisher
                .publish(&Counter { producer: 0, value })
                .expect("publish should succeed");
        }
        let values = reader.join().expect("reader panicked");
        assert_eq!(values, (0..50).collect::<Vec<_>>());
    });
    assert_eq!(subscriber.stats().dropped, 0);
}

#[test]
fn test_reliable_topic_across_hub_reports_backpressure() {
    let hub = LocalTransport::shared_with(4, Duration::from_millis(20));
    let (talker, listener) = hub_pair(&hub, "it_rel_bp_talker", "it_rel_bp_listener");
    let qos = QoS::reliable().keep_last(4);
    let subscriber = listener
        .subscribe::<Counter>("/stalled", Some(qos))
        .expect("bind should succeed");
    let publisher = talker
        .publish::<Counter>("/stalled", Some(qos))
        .expect("bind should succeed");

    let mut accepted = 0;
    loop {
        match publisher.publish(&Counter {
            producer: 0,
            value: accepted,
        }) {
            Ok(_) => accepted += 1,
            Err(Error::Timeout) => break,
            Err(e) => panic!("unexpected error: {}", e),
        }
        assert!(accepted < 50, "a stalled reliable subscriber never pushed back");
    }

    // Everything the talker was told succeeded is delivered, in order.
    for value in 0..accepted {
        let got = subscriber.recv_blocking(WAIT).expect("message should arrive");
        assert_eq!(got.value, value);
    }
    assert!(matches!(
        subscriber.recv_blocking(Duration::from_millis(50)),
        Err(Error::Timeout)
    ));
}
