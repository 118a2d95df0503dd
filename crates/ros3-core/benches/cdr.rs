// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::semicolon_if_nothing_returned)] // Benchmark code formatting

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ros3_core::msgs::{JointCommand, RobotState, StringMsg};
use ros3_core::{ArchiveCodec, Buffer, CdrCodec, Codec, JsonCodec, Message};

fn robot_state() -> RobotState {
    RobotState {
        position: [1.0, 2.0, 3.0],
        velocity: [0.1, 0.2, 0.3],
        timestamp: 1_700_000_000_000_000_000,
    }
}

// ============================================================================
// Codec Benchmarks
// ============================================================================

/// Benchmark: RobotState encode per codec
/// Target (CDR): < 100 ns
fn bench_encode_robot_state(c: &mut Criterion) {
    let schema = RobotState::type_descriptor();
    let state = robot_state();
    let mut group = c.benchmark_group("encode_robot_state");

    group.bench_function("cdr", |b| {
        let mut out = Buffer::unpooled(256);
        b.iter(|| {
            out.clear();
            CdrCodec::new()
                .encode(black_box(&state), &schema, &mut out)
                .unwrap();
        })
    });
    group.bench_function("json", |b| {
        let mut out = Buffer::unpooled(256);
        b.iter(|| {
            out.clear();
            JsonCodec::new()
                .encode(black_box(&state), &schema, &mut out)
                .unwrap();
        })
    });
    group.finish();
}

/// Benchmark: RobotState decode
fn bench_decode_robot_state(c: &mut Criterion) {
    let schema = RobotState::type_descriptor();
    let mut out = Buffer::unpooled(256);
    CdrCodec::new()
        .encode(&robot_state(), &schema, &mut out)
        .unwrap();
    let bytes = out.as_slice().to_vec();

    c.bench_function("decode_robot_state_cdr", |b| {
        b.iter(|| {
            let state: RobotState = CdrCodec::new().decode(black_box(&bytes), &schema).unwrap();
            black_box(state);
        })
    });
}

/// Benchmark: string payloads of growing size
fn bench_string_sizes(c: &mut Criterion) {
    let schema = StringMsg::type_descriptor();
    let mut group = c.benchmark_group("encode_string_cdr");
    for size in [16usize, 256, 4096] {
        let msg = StringMsg::new("x".repeat(size));
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &msg, |b, msg| {
            let mut out = Buffer::unpooled(size + 16);
            b.iter(|| {
                out.clear();
                CdrCodec::new().encode(msg, &schema, &mut out).unwrap();
            })
        });
    }
    group.finish();
}

/// Benchmark: archive view (no copy)
/// Target: < 10 ns
fn bench_archive_view(c: &mut Criterion) {
    let schema = JointCommand::type_descriptor();
    let mut out = Buffer::unpooled(64);
    ArchiveCodec::new()
        .encode(&JointCommand::new(1, 0.5, 0.0, 1.0), &schema, &mut out)
        .unwrap();

    c.bench_function("archive_view_joint_command", |b| {
        b.iter(|| {
            let view: &JointCommand = ArchiveCodec::view(black_box(out.as_slice())).unwrap();
            black_box(view.position);
        })
    });
}

criterion_group!(
    benches,
    bench_encode_robot_state,
    bench_decode_robot_state,
    bench_string_sizes,
    bench_archive_view
);
criterion_main!(benches);
