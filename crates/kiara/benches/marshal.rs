// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Marshaling Benchmark
//!
//! Encode/decode cost of a derived struct over each message backend, and
//! native versus dynamic marshaling of the same value.

#![allow(clippy::uninlined_format_args)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kiara::marshal::write_value;
#[cfg(feature = "jsonrpc")]
use kiara::message::jsonrpc::JsonRpcMessage;
use kiara::message::tbp::TbpMessage;
use kiara::message::Message;
use kiara::{Kiara, Marshaler, Value, World};

#[derive(Kiara, Debug, Clone, PartialEq)]
struct Sample {
    id: u64,
    name: String,
    readings: Vec<f64>,
    flags: [bool; 4],
}

fn sample() -> Sample {
    Sample {
        id: 0xDEAD_BEEF,
        name: "sensor-17".into(),
        readings: (0..64).map(f64::from).collect(),
        flags: [true, false, true, false],
    }
}

fn bench_tbp(c: &mut Criterion) {
    let value = sample();
    c.bench_function("tbp_write", |b| {
        b.iter(|| {
            let mut msg = TbpMessage::scratch();
            Marshaler::new(&mut msg).write(black_box(&value)).unwrap();
            black_box(msg.finish().unwrap())
        });
    });

    let mut msg = TbpMessage::scratch();
    Marshaler::new(&mut msg).write(&value).unwrap();
    let bytes = msg.finish().unwrap();
    c.bench_function("tbp_read", |b| {
        b.iter(|| {
            let mut back = TbpMessage::from_scratch(black_box(&bytes)).unwrap();
            black_box(Marshaler::new(&mut back).read::<Sample>().unwrap())
        });
    });
}

#[cfg(feature = "jsonrpc")]
fn bench_jsonrpc(c: &mut Criterion) {
    let value = sample();
    c.bench_function("jsonrpc_write", |b| {
        b.iter(|| {
            let mut msg = JsonRpcMessage::response(serde_json::Value::from(1));
            Marshaler::new(&mut msg).write(black_box(&value)).unwrap();
            black_box(msg.finish().unwrap())
        });
    });

    let mut msg = JsonRpcMessage::response(serde_json::Value::from(1));
    Marshaler::new(&mut msg).write(&value).unwrap();
    let bytes = msg.finish().unwrap();
    c.bench_function("jsonrpc_read", |b| {
        b.iter(|| {
            let mut back = JsonRpcMessage::parse_response(black_box(&bytes)).unwrap();
            black_box(Marshaler::new(&mut back).read::<Sample>().unwrap())
        });
    });
}

#[cfg(not(feature = "jsonrpc"))]
fn bench_jsonrpc(_: &mut Criterion) {}

fn bench_dynamic(c: &mut Criterion) {
    let mut world = World::new();
    let ty = world.type_of::<Sample>();
    let value = sample();
    let dynamic = Value::structure([
        ("id", Value::U64(value.id)),
        ("name", Value::String(value.name.clone())),
        (
            "readings",
            Value::Array(value.readings.iter().copied().map(Value::F64).collect()),
        ),
        (
            "flags",
            Value::Array(value.flags.iter().copied().map(Value::Bool).collect()),
        ),
    ]);

    c.bench_function("dynamic_write", |b| {
        b.iter(|| {
            let mut msg = TbpMessage::scratch();
            write_value(&mut Marshaler::new(&mut msg), &world, ty, black_box(&dynamic)).unwrap();
            black_box(msg.finish().unwrap())
        });
    });
}

criterion_group!(benches, bench_tbp, bench_jsonrpc, bench_dynamic);
criterion_main!(benches);
