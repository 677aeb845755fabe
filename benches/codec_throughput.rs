//! Benchmarks for the text channel codec
//!
//! Covers the per-tick hot path on the producer side (skeleton assembly and
//! encoding) and the consumer side (framing and skeleton decoding).

use bodylink::assembler::FrameAssembler;
use bodylink::protocol::{Frame, Message, decode_face, decode_skeleton, encode_face, encode_skeleton};
use bodylink::test_utils::{crowded_frame, tracked_body};
use bodylink::types::{FaceFrame, HandState, SkeletonFrame, Vector3};
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

fn full_skeleton() -> SkeletonFrame {
    let mut assembler = FrameAssembler::new();
    let body = tracked_body(1.5, HandState::Open, HandState::Closed);
    assembler.assemble(std::slice::from_ref(&body)).expect("tracked body should assemble");
    assembler.skeleton().clone()
}

fn bench_skeleton_encode(c: &mut Criterion) {
    let frame = full_skeleton();
    let mut line = String::with_capacity(2048);
    encode_skeleton(&frame, &mut line);

    let mut group = c.benchmark_group("skeleton_encode");
    group.throughput(Throughput::Bytes(line.len() as u64));

    group.bench_function("all_joints_tracked", |b| {
        b.iter(|| {
            line.clear();
            encode_skeleton(black_box(&frame), &mut line);
            black_box(line.len())
        })
    });

    group.finish();
}

fn bench_skeleton_decode(c: &mut Criterion) {
    let mut line = String::new();
    encode_skeleton(&full_skeleton(), &mut line);
    let payload = Frame::parse(&line).expect("encoded line should frame").payload;
    let mut dest = SkeletonFrame::new();

    let mut group = c.benchmark_group("skeleton_decode");
    group.throughput(Throughput::Bytes(payload.len() as u64));

    group.bench_function("all_joints_tracked", |b| {
        b.iter(|| {
            decode_skeleton(black_box(payload), dest.joints_mut()).expect("payload should decode");
            black_box(dest.get(bodylink::types::JointType::Head).position)
        })
    });

    group.finish();
}

fn bench_face(c: &mut Criterion) {
    let face = FaceFrame {
        animation_units: [0.1, -0.2, 0.3, 0.0, 0.5, -0.6],
        head_position: Vector3::new(0.0, 0.2, 1.4),
        head_rotation: Vector3::new(5.0, -12.5, 0.25),
    };
    let mut line = String::with_capacity(256);
    encode_face(&face, &mut line);
    let payload = line.split_once('|').map(|(_, p)| p.to_owned()).unwrap_or_default();

    c.bench_function("face_encode", |b| {
        b.iter(|| {
            line.clear();
            encode_face(black_box(&face), &mut line);
            black_box(line.len())
        })
    });

    c.bench_function("face_decode", |b| b.iter(|| black_box(decode_face(black_box(&payload)))));
}

fn bench_tick_assembly(c: &mut Criterion) {
    let frame = crowded_frame(6);
    let mut assembler = FrameAssembler::new();

    c.bench_function("assemble_six_slot_tick", |b| {
        b.iter(|| {
            let lines = assembler.assemble(black_box(&frame.bodies)).map(|tick| tick.skeleton.len());
            black_box(lines)
        })
    });
}

fn bench_message_parse(c: &mut Criterion) {
    let lines = ["P|", "L|2", "R|3", "d|Found a sensor", "E|No sensor device was found.", "V|"];

    c.bench_function("message_parse_mixed", |b| {
        b.iter(|| {
            for line in lines {
                let _ = black_box(Message::parse(black_box(line)));
            }
        })
    });
}

criterion_group!(
    benches,
    bench_skeleton_encode,
    bench_skeleton_decode,
    bench_face,
    bench_tick_assembly,
    bench_message_parse
);
criterion_main!(benches);
