/*
Per-tick cost of turning a command into actuator values, for both profiles.
The control loop runs this at most once per period, so anything in the
microsecond range is noise against 100 ms.
*/

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use rc_drive::actuation::mapping::{MappingPolicy, drive, turn};
use rc_drive::ingestion::{
    command::decode_payload,
    joystick::{AxisMap, scale_angle, scale_speed},
};

//Speeds covering reverse, the deadzone and forward
const SPEEDS: &[i32] = &[0, 20, 43, 50, 55, 80, 100];

fn bench_drive(c: &mut Criterion) {
    let mut group = c.benchmark_group("drive_mapping");

    for (name, policy) in [("joystick", MappingPolicy::joystick()), ("network", MappingPolicy::network())] {
        group.bench_with_input(BenchmarkId::new("drive", name), &policy, |b, policy| {
            b.iter(|| {
                for &speed in SPEEDS {
                    black_box(drive(black_box(speed), &policy.drive));
                }
            })
        });
    }
    group.finish();
}

fn bench_turn(c: &mut Criterion) {
    let mut group = c.benchmark_group("steer_mapping");

    for (name, policy) in [("joystick", MappingPolicy::joystick()), ("network", MappingPolicy::network())] {
        group.bench_with_input(BenchmarkId::new("turn", name), &policy, |b, policy| {
            b.iter(|| {
                for angle in (0..=180).step_by(15) {
                    black_box(turn(black_box(angle), &policy.steer));
                }
            })
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let payload = br#"{"speed": 72, "angle": 135}"#;
    c.bench_function("decode_payload", |b| b.iter(|| decode_payload(black_box(payload))));

    let axes = AxisMap::default();
    c.bench_function("scale_axes", |b| {
        b.iter(|| {
            black_box(scale_speed(black_box(33_000), &axes.speed));
            black_box(scale_angle(black_box(28_000), &axes.angle));
        })
    });
}

criterion_group!(benches, bench_drive, bench_turn, bench_decode);
criterion_main!(benches);
