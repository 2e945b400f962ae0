/*This benchmark measures the cost of building one wire frame: CRC over the
header+payload, consistent-overhead byte stuffing into the pending buffer, and
the delimiter append. The all-zero payload is the stuffing worst case. */
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use bpu_link::unit::cobs;
use bpu_link::unit::frame::PendingFrame;

fn bench_frame_build(c: &mut Criterion) {
    let zeros = [0u8; 64];
    let mixed: Vec<u8> = (0..64u32).map(|i| (i % 7) as u8).collect();

    c.bench_function("frame_build_zero_payload", |b| {
        let mut frame = PendingFrame::new();
        let mut seq = 0u8;
        b.iter(|| {
            frame.load(4, seq, black_box(&zeros)).unwrap();
            seq = seq.wrapping_add(1);
            black_box(frame.len());
        });
    });

    c.bench_function("frame_build_mixed_payload", |b| {
        let mut frame = PendingFrame::new();
        let mut seq = 0u8;
        b.iter(|| {
            frame.load(2, seq, black_box(&mixed)).unwrap();
            seq = seq.wrapping_add(1);
            black_box(frame.len());
        });
    });

    c.bench_function("stuff_unstuff_round_trip", |b| {
        let mut enc = [0u8; 96];
        let mut dec = [0u8; 96];
        b.iter(|| {
            let n = cobs::encode(black_box(&zeros), &mut enc).unwrap();
            let m = cobs::decode(&enc[..n], &mut dec).unwrap();
            black_box(m);
        });
    });
}

criterion_group!(benches, bench_frame_build);
criterion_main!(benches);
