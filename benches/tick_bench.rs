/*This benchmark measures one full unit cycle under steady producer traffic:
event admission with coalescing, scheduling, framing, and the paced drain onto
the virtual UART. It approximates the per-tick cost the owning task pays. */
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use bpu_link::host::link::VirtualUart;
use bpu_link::unit::{Bpu, Config, EventKind};

fn bench_tick(c: &mut Criterion) {
    c.bench_function("tick_with_sensor_and_heartbeat", |b| {
        let uart = VirtualUart::new(4096, 96, 128);
        let mut bpu = Bpu::new(uart, Config::default());
        let mut now_ms = 0u32;

        b.iter(|| {
            bpu.push_event(EventKind::Sensor, black_box(&[0x34, 0x12]), now_ms)
                .unwrap();
            bpu.push_event(EventKind::Hb, black_box(&[0x01]), now_ms).unwrap();
            bpu.tick(now_ms).unwrap();
            now_ms = now_ms.wrapping_add(20);

            // keep the virtual line from filling up and skewing the numbers
            let drained = bpu.link_mut().drain_all();
            black_box(drained.len());
        });
    });

    c.bench_function("tick_idle", |b| {
        let uart = VirtualUart::new(4096, 96, 128);
        let mut bpu = Bpu::new(uart, Config::default());
        let mut now_ms = 0u32;

        b.iter(|| {
            bpu.tick(now_ms).unwrap();
            now_ms = now_ms.wrapping_add(20);
        });
    });
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
