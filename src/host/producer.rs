//! producer.rs
//! Periodic event producers feeding the unit's owning task.
//! - real-time pacing: SpinSleeper keeps each cadence honest
//! - non-blocking try_send toward the task; drops are counted, never waited on
//! - payload encodings mirror what the firmware producers put on the bus

use crossbeam::channel::Sender;
use log::debug;
use rand::random_range;
use spin_sleep::{SpinSleeper, SpinStrategy};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use crate::unit::record::EventKind;

/// One raw producer emission, not yet admitted to the unit.
#[derive(Debug, Clone)]
pub struct Stimulus {
    pub kind: EventKind,
    pub payload: Vec<u8>,
}

/// A periodic producer of one event kind.
pub struct Producer {
    name: &'static str,
    kind: EventKind,
    period_ms: u64,
    tx: Sender<Stimulus>,
    running: Arc<AtomicBool>,
    started: Instant,
}

impl Producer {
    pub fn new(
        name: &'static str,
        kind: EventKind,
        period_ms: u64,
        tx: Sender<Stimulus>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            name,
            kind,
            period_ms,
            tx,
            running,
            started: Instant::now(),
        }
    }

    /// Produce until the running flag drops. Sends never block; a saturated
    /// channel costs the sample, not the cadence.
    pub fn run(&self) {
        let period = Duration::from_millis(self.period_ms);
        let sleeper = SpinSleeper::new(100_000).with_spin_strategy(SpinStrategy::YieldThread);

        let mut next_release = Instant::now() + period;
        let mut dropped: u64 = 0;

        while self.running.load(Ordering::Acquire) {
            let now = Instant::now();
            if now < next_release {
                sleeper.sleep(next_release - now);
            }

            let stim = Stimulus {
                kind: self.kind,
                payload: self.sample(),
            };
            if let Err(e) = self.tx.try_send(stim) {
                dropped += 1;
                debug!("[{}] send failed: {:?}", self.name, e);
                if e.is_disconnected() {
                    break;
                }
            }

            next_release += period;
        }

        debug!("[{}] stopped, {} sends dropped", self.name, dropped);
    }

    /// Payload for one emission, matching the firmware encodings.
    fn sample(&self) -> Vec<u8> {
        let uptime_ms = self.started.elapsed().as_millis() as u32;
        match self.kind {
            // 16-bit little-endian reading around a nominal value
            EventKind::Sensor => {
                let v: u16 = random_range(980..1020);
                vec![(v & 0xFF) as u8, (v >> 8) as u8]
            }
            // liveness marker
            EventKind::Hb => vec![0x01],
            // 32-bit little-endian uptime
            EventKind::Telem => uptime_ms.to_le_bytes().to_vec(),
            // one-byte opcode
            EventKind::Cmd => vec![random_range(0x10..0x14u8)],
        }
    }
}

/// Spawn a producer thread in the usual shape: build, run, exit on flag.
pub fn spawn_producer(
    name: &'static str,
    kind: EventKind,
    period_ms: u64,
    tx: Sender<Stimulus>,
    running: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let producer = Producer::new(name, kind, period_ms, tx, running);
        producer.run();
    })
}
