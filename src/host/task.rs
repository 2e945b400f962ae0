//! task.rs
//! The owning task: the single caller of `push_event` and `tick`, paced at a
//! fixed period.
//! - drains the producer channel into the unit, then runs one tick
//! - shifts bytes off the virtual line between ticks and feeds the monitor
//! - wake-ups past their deadline are counted like any other deadline miss

use crossbeam::channel::Receiver;
use log::{debug, error};
use spin_sleep::{SpinSleeper, SpinStrategy};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use crate::host::export::StatsHistory;
use crate::host::link::VirtualUart;
use crate::host::monitor::{DecodedFrame, WireMonitor};
use crate::host::producer::Stimulus;
use crate::unit::{Bpu, Config, Stats};

/// Everything a finished run hands back for reporting.
pub struct TaskReport {
    pub stats: Stats,
    pub frames: Vec<DecodedFrame>,
    pub frames_ok: u64,
    pub frames_bad: u64,
    pub overruns: u64,
    pub history: StatsHistory,
}

/// Periodic task wrapping one unit and its virtual link.
pub struct LinkTask {
    bpu: Bpu<VirtualUart>,
    rx: Receiver<Stimulus>,
    running: Arc<AtomicBool>,
    tick_ms: u64,
    /// Bytes the line carries away per tick.
    wire_rate: usize,
    history_every: u32,
}

impl LinkTask {
    pub fn new(
        cfg: Config,
        uart: VirtualUart,
        rx: Receiver<Stimulus>,
        running: Arc<AtomicBool>,
        tick_ms: u64,
        wire_rate: usize,
    ) -> Self {
        Self {
            bpu: Bpu::new(uart, cfg),
            rx,
            running,
            tick_ms,
            wire_rate,
            history_every: 10,
        }
    }

    /// Run until the flag drops, then drain the line and report.
    pub fn run(mut self) -> TaskReport {
        let period = Duration::from_millis(self.tick_ms);
        let sleeper = SpinSleeper::new(100_000).with_spin_strategy(SpinStrategy::YieldThread);

        let started = Instant::now();
        let mut next_deadline = started + period;
        let mut monitor = WireMonitor::new();
        let mut history = StatsHistory::new(self.history_every);
        let mut frames = Vec::new();
        let mut overruns: u64 = 0;

        while self.running.load(Ordering::Acquire) {
            let now = Instant::now();
            if now < next_deadline {
                sleeper.sleep(next_deadline - now);
            } else {
                overruns += 1;
            }

            let now_ms = started.elapsed().as_millis() as u32;

            // admit everything the producers queued since the last wake-up
            while let Ok(stim) = self.rx.try_recv() {
                if let Err(e) = self.bpu.push_event(stim.kind, &stim.payload, now_ms) {
                    debug!("[task] {} not admitted: {}", stim.kind.name(), e);
                }
            }

            if let Err(e) = self.bpu.tick(now_ms) {
                error!("[task] tick failed: {}", e);
            }

            // the line shifts bytes out between wake-ups
            let drained = self.bpu.link_mut().drain(self.wire_rate);
            for f in monitor.feed(&drained) {
                debug!(
                    "[wire] kind={} seq={} len={}",
                    f.kind,
                    f.seq,
                    f.payload.len()
                );
                frames.push(f);
            }

            history.sample(self.bpu.stats());
            next_deadline += period;
        }

        // the run is over; let the line finish what was already accepted
        let leftover = self.bpu.link_mut().drain_all();
        frames.extend(monitor.feed(&leftover));

        TaskReport {
            stats: *self.bpu.stats(),
            frames,
            frames_ok: monitor.frames_ok,
            frames_bad: monitor.frames_bad,
            overruns,
            history,
        }
    }
}
