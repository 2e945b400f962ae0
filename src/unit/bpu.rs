//! bpu.rs
//! The bounded processing unit: admission, coalescing, scheduling, framing,
//! and paced transmit, all inline storage, driven by one periodic tick.
//!
//! One tick runs: drain any staged frame → promote queued events to jobs →
//! frame and transmit jobs until the byte budget or the link gives out.
//! At most one frame is staged at any time; a partially written frame is
//! carried across ticks untouched so the wire never sees an interleaved or
//! torn frame.

use log::debug;
use thiserror::Error;

use crate::unit::config::Config;
use crate::unit::frame::{FRAME_CRC_LEN, FRAME_HEADER_LEN, PendingFrame};
use crate::unit::io::{IoError, LinkIo};
use crate::unit::queue::{Admission, EventQueue, JobQueue};
use crate::unit::record::{Event, EventKind, Job, JobKind};
use crate::unit::stats::Stats;

/// Marker checked on every mutating entry.
const INIT_MAGIC: u32 = 0x4250_5531;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BpuError {
    #[error("unit not initialized")]
    NotInitialized,
    #[error("queue full, admission dropped")]
    QueueFull,
    #[error("frame exceeds encode capacity")]
    Encode,
    #[error(transparent)]
    Io(#[from] IoError),
}

/// The unit. Owned by exactly one task; no entry point blocks or suspends.
pub struct Bpu<L: LinkIo> {
    io: L,
    cfg: Config,
    st: Stats,
    evq: EventQueue,
    jobq: JobQueue,
    pending: PendingFrame,
    seq: u8,
    magic: u32,
}

impl<L: LinkIo> Bpu<L> {
    pub fn new(io: L, cfg: Config) -> Self {
        Self {
            io,
            cfg,
            st: Stats::default(),
            evq: EventQueue::new(),
            jobq: JobQueue::new(),
            pending: PendingFrame::new(),
            seq: 0,
            magic: INIT_MAGIC,
        }
    }

    /// Admit one producer event. Payload clamps to the 16-byte inline
    /// capacity. Merging follows the configured window and per-kind policy;
    /// a full queue drops the event and reports it.
    pub fn push_event(
        &mut self,
        kind: EventKind,
        payload: &[u8],
        now_ms: u32,
    ) -> Result<(), BpuError> {
        self.check_init()?;

        match kind {
            EventKind::Sensor => self.st.pick_sensor += 1,
            EventKind::Hb => self.st.pick_hb += 1,
            EventKind::Telem => self.st.pick_telem += 1,
            EventKind::Cmd => {}
        }

        self.admit_event(Event::new(kind, payload, now_ms))
    }

    /// Run one cycle: drain → schedule → flush. Bounded by the byte budget.
    pub fn tick(&mut self, now_ms: u32) -> Result<(), BpuError> {
        self.tick_ex(now_ms, 0)
    }

    /// [`Bpu::tick`] with an explicit microsecond stamp for work-time
    /// accounting; pass 0 to fall back to the link clock.
    pub fn tick_ex(&mut self, now_ms: u32, now_us: u32) -> Result<(), BpuError> {
        self.check_init()?;

        let t0 = if now_us != 0 { Some(now_us) } else { self.io.time_us() };

        let mut budget = self.cfg.tx_budget_bytes;
        let mut rc = Ok(());

        // a frame left over from the previous tick goes out first; this is
        // the only step whose failure escalates to the caller
        if self.pending.is_active() {
            if let Err(e) = self.send_pending(&mut budget) {
                rc = Err(e);
            }
        }

        if rc.is_ok() {
            self.schedule_from_events(now_ms);
            self.flush_jobs(&mut budget);
        }

        self.st.tick += 1;

        let dirty = self.dirty_mask();
        self.st.dirty_mask_lo = dirty as u32;
        self.st.dirty_mask_hi = (dirty >> 32) as u32;

        let t1 = if now_us != 0 { Some(now_us) } else { self.io.time_us() };
        if let (Some(t0), Some(t1)) = (t0, t1) {
            self.st.work_us_last = t1.saturating_sub(t0);
            if self.st.work_us_last > self.st.work_us_max {
                self.st.work_us_max = self.st.work_us_last;
            }
        }

        rc
    }

    #[inline]
    pub fn stats(&self) -> &Stats {
        &self.st
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// The owned link, for host-side draining and inspection.
    #[inline]
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.io
    }

    fn check_init(&self) -> Result<(), BpuError> {
        if self.magic != INIT_MAGIC {
            return Err(BpuError::NotInitialized);
        }
        Ok(())
    }

    fn admit_event(&mut self, e: Event) -> Result<(), BpuError> {
        self.st.ev_in += 1;
        match self.evq.push_coalescing(e, self.cfg.coalesce_window_ms) {
            Admission::Merged(hits) => {
                self.st.ev_merge += hits;
                Ok(())
            }
            Admission::Appended => Ok(()),
            Admission::Dropped => {
                self.st.ev_drop += 1;
                debug!("[bpu] event queue full, {} dropped", e.kind.name());
                Err(BpuError::QueueFull)
            }
        }
    }

    fn submit_job(&mut self, j: Job) -> Result<(), BpuError> {
        self.st.job_in += 1;
        match self.jobq.push_coalescing(j) {
            Admission::Merged(hits) => {
                self.st.job_merge += hits;
                Ok(())
            }
            Admission::Appended => Ok(()),
            Admission::Dropped => {
                self.st.job_drop += 1;
                debug!("[bpu] job queue full, {:?} dropped", j.kind);
                Err(BpuError::QueueFull)
            }
        }
    }

    /// Drain the event queue into jobs. Aging is observational: stale events
    /// are counted but routed the same as fresh ones.
    fn schedule_from_events(&mut self, now_ms: u32) {
        while let Some(e) = self.evq.pop() {
            self.st.ev_out += 1;

            if now_ms.wrapping_sub(e.t_ms) >= self.cfg.aged_ms as u32 {
                self.st.pick_aged += 1;
                match e.kind {
                    EventKind::Sensor => self.st.aged_hit_sensor += 1,
                    EventKind::Hb => self.st.aged_hit_hb += 1,
                    EventKind::Telem => self.st.aged_hit_telem += 1,
                    EventKind::Cmd => {}
                }
            }

            let _ = self.submit_job(Job::from_event(&e, now_ms));
        }
    }

    /// Stage a frame for `kind` with `payload`. The sequence number advances
    /// exactly once per build attempt, whether or not the bytes ever reach
    /// the wire.
    fn build_frame(&mut self, kind: JobKind, payload: &[u8]) -> Result<(), BpuError> {
        let seq = self.seq;
        self.seq = self.seq.wrapping_add(1);
        self.pending
            .load(kind as u8, seq, payload)
            .map_err(|_| BpuError::Encode)
    }

    /// Push staged bytes to the link under the remaining budget and chunk
    /// cap. Returns whether any byte moved. Zero bytes accepted by the link
    /// is backpressure: the frame stays staged for the next tick.
    fn send_pending(&mut self, budget_left: &mut u16) -> Result<bool, BpuError> {
        if !self.pending.is_active() {
            self.pending.clear();
            return Ok(false);
        }

        let mut progress = false;
        loop {
            let remaining = self.pending.remaining();
            if remaining == 0 {
                break;
            }

            let mut want = remaining.min(*budget_left as usize);
            if self.cfg.tx_chunk_max != 0 {
                want = want.min(self.cfg.tx_chunk_max as usize);
            }
            if want == 0 {
                break;
            }

            let wrote = self.io.tx_write_some(&self.pending.unsent()[..want])?;
            if wrote == 0 {
                self.st.tx_skip_backpressure += 1;
                break;
            }

            let wrote = wrote.min(want);
            self.pending.advance(wrote);
            *budget_left = budget_left.saturating_sub(wrote as u16);
            self.st.tx_bytes += wrote as u32;
            progress = true;
        }

        if self.pending.remaining() == 0 {
            self.pending.clear();
            self.st.tx_frame_sent += 1;
            self.st.pending_active = 0;
            self.st.pending_len = 0;
            self.st.pending_pos = 0;
        } else {
            if progress {
                self.st.tx_frame_partial += 1;
            }
            self.st.pending_active = 1;
            self.st.pending_len = self.pending.len() as u32;
            self.st.pending_pos = self.pending.pos() as u32;
        }

        Ok(progress)
    }

    /// Frame and transmit queued jobs until the budget, the queue, or the
    /// link stops us. A job popped but not fully dispatchable is re-admitted
    /// through the coalescing path, so repeated requeues of one kind cannot
    /// grow the queue.
    fn flush_jobs(&mut self, budget_left: &mut u16) {
        loop {
            if self.pending.is_active() {
                match self.send_pending(budget_left) {
                    Err(_) => return,
                    Ok(false) => return,
                    Ok(true) => continue,
                }
            }

            if self.jobq.is_empty() {
                return;
            }

            self.st.flush_try += 1;
            let j = match self.jobq.pop() {
                Some(j) => {
                    self.st.job_out += 1;
                    j
                }
                None => return,
            };

            // worst-case on-wire size: raw frame + stuffing overhead + delimiter
            let decoded = FRAME_HEADER_LEN + j.len as usize + FRAME_CRC_LEN;
            let on_wire = decoded + (decoded / 254 + 2) + 1;

            if on_wire > *budget_left as usize {
                self.st.tx_skip_budget += 1;
                if self.cfg.enable_degrade {
                    if j.kind == JobKind::Telem {
                        self.st.degrade_drop += 1;
                        debug!("[bpu] budget degrade, telemetry dropped");
                    } else {
                        let _ = self.submit_job(j);
                        self.st.degrade_requeue += 1;
                    }
                } else {
                    let _ = self.submit_job(j);
                }
                return;
            }

            let free = match self.io.tx_free() {
                Ok(f) => f,
                Err(_) => {
                    let _ = self.submit_job(j);
                    self.st.degrade_requeue += 1;
                    return;
                }
            };
            if free < self.cfg.tx_min_free as usize {
                let _ = self.submit_job(j);
                self.st.degrade_requeue += 1;
                self.st.tx_skip_backpressure += 1;
                return;
            }

            let n = (j.len as usize).min(j.payload.len());
            if self.build_frame(j.kind, &j.payload[..n]).is_err() {
                let _ = self.submit_job(j);
                self.st.degrade_requeue += 1;
                return;
            }

            let before = *budget_left;
            match self.send_pending(budget_left) {
                Err(_) => {
                    // never leave a half-broken frame staged
                    self.pending.clear();
                    let _ = self.submit_job(j);
                    self.st.degrade_requeue += 1;
                    return;
                }
                Ok(false) => {
                    self.pending.clear();
                    let _ = self.submit_job(j);
                    self.st.degrade_requeue += 1;
                    self.st.tx_skip_backpressure += 1;
                    return;
                }
                Ok(true) => {
                    self.st.flush_ok += 1;
                    if before == *budget_left {
                        return;
                    }
                }
            }
        }
    }

    /// Bit per queued job kind (1..=63); bit 63 also flags a staged frame.
    fn dirty_mask(&self) -> u64 {
        let mut m = 0u64;
        for i in 0..self.jobq.len() {
            if let Some(j) = self.jobq.at(i) {
                let t = j.kind as u8;
                if (1..=63).contains(&t) {
                    m |= 1u64 << t;
                }
            }
        }
        if self.pending.is_active() {
            m |= 1u64 << 63;
        }
        m
    }
}
