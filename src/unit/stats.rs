//! stats.rs
//! Observable counters. Everything here is monotonic per run except the
//! pending_* and dirty_mask_* fields, which mirror current state.

use serde::Serialize;

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct Stats {
    /// Completed tick count.
    pub tick: u32,

    // event queue accounting
    pub ev_in: u32,
    pub ev_out: u32,
    pub ev_merge: u32,
    pub ev_drop: u32,

    // job queue accounting
    pub job_in: u32,
    pub job_out: u32,
    pub job_merge: u32,
    pub job_drop: u32,

    // transmit accounting
    pub tx_frame_sent: u32,
    pub tx_frame_partial: u32,
    pub tx_bytes: u32,
    pub tx_skip_budget: u32,
    pub tx_skip_backpressure: u32,
    pub flush_try: u32,
    pub flush_ok: u32,

    // admission and aging observation
    pub pick_sensor: u32,
    pub pick_hb: u32,
    pub pick_telem: u32,
    pub pick_aged: u32,
    pub aged_hit_sensor: u32,
    pub aged_hit_hb: u32,
    pub aged_hit_telem: u32,

    // degrade policy outcomes
    pub degrade_drop: u32,
    pub degrade_requeue: u32,

    // staged frame mirror
    pub pending_active: u32,
    pub pending_len: u32,
    pub pending_pos: u32,

    // queued-work bitmap, split for 32-bit consumers
    pub dirty_mask_lo: u32,
    pub dirty_mask_hi: u32,

    // tick work time, from the optional microsecond clock
    pub work_us_last: u32,
    pub work_us_max: u32,
}

impl Stats {
    /// Reassemble the 64-bit queued-work bitmap.
    pub fn dirty_mask(&self) -> u64 {
        (self.dirty_mask_hi as u64) << 32 | self.dirty_mask_lo as u64
    }
}
