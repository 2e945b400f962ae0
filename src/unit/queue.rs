//! queue.rs
//! Coalescing admission queues in front of the scheduler and the framer.
//! - events: merge only inside the configured window and only for
//!   MERGE_LAST kinds; the scan overwrites every matching slot
//! - jobs: unconditional last-wins merge on equal kind
//! - merged slots keep their queue position; only their contents change

use crate::unit::record::{Event, Job, MergePolicy};
use crate::unit::ring::Ring;

/// Event queue depth.
pub const EVENT_QUEUE_CAP: usize = 8;
/// Job queue depth.
pub const JOB_QUEUE_CAP: usize = 4;

/// Outcome of a coalescing push. `Merged` carries the number of overwritten
/// slots so the caller can account each one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Merged(u32),
    Appended,
    Dropped,
}

#[derive(Debug, Default)]
pub struct EventQueue {
    ring: Ring<Event, EVENT_QUEUE_CAP>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self { ring: Ring::new() }
    }

    /// Admit an event. A zero window disables merging entirely; command
    /// events always append. Timestamp distance uses wrapping subtraction so
    /// a `t_ms` rollover inside the window still merges.
    pub fn push_coalescing(&mut self, e: Event, window_ms: u16) -> Admission {
        if window_ms > 0
            && e.kind.merge_policy() == MergePolicy::Last
            && !self.ring.is_empty()
        {
            let mut hits = 0u32;
            for i in 0..self.ring.len() {
                if let Some(slot) = self.ring.at_mut(i) {
                    if slot.kind == e.kind
                        && e.t_ms.wrapping_sub(slot.t_ms) <= window_ms as u32
                    {
                        *slot = e;
                        hits += 1;
                    }
                }
            }
            if hits > 0 {
                return Admission::Merged(hits);
            }
        }
        match self.ring.push(e) {
            Ok(()) => Admission::Appended,
            Err(_) => Admission::Dropped,
        }
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.ring.pop()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct JobQueue {
    ring: Ring<Job, JOB_QUEUE_CAP>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self { ring: Ring::new() }
    }

    /// Admit a job, overwriting any queued job of the same kind.
    pub fn push_coalescing(&mut self, j: Job) -> Admission {
        if !self.ring.is_empty() {
            let mut hits = 0u32;
            for i in 0..self.ring.len() {
                if let Some(slot) = self.ring.at_mut(i) {
                    if slot.kind == j.kind {
                        *slot = j;
                        hits += 1;
                    }
                }
            }
            if hits > 0 {
                return Admission::Merged(hits);
            }
        }
        match self.ring.push(j) {
            Ok(()) => Admission::Appended,
            Err(_) => Admission::Dropped,
        }
    }

    pub fn pop(&mut self) -> Option<Job> {
        self.ring.pop()
    }

    /// Peek the `i`-th queued job, oldest first. The dirty-mask recomputation
    /// walks the queue through this.
    pub fn at(&self, i: usize) -> Option<&Job> {
        self.ring.at(i)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}
