//! # bpu_link
//!
//! A bounded processing unit for serial uplinks: bursty producer events are
//! coalesced in fixed-capacity ring queues, promoted to jobs, framed with
//! CRC16-CCITT + consistent-overhead byte stuffing, and drained to the link
//! under a per-tick byte budget with backpressure awareness.
//!
//! ## Layout
//! - [`unit`]: the core itself, heap-free and single-threaded, owned by one
//!   periodic task.
//! - [`host`]: harness around the core, with a virtual UART, periodic
//!   producers, the owning task loop, a receiver-side wire monitor, and
//!   stats export.

pub mod host;
pub mod unit;

pub use unit::{Bpu, BpuError, Config, Event, EventKind, IoError, Job, JobKind, LinkIo, Stats};
