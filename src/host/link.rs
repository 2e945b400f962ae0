//! link.rs
//! In-memory UART stand-in so the unit can run against a realistic driver
//! without hardware.
//! - bounded TX fifo with a free-space query, like a serial driver's buffer
//! - write shaping: the driver keeps a reserve and clamps per-call size, so
//!   backpressure emerges from fifo occupancy instead of being scripted
//! - the "wire" side drains the fifo at a configurable pace

use std::collections::VecDeque;
use std::time::Instant;

use crate::unit::io::{IoError, LinkIo};

/// Virtual UART transmit side.
pub struct VirtualUart {
    fifo: VecDeque<u8>,
    capacity: usize,
    reserve: usize,
    chunk_max: usize,
    started: Instant,
    /// Set to make `tx_free`/`tx_write_some` report a driver fault.
    pub inject_fault: bool,
}

impl VirtualUart {
    /// `capacity` is the driver buffer size; `reserve` is held back before
    /// writes are accepted; `chunk_max` clamps a single write (0 = no clamp).
    pub fn new(capacity: usize, reserve: usize, chunk_max: usize) -> Self {
        Self {
            fifo: VecDeque::new(),
            capacity,
            reserve,
            chunk_max,
            started: Instant::now(),
            inject_fault: false,
        }
    }

    /// Bytes currently buffered and not yet on the wire.
    pub fn queued(&self) -> usize {
        self.fifo.len()
    }

    /// Shift up to `max` bytes onto the wire, as the line would between ticks.
    pub fn drain(&mut self, max: usize) -> Vec<u8> {
        let n = max.min(self.fifo.len());
        self.fifo.drain(..n).collect()
    }

    /// Empty the fifo completely.
    pub fn drain_all(&mut self) -> Vec<u8> {
        self.fifo.drain(..).collect()
    }
}

impl LinkIo for VirtualUart {
    fn tx_free(&mut self) -> Result<usize, IoError> {
        if self.inject_fault {
            return Err(IoError);
        }
        Ok(self.capacity - self.fifo.len())
    }

    fn tx_write_some(&mut self, chunk: &[u8]) -> Result<usize, IoError> {
        if self.inject_fault {
            return Err(IoError);
        }
        let free = self.capacity - self.fifo.len();
        if free <= self.reserve {
            return Ok(0);
        }
        let usable = free - self.reserve;
        let mut want = chunk.len().min(usable);
        if self.chunk_max != 0 {
            want = want.min(self.chunk_max);
        }
        self.fifo.extend(&chunk[..want]);
        Ok(want)
    }

    fn time_us(&mut self) -> Option<u32> {
        Some(self.started.elapsed().as_micros() as u32)
    }
}
