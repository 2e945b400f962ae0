//! io.rs
//! Capabilities the unit needs from its serial transport. Implementations
//! must be non-blocking; a write that cannot proceed reports zero bytes, not
//! an error.

use thiserror::Error;

/// Transport-level failure. Anything richer stays on the host side.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("link transport fault")]
pub struct IoError;

/// Serial link handle held by the unit.
pub trait LinkIo {
    /// Bytes the transport will accept immediately.
    fn tx_free(&mut self) -> Result<usize, IoError>;

    /// Write up to `chunk.len()` bytes without blocking. Returns the number
    /// accepted; zero means backpressure.
    fn tx_write_some(&mut self, chunk: &[u8]) -> Result<usize, IoError>;

    /// Optional monotonic microsecond clock for work-time accounting.
    fn time_us(&mut self) -> Option<u32> {
        None
    }
}
