pub mod bpu;
pub mod cobs;
pub mod config;
pub mod crc;
pub mod frame;
pub mod io;
pub mod queue;
pub mod record;
pub mod ring;
pub mod stats;

pub use bpu::{Bpu, BpuError};
pub use config::Config;
pub use io::{IoError, LinkIo};
pub use record::{Event, EventKind, Job, JobKind, MergePolicy};
pub use stats::Stats;
