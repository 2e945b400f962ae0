pub mod export;
pub mod link;
pub mod monitor;
pub mod producer;
pub mod task;
