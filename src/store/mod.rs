//! Off-thread persistence of captured evidence.
//!
//! Frames and detection-log lines are written on a small bounded pool so
//! that disk I/O never stalls capture.

pub mod capture_store;
pub mod timestamp;
pub mod worker_pool;

pub use capture_store::*;
pub use timestamp::*;
pub use worker_pool::*;
