//! Core monitoring logic.
//!
//! The capture loop runs on the main thread; the status watcher, the
//! scheduler and the console observer run beside it and share state through
//! atomics.

pub mod console;
pub mod counters;
pub mod monitor_loop;
pub mod scheduler;
pub mod status_signal;

pub use console::*;
pub use counters::*;
pub use monitor_loop::*;
pub use scheduler::*;
pub use status_signal::*;
