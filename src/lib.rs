//! Wristguard - hand posture monitor.
//!
//! Watches an external camera, classifies the user's hand posture and
//! raises desktop alerts, with periodic camera health checks and break
//! reminders.

pub mod alerts;
pub mod config;
pub mod device;
pub mod error;
pub mod monitor;
pub mod posture;
pub mod shutdown;
pub mod store;

#[cfg(windows)]
pub mod winapi_utils;
