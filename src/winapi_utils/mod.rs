//! Safe wrappers around the Windows API calls used for alerts.
//!
//! Message boxes for confirmations and synchronous WAV playback for
//! audio cues.

pub mod dialog;
pub mod sound;

pub use dialog::*;
pub use sound::*;
