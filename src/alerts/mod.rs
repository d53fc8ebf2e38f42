//! User alerts.
//!
//! Posture, camera and break alerts all go through one [`AlertChannel`],
//! which is safe to call from any thread.

pub mod channel;
pub mod desktop;
pub mod gate;
pub mod types;

pub use channel::*;
pub use desktop::*;
pub use gate::*;
pub use types::*;
