//! Capture device discovery and ownership.
//!
//! [`DeviceManager`] owns the one open camera. Platform access sits behind
//! [`CaptureBackend`]; the OpenCV implementation is enabled with the
//! `opencv` feature.

pub mod backend;
pub mod enumerate;
pub mod manager;
#[cfg(feature = "opencv")]
pub mod opencv_backend;

pub use backend::*;
pub use enumerate::*;
pub use manager::*;
#[cfg(feature = "opencv")]
pub use opencv_backend::*;
