//! Capture backend seam and the frame type handed to the extractor.

use crate::error::CaptureError;
use std::sync::Arc;

/// One captured image as packed 8-bit BGR rows.
///
/// Cloning is cheap; the pixel buffer is shared.
#[derive(Debug, Clone)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Arc<[u8]>,
}

impl Frame {
    pub const CHANNELS: u32 = 3;

    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data: data.into(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u32 {
        Self::CHANNELS
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Whether the buffer size matches the dimensions.
    pub fn is_consistent(&self) -> bool {
        self.data.len() == (self.width * self.height * Self::CHANNELS) as usize
    }
}

/// A video device reported by the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub description: String,
    /// Platform device path (sysfs path on Linux), used to spot USB devices.
    pub bus_path: String,
}

impl DeviceInfo {
    /// Placeholder for platforms that cannot enumerate devices.
    pub fn unenumerated() -> Self {
        Self {
            name: "camera".into(),
            description: "unenumerated capture device".into(),
            bus_path: String::new(),
        }
    }
}

/// An opened video source.
pub trait CaptureDevice: Send {
    fn index(&self) -> i32;

    fn is_open(&self) -> bool;

    /// Blocks until the next frame is available.
    fn read_frame(&mut self) -> Result<Frame, CaptureError>;

    fn release(&mut self);
}

/// Platform access to cameras.
pub trait CaptureBackend: Send {
    /// Lists attached devices that look like cameras.
    fn enumerate(&self) -> Vec<DeviceInfo>;

    /// Opens the device at `index`.
    fn open(&self, index: i32) -> Result<Box<dyn CaptureDevice>, CaptureError>;
}
