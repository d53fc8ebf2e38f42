//! Camera acquisition, health and release.
//!
//! Acquisition blocks until a camera is available: the monitor runs
//! unattended and is expected to wait for the user to plug one in. Indices
//! are rescanned from scratch on every acquisition because they are not
//! stable across reconnects.

use super::backend::{CaptureBackend, CaptureDevice, Frame};
use crate::config::DeviceConfig;
use crate::error::{CaptureError, MonitorError};
use crate::shutdown::ShutdownSignal;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

const NO_INDEX: i32 = -1;

/// Read-only view of the device state for other threads.
#[derive(Debug, Clone)]
pub struct DeviceStatus {
    open: Arc<AtomicBool>,
    index: Arc<AtomicI32>,
    acquisitions: Arc<AtomicU64>,
}

impl Default for DeviceStatus {
    fn default() -> Self {
        Self {
            open: Arc::new(AtomicBool::new(false)),
            index: Arc::new(AtomicI32::new(NO_INDEX)),
            acquisitions: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl DeviceStatus {
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn current_index(&self) -> Option<i32> {
        match self.index.load(Ordering::SeqCst) {
            NO_INDEX => None,
            index => Some(index),
        }
    }

    /// Number of successful acquisitions since start.
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::SeqCst)
    }

    fn mark_open(&self, index: i32) {
        self.index.store(index, Ordering::SeqCst);
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        self.open.store(true, Ordering::SeqCst);
    }

    fn mark_closed(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.index.store(NO_INDEX, Ordering::SeqCst);
    }

    #[cfg(test)]
    pub(crate) fn simulate(&self, index: Option<i32>) {
        match index {
            Some(index) => self.mark_open(index),
            None => self.mark_closed(),
        }
    }
}

/// Owns the single open capture device.
pub struct DeviceManager {
    backend: Box<dyn CaptureBackend>,
    device: Option<Box<dyn CaptureDevice>>,
    status: DeviceStatus,
    probe_range: RangeInclusive<i32>,
    retry_backoff: Duration,
}

impl DeviceManager {
    pub fn new(backend: Box<dyn CaptureBackend>, config: &DeviceConfig) -> Self {
        Self {
            backend,
            device: None,
            status: DeviceStatus::default(),
            probe_range: config.probe_range(),
            retry_backoff: config.retry_backoff(),
        }
    }

    /// Shared status handle for the health check.
    pub fn status(&self) -> DeviceStatus {
        self.status.clone()
    }

    /// Blocks until a camera opens.
    ///
    /// Returns the opened index, or `None` if a stop was requested while
    /// waiting.
    pub fn acquire(&mut self, shutdown: &ShutdownSignal) -> Option<i32> {
        loop {
            if shutdown.is_requested() {
                return None;
            }

            match self.try_acquire() {
                Ok(index) => return Some(index),
                Err(e) => {
                    tracing::debug!(
                        error = %e,
                        backoff_secs = self.retry_backoff.as_secs(),
                        "No camera available, retrying"
                    );
                }
            }

            if !shutdown.sleep(self.retry_backoff) {
                return None;
            }
        }
    }

    /// One enumeration and probing pass.
    pub fn try_acquire(&mut self) -> Result<i32, MonitorError> {
        self.release();

        let cameras = self.backend.enumerate();
        if cameras.is_empty() {
            tracing::debug!("No USB camera detected. Please insert an external camera.");
            return Err(MonitorError::DeviceUnavailable);
        }
        tracing::debug!(count = cameras.len(), "Camera(s) detected, probing indices");

        let device = self.probe().ok_or(MonitorError::DeviceUnavailable)?;
        let index = device.index();
        self.device = Some(device);
        self.status.mark_open(index);
        tracing::info!(index, "Camera opened");
        Ok(index)
    }

    /// Opens the first index in the probe range that works.
    ///
    /// Devices that fail to open are released before the next index is tried.
    fn probe(&self) -> Option<Box<dyn CaptureDevice>> {
        for index in self.probe_range.clone() {
            match self.backend.open(index) {
                Ok(device) if device.is_open() => return Some(device),
                Ok(mut device) => {
                    tracing::debug!(index, "Failed to open camera");
                    device.release();
                }
                Err(e) => {
                    tracing::debug!(index, error = %e, "Failed to open camera");
                }
            }
        }
        None
    }

    pub fn is_healthy(&self) -> bool {
        self.device.as_ref().is_some_and(|d| d.is_open())
    }

    /// Reads one frame from the open device.
    pub fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        let device = self.device.as_mut().ok_or(CaptureError::NotOpen)?;
        device.read_frame()
    }

    /// Closes the open device, if any.
    pub fn release(&mut self) {
        if let Some(mut device) = self.device.take() {
            let index = device.index();
            device.release();
            tracing::info!(index, "Camera released");
        }
        self.status.mark_closed();
    }
}

impl Drop for DeviceManager {
    fn drop(&mut self) {
        self.release();
    }
}
