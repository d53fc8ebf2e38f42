//! OpenCV capture backend and PNG writer.

use super::backend::{CaptureBackend, CaptureDevice, DeviceInfo, Frame};
use super::enumerate::list_usb_cameras;
use crate::error::{CaptureError, PersistenceError};
use crate::store::ImageWriter;
use opencv::core::{Mat, Vector};
use opencv::prelude::*;
use opencv::{imgcodecs, videoio};
use std::path::Path;

/// Cameras through `cv::VideoCapture`.
#[derive(Debug, Default)]
pub struct OpenCvBackend;

impl OpenCvBackend {
    pub fn new() -> Self {
        Self
    }
}

impl CaptureBackend for OpenCvBackend {
    fn enumerate(&self) -> Vec<DeviceInfo> {
        list_usb_cameras()
    }

    fn open(&self, index: i32) -> Result<Box<dyn CaptureDevice>, CaptureError> {
        let capture = videoio::VideoCapture::new(index, videoio::CAP_ANY)
            .map_err(|e| CaptureError::Backend(e.to_string()))?;
        Ok(Box::new(OpenCvCamera { index, capture }))
    }
}

struct OpenCvCamera {
    index: i32,
    capture: videoio::VideoCapture,
}

impl CaptureDevice for OpenCvCamera {
    fn index(&self) -> i32 {
        self.index
    }

    fn is_open(&self) -> bool {
        self.capture.is_opened().unwrap_or(false)
    }

    fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        let read_failed = |reason: String| CaptureError::ReadFailed {
            index: self.index,
            reason,
        };

        let mut mat = Mat::default();
        let grabbed = self
            .capture
            .read(&mut mat)
            .map_err(|e| read_failed(e.to_string()))?;
        if !grabbed || mat.empty() {
            return Err(read_failed("empty frame".into()));
        }
        if mat.channels() != Frame::CHANNELS as i32 {
            return Err(read_failed(format!("unexpected {} channels", mat.channels())));
        }

        let mat = if mat.is_continuous() {
            mat
        } else {
            mat.try_clone().map_err(|e| read_failed(e.to_string()))?
        };
        let data = mat
            .data_bytes()
            .map_err(|e| read_failed(e.to_string()))?
            .to_vec();

        let frame = Frame::new(mat.cols() as u32, mat.rows() as u32, data);
        if !frame.is_consistent() {
            return Err(read_failed(format!(
                "buffer of {} bytes does not match {}x{}",
                frame.data().len(),
                frame.width(),
                frame.height()
            )));
        }
        Ok(frame)
    }

    fn release(&mut self) {
        if let Err(e) = self.capture.release() {
            tracing::warn!(index = self.index, ?e, "Failed to release camera");
        }
    }
}

/// Encodes frames as PNG with `cv::imwrite`.
#[derive(Debug, Default)]
pub struct OpenCvImageWriter;

impl ImageWriter for OpenCvImageWriter {
    fn write_png(&self, frame: &Frame, path: &Path) -> Result<(), PersistenceError> {
        let encode = |e: opencv::Error| PersistenceError::Encode(e.to_string());

        let flat = Mat::from_slice(frame.data()).map_err(encode)?;
        let image = flat
            .reshape(Frame::CHANNELS as i32, frame.height() as i32)
            .map_err(encode)?;

        let path_str = path.to_string_lossy();
        let written = imgcodecs::imwrite(&path_str, &*image, &Vector::new()).map_err(encode)?;
        if !written {
            return Err(PersistenceError::Encode(format!(
                "imwrite refused {}",
                path.display()
            )));
        }
        Ok(())
    }
}
