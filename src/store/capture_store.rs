//! Evidence persistence: one PNG and one detection-log line per frame.
//!
//! The image path and timestamp are fixed on the capture thread; the write
//! itself runs on the worker pool, image first, then the log append. The
//! backlog is bounded: once it is full, frames are dropped and counted
//! instead of queued.

use super::timestamp::CaptureClock;
use super::worker_pool::WorkerPool;
use crate::config::AppConfig;
use crate::device::Frame;
use crate::error::PersistenceError;
use crate::posture::PostureVerdict;
use chrono::{DateTime, Local};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Timestamp format of detection-log lines.
pub const LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// Timestamp part of image file names.
pub const IMAGE_TIME_FORMAT: &str = "Y%Y-M%m-D%d_H%H-M%M-S%S-MS%6f";

/// Encodes a frame to an image file.
pub trait ImageWriter: Send + Sync {
    fn write_png(&self, frame: &Frame, path: &Path) -> Result<(), PersistenceError>;
}

#[derive(Debug, Default)]
struct PersistenceStats {
    images_saved: AtomicU64,
    log_lines: AtomicU64,
    failures: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time copy of the persistence counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistenceSnapshot {
    pub images_saved: u64,
    pub log_lines: u64,
    pub failures: u64,
    /// Frames refused because the backlog was full.
    pub dropped: u64,
}

/// What was scheduled for one frame.
#[derive(Debug, Clone)]
pub struct PersistTicket {
    pub timestamp: DateTime<Local>,
    pub message: &'static str,
    /// Where the image will be written, if images are saved.
    pub image_path: Option<PathBuf>,
}

pub struct CapturePersistence {
    image_dir: PathBuf,
    detection_log: PathBuf,
    prefix: String,
    save_images: bool,
    max_pending: usize,
    writer: Arc<dyn ImageWriter>,
    pool: Arc<WorkerPool>,
    clock: CaptureClock,
    log_lock: Arc<Mutex<()>>,
    stats: Arc<PersistenceStats>,
}

impl CapturePersistence {
    pub fn new(config: &AppConfig, writer: Arc<dyn ImageWriter>, pool: Arc<WorkerPool>) -> Self {
        Self {
            image_dir: config.image_dir(),
            detection_log: config.detection_log(),
            prefix: config.persistence.image_prefix.clone(),
            save_images: config.persistence.save_images,
            max_pending: config.persistence.max_pending,
            writer,
            pool,
            clock: CaptureClock::new(),
            log_lock: Arc::new(Mutex::new(())),
            stats: Arc::new(PersistenceStats::default()),
        }
    }

    /// Image path for a capture timestamp.
    pub fn image_path_for(&self, timestamp: &DateTime<Local>) -> PathBuf {
        self.image_dir.join(format!(
            "{}_{}.png",
            self.prefix,
            timestamp.format(IMAGE_TIME_FORMAT)
        ))
    }

    /// Schedules the evidence for one frame and returns immediately.
    ///
    /// Returns `None` for verdicts that are not logged and for frames
    /// dropped because the backlog is full.
    pub fn persist(&self, frame: &Frame, verdict: PostureVerdict) -> Option<PersistTicket> {
        let message = verdict.log_message()?;
        let timestamp = self.clock.now();
        let image_path = self.save_images.then(|| self.image_path_for(&timestamp));

        let ticket = PersistTicket {
            timestamp,
            message,
            image_path: image_path.clone(),
        };

        let frame = frame.clone();
        let image_dir = self.image_dir.clone();
        let detection_log = self.detection_log.clone();
        let writer = Arc::clone(&self.writer);
        let log_lock = Arc::clone(&self.log_lock);
        let stats = Arc::clone(&self.stats);

        let accepted = self.pool.try_submit(self.max_pending, move || {
            if let Some(path) = image_path {
                match write_image(writer.as_ref(), &frame, &image_dir, &path) {
                    Ok(()) => {
                        stats.images_saved.fetch_add(1, Ordering::Relaxed);
                        tracing::info!("Saved {} image to: {}", message, path.display());
                    }
                    Err(e) => {
                        stats.failures.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(error = %e, path = %path.display(), "Failed to save image");
                    }
                }
            }

            let line = format!("{} - {}\n", timestamp.format(LOG_TIME_FORMAT), message);
            match append_line(&log_lock, &detection_log, &line) {
                Ok(()) => {
                    stats.log_lines.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    stats.failures.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(error = %e, "Failed to append detection log");
                }
            }
        });

        if !accepted {
            let dropped = self.stats.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::debug!(
                dropped,
                max_pending = self.max_pending,
                "Persistence backlog full, frame dropped"
            );
            return None;
        }
        Some(ticket)
    }

    pub fn stats(&self) -> PersistenceSnapshot {
        PersistenceSnapshot {
            images_saved: self.stats.images_saved.load(Ordering::Relaxed),
            log_lines: self.stats.log_lines.load(Ordering::Relaxed),
            failures: self.stats.failures.load(Ordering::Relaxed),
            dropped: self.stats.dropped.load(Ordering::Relaxed),
        }
    }

    /// Waits for every scheduled write.
    pub fn flush(&self) {
        self.pool.flush();
    }
}

fn write_image(
    writer: &dyn ImageWriter,
    frame: &Frame,
    image_dir: &Path,
    path: &Path,
) -> Result<(), PersistenceError> {
    fs::create_dir_all(image_dir).map_err(|source| PersistenceError::Io {
        path: image_dir.to_path_buf(),
        source,
    })?;
    writer.write_png(frame, path)
}

fn append_line(lock: &Mutex<()>, path: &Path, line: &str) -> Result<(), PersistenceError> {
    let io_err = |source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    };

    let _guard = lock
        .lock()
        .map_err(|_| PersistenceError::Pool("detection log lock poisoned".into()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_err)?;
    file.write_all(line.as_bytes()).map_err(io_err)
}
