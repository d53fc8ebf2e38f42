//! File-backed notification toggle.
//!
//! An external control surface writes `0` or `1` to a status file; the
//! watcher thread re-reads it on a fixed interval and publishes the value
//! through a [`NotificationPolicy`] that the capture loop reads lock-free.

use crate::shutdown::ShutdownSignal;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Whether posture alerts may be shown.
#[derive(Debug, Clone)]
pub struct NotificationPolicy {
    enabled: Arc<AtomicBool>,
}

impl NotificationPolicy {
    pub fn new(initial: bool) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(initial)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Returns `true` if the value changed.
    pub fn set(&self, enabled: bool) -> bool {
        self.enabled.swap(enabled, Ordering::SeqCst) != enabled
    }
}

/// Parses status file content. Only `0` or `1` on the first line is accepted.
pub fn parse_status(content: &str) -> Option<bool> {
    match content.lines().next().unwrap_or_default().trim() {
        "1" => Some(true),
        "0" => Some(false),
        _ => None,
    }
}

/// Polls the status file and updates the policy.
pub struct StatusWatcher {
    path: PathBuf,
    policy: NotificationPolicy,
    last_content: Option<Vec<u8>>,
    missing_logged: bool,
}

impl StatusWatcher {
    pub fn new(path: impl Into<PathBuf>, policy: NotificationPolicy) -> Self {
        Self {
            path: path.into(),
            policy,
            last_content: None,
            missing_logged: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> NotificationPolicy {
        self.policy.clone()
    }

    /// Reads the file once.
    ///
    /// Returns the new policy value if it changed.
    pub fn poll(&mut self) -> Option<bool> {
        let content = match fs::read(&self.path) {
            Ok(content) => {
                self.missing_logged = false;
                content
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if !self.missing_logged {
                    tracing::warn!(path = %self.path.display(), "Status file missing, keeping current setting");
                    self.missing_logged = true;
                }
                return None;
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read status file");
                return None;
            }
        };

        if self.last_content.as_deref() == Some(content.as_slice()) {
            return None;
        }
        let parsed = std::str::from_utf8(&content).ok().and_then(parse_status);
        if parsed.is_none() {
            tracing::warn!(
                content = %String::from_utf8_lossy(&content),
                "Unexpected status file content, ignoring"
            );
        }
        self.last_content = Some(content);

        let enabled = parsed?;
        if self.policy.set(enabled) {
            tracing::info!(enabled, "Notification setting changed");
            Some(enabled)
        } else {
            None
        }
    }
}

/// Spawns the status watcher thread.
pub fn spawn_status_watcher_thread(
    shutdown: ShutdownSignal,
    mut watcher: StatusWatcher,
    poll_interval: Duration,
) -> JoinHandle<()> {
    thread::spawn(move || {
        tracing::info!(
            path = %watcher.path().display(),
            interval_ms = poll_interval.as_millis(),
            "Status watcher thread started"
        );

        loop {
            watcher.poll();
            if !shutdown.sleep(poll_interval) {
                break;
            }
        }

        tracing::info!("Status watcher thread stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup(initial: bool) -> (TempDir, StatusWatcher) {
        let dir = TempDir::new().unwrap();
        let watcher = StatusWatcher::new(
            dir.path().join("Notification.log"),
            NotificationPolicy::new(initial),
        );
        (dir, watcher)
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("1"), Some(true));
        assert_eq!(parse_status("0\n"), Some(false));
        assert_eq!(parse_status("yes"), None);
        assert_eq!(parse_status(""), None);
        assert_eq!(parse_status("10"), None);
    }

    #[test]
    fn test_parse_status_reads_first_line_only() {
        assert_eq!(parse_status("1\nstale"), Some(true));
        assert_eq!(parse_status("0\r\n1\n"), Some(false));
        assert_eq!(parse_status("1\n\n"), Some(true));
        assert_eq!(parse_status("\n1"), None);
    }

    #[test]
    fn test_invalid_utf8_is_ignored_once() {
        let (_dir, mut watcher) = setup(true);
        let policy = watcher.policy();

        fs::write(watcher.path(), [0xff, 0xfe]).unwrap();
        assert_eq!(watcher.poll(), None);
        assert_eq!(watcher.last_content.as_deref(), Some(&[0xff, 0xfe][..]));
        assert_eq!(watcher.poll(), None);
        assert!(policy.is_enabled());

        fs::write(watcher.path(), "0").unwrap();
        assert_eq!(watcher.poll(), Some(false));
    }

    #[test]
    fn test_poll_applies_changes() {
        let (_dir, mut watcher) = setup(false);
        let policy = watcher.policy();

        fs::write(watcher.path(), "1").unwrap();
        assert_eq!(watcher.poll(), Some(true));
        assert!(policy.is_enabled());

        // unchanged content is not reprocessed
        assert_eq!(watcher.poll(), None);

        fs::write(watcher.path(), "0").unwrap();
        assert_eq!(watcher.poll(), Some(false));
        assert!(!policy.is_enabled());
    }

    #[test]
    fn test_malformed_content_keeps_previous_value() {
        let (_dir, mut watcher) = setup(false);
        let policy = watcher.policy();

        fs::write(watcher.path(), "1").unwrap();
        watcher.poll();
        fs::write(watcher.path(), "garbage").unwrap();
        assert_eq!(watcher.poll(), None);
        assert!(policy.is_enabled());
    }

    #[test]
    fn test_missing_file_keeps_previous_value() {
        let (_dir, mut watcher) = setup(true);
        let policy = watcher.policy();

        assert_eq!(watcher.poll(), None);
        assert_eq!(watcher.poll(), None);
        assert!(policy.is_enabled());

        fs::write(watcher.path(), "0").unwrap();
        assert_eq!(watcher.poll(), Some(false));
    }

    #[test]
    fn test_watcher_thread_picks_up_change_within_interval() {
        let (_dir, watcher) = setup(false);
        let policy = watcher.policy();
        let path = watcher.path().to_path_buf();
        let shutdown = ShutdownSignal::new();

        let handle =
            spawn_status_watcher_thread(shutdown.clone(), watcher, Duration::from_millis(10));
        fs::write(&path, "1").unwrap();

        let mut waited = Duration::ZERO;
        while !policy.is_enabled() && waited < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(10));
            waited += Duration::from_millis(10);
        }
        assert!(policy.is_enabled());

        shutdown.request();
        handle.join().unwrap();
    }
}
