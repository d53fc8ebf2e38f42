//! Console keypress observer.
//!
//! Records `q` lines typed on stdin. The capture loop picks them up and logs
//! them; quitting is left to Ctrl+C and the status surfaces.

use crate::shutdown::ShutdownSignal;
use std::io::{self, BufRead};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Pending quit-key presses.
#[derive(Debug, Clone, Default)]
pub struct QuitKeyPresses {
    pending: Arc<AtomicU64>,
}

impl QuitKeyPresses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self) {
        self.pending.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns and clears the presses since the last call.
    pub fn take(&self) -> u64 {
        self.pending.swap(0, Ordering::Relaxed)
    }
}

/// Reads lines until EOF or shutdown, recording each `q`.
pub fn observe_lines<R: BufRead>(reader: R, presses: &QuitKeyPresses, shutdown: &ShutdownSignal) {
    for line in reader.lines() {
        if shutdown.is_requested() {
            break;
        }
        match line {
            Ok(line) if line.trim().eq_ignore_ascii_case("q") => presses.record(),
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(error = %e, "Console read failed");
                break;
            }
        }
    }
}

/// Spawns the stdin observer.
///
/// The thread blocks on stdin and is not joined at shutdown.
pub fn spawn_console_thread(shutdown: ShutdownSignal, presses: QuitKeyPresses) -> JoinHandle<()> {
    thread::spawn(move || {
        tracing::debug!("Console observer started");
        observe_lines(io::stdin().lock(), &presses, &shutdown);
    })
}
