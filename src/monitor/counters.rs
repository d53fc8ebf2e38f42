//! Monitor activity counters.
//!
//! Plain atomics bumped from the capture loop and read by the status
//! display thread. Incrementing never takes a lock.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct MonitorCounters {
    frames_processed: AtomicU64,
    alerts_fired: AtomicU64,
    suppressed_by_policy: AtomicU64,
    suppressed_by_cooldown: AtomicU64,
    anomalous_readings: AtomicU64,
    device_reconnects: AtomicU64,
    quit_presses: AtomicU64,
}

/// Point-in-time copy of [`MonitorCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CountersSnapshot {
    pub frames_processed: u64,
    pub alerts_fired: u64,
    pub suppressed_by_policy: u64,
    pub suppressed_by_cooldown: u64,
    pub anomalous_readings: u64,
    pub device_reconnects: u64,
    pub quit_presses: u64,
}

// ============================================================================
// Increments
// ============================================================================

impl MonitorCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame_processed(&self) {
        self.frames_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn alert_fired(&self) {
        self.alerts_fired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn suppressed_by_policy(&self) {
        self.suppressed_by_policy.fetch_add(1, Ordering::Relaxed);
    }

    pub fn suppressed_by_cooldown(&self) {
        self.suppressed_by_cooldown.fetch_add(1, Ordering::Relaxed);
    }

    pub fn anomalous_reading(&self) {
        self.anomalous_readings.fetch_add(1, Ordering::Relaxed);
    }

    pub fn device_reconnect(&self) {
        self.device_reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn quit_pressed(&self) {
        self.quit_presses.fetch_add(1, Ordering::Relaxed);
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
            alerts_fired: self.alerts_fired.load(Ordering::Relaxed),
            suppressed_by_policy: self.suppressed_by_policy.load(Ordering::Relaxed),
            suppressed_by_cooldown: self.suppressed_by_cooldown.load(Ordering::Relaxed),
            anomalous_readings: self.anomalous_readings.load(Ordering::Relaxed),
            device_reconnects: self.device_reconnects.load(Ordering::Relaxed),
            quit_presses: self.quit_presses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counters_initial_zero() {
        assert_eq!(MonitorCounters::new().snapshot(), CountersSnapshot::default());
    }

    #[test]
    fn test_counters_increment() {
        let counters = MonitorCounters::new();
        counters.frame_processed();
        counters.frame_processed();
        counters.alert_fired();
        counters.suppressed_by_cooldown();
        counters.device_reconnect();

        let snap = counters.snapshot();
        assert_eq!(snap.frames_processed, 2);
        assert_eq!(snap.alerts_fired, 1);
        assert_eq!(snap.suppressed_by_cooldown, 1);
        assert_eq!(snap.suppressed_by_policy, 0);
        assert_eq!(snap.device_reconnects, 1);
    }

    #[test]
    fn test_counters_shared_across_threads() {
        let counters = Arc::new(MonitorCounters::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counters = Arc::clone(&counters);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        counters.frame_processed();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counters.snapshot().frames_processed, 1000);
    }
}
