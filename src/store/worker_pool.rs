//! Bounded pool for blocking side work (image writes, log appends, alerts).
//!
//! Backed by a private tokio runtime whose blocking pool is capped at the
//! configured worker count. Jobs are plain closures; the capture thread never
//! waits on them unless it calls [`WorkerPool::flush`].

use std::sync::Mutex;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinHandle;

/// How long a dropped pool waits for running jobs.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

pub struct WorkerPool {
    name: String,
    runtime: Option<Runtime>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Starts a pool running at most `workers` jobs at once.
    pub fn new(name: &str, workers: usize) -> std::io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(workers.max(1))
            .thread_name(name)
            .build()?;

        Ok(Self {
            name: name.to_string(),
            runtime: Some(runtime),
            pending: Mutex::new(Vec::new()),
        })
    }

    /// Queues a job. Returns immediately.
    pub fn submit<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let Some(runtime) = self.runtime.as_ref() else {
            return;
        };
        let handle = runtime.spawn_blocking(job);
        if let Ok(mut pending) = self.pending.lock() {
            pending.retain(|h| !h.is_finished());
            pending.push(handle);
        }
    }

    /// Queues a job unless `limit` jobs are already queued or running.
    ///
    /// Returns `false` if the job was refused.
    pub fn try_submit<F>(&self, limit: usize, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let Some(runtime) = self.runtime.as_ref() else {
            return false;
        };
        let Ok(mut pending) = self.pending.lock() else {
            return false;
        };
        pending.retain(|h| !h.is_finished());
        if pending.len() >= limit {
            return false;
        }
        pending.push(runtime.spawn_blocking(job));
        true
    }

    /// Jobs queued or running.
    pub fn pending(&self) -> usize {
        self.pending
            .lock()
            .map(|mut pending| {
                pending.retain(|h| !h.is_finished());
                pending.len()
            })
            .unwrap_or(0)
    }

    /// Blocks until every job submitted so far has finished.
    ///
    /// Must not be called from inside a pool job.
    pub fn flush(&self) {
        let handles = match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(_) => return,
        };
        let Some(runtime) = self.runtime.as_ref() else {
            return;
        };
        if handles.is_empty() {
            return;
        }

        let count = handles.len();
        runtime.block_on(async {
            for handle in handles {
                if let Err(e) = handle.await {
                    tracing::warn!(pool = %self.name, ?e, "Pool job panicked");
                }
            }
        });
        tracing::debug!(pool = %self.name, count, "Pool flushed");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_timeout(SHUTDOWN_GRACE);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_flush_waits_for_all_jobs() {
        let pool = WorkerPool::new("test-pool", 2).unwrap();
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            let done = Arc::clone(&done);
            pool.submit(move || {
                std::thread::sleep(Duration::from_millis(5));
                done.fetch_add(1, Ordering::SeqCst);
            });
        }

        pool.flush();
        assert_eq!(done.load(Ordering::SeqCst), 10);
        assert_eq!(pool.pending(), 0);
    }

    #[test]
    fn test_concurrency_is_bounded() {
        let pool = WorkerPool::new("test-pool", 2).unwrap();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for _ in 0..8 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            pool.submit(move || {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(20));
                running.fetch_sub(1, Ordering::SeqCst);
            });
        }

        pool.flush();
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_panicking_job_does_not_poison_pool() {
        let pool = WorkerPool::new("test-pool", 1).unwrap();
        let done = Arc::new(AtomicUsize::new(0));

        pool.submit(|| panic!("job failed"));
        let counter = Arc::clone(&done);
        pool.submit(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        pool.flush();
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_flush_on_idle_pool() {
        let pool = WorkerPool::new("idle", 1).unwrap();
        pool.flush();
        assert_eq!(pool.pending(), 0);
    }

    #[test]
    fn test_try_submit_refuses_past_limit() {
        let pool = WorkerPool::new("bounded", 1).unwrap();
        let done = Arc::new(AtomicUsize::new(0));

        let accepted = (0..20)
            .filter(|_| {
                let done = Arc::clone(&done);
                pool.try_submit(3, move || {
                    std::thread::sleep(Duration::from_millis(50));
                    done.fetch_add(1, Ordering::SeqCst);
                })
            })
            .count();
        assert!(pool.pending() <= 3);

        pool.flush();
        assert!(accepted >= 3 && accepted < 20);
        assert_eq!(done.load(Ordering::SeqCst), accepted);
    }
}
