//! Bounded worker pool for transformation requests
//!
//! Provides [`WorkerPool`], owned by the facade:
//! - At most `max_workers` requests run at once (semaphore permits)
//! - Each request runs on Tokio's blocking pool, never on the caller
//! - Pool statistics for monitoring
//!
//! Jobs are plain closures; the pool knows nothing about transformations.

use crate::error::EnvironmentError;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{oneshot, Semaphore};

/// Pool statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Jobs handed to the pool
    pub submitted: usize,
    /// Jobs currently running
    pub active: usize,
    /// Jobs that returned `Ok`
    pub completed: usize,
    /// Jobs that returned an error or died
    pub failed: usize,
}

impl PoolStats {
    /// Jobs waiting for a worker
    #[inline]
    #[must_use]
    pub fn queued(&self) -> usize {
        self.submitted
            .saturating_sub(self.active + self.completed + self.failed)
    }
}

/// Bounded executor on a captured Tokio runtime
#[derive(Debug, Clone)]
pub struct WorkerPool {
    max_workers: usize,
    permits: Arc<Semaphore>,
    runtime: Handle,
    stats: Arc<Mutex<PoolStats>>,
}

impl WorkerPool {
    /// Create pool on `runtime`
    ///
    /// `max_workers` is clamped to at least one.
    #[must_use]
    pub fn new(max_workers: usize, runtime: Handle) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            max_workers,
            permits: Arc::new(Semaphore::new(max_workers)),
            runtime,
            stats: Arc::new(Mutex::new(PoolStats::default())),
        }
    }

    /// Create pool on the runtime of the calling context
    ///
    /// # Errors
    /// `EnvironmentError::NoRuntime` outside a Tokio runtime.
    pub fn current(max_workers: usize) -> Result<Self, EnvironmentError> {
        let runtime = Handle::try_current().map_err(|_| EnvironmentError::NoRuntime)?;
        Ok(Self::new(max_workers, runtime))
    }

    /// Maximum concurrently running jobs
    #[inline]
    #[must_use]
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Workers free right now
    #[inline]
    #[must_use]
    pub fn available_workers(&self) -> usize {
        self.permits.available_permits()
    }

    /// Snapshot of the statistics
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        *self.stats.lock()
    }

    /// Queue `job`; its result arrives on the returned receiver
    ///
    /// A job that panics is reported as `EnvironmentError::Worker`.
    pub fn submit<T, F>(&self, job: F) -> oneshot::Receiver<Result<T, EnvironmentError>>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, EnvironmentError> + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let permits = Arc::clone(&self.permits);
        let stats = Arc::clone(&self.stats);
        stats.lock().submitted += 1;

        self.runtime.spawn(async move {
            let Ok(permit) = permits.acquire_owned().await else {
                stats.lock().failed += 1;
                let _ = sender.send(Err(EnvironmentError::Worker("worker pool closed".to_string())));
                return;
            };
            stats.lock().active += 1;

            let joined = tokio::task::spawn_blocking(job).await;
            drop(permit);

            let result = joined.unwrap_or_else(|e| {
                tracing::error!(error = %e, "worker died");
                Err(EnvironmentError::Worker(e.to_string()))
            });

            {
                let mut stats = stats.lock();
                stats.active -= 1;
                if result.is_ok() {
                    stats.completed += 1;
                } else {
                    stats.failed += 1;
                }
            }

            // receiver may be gone; the work still ran to completion
            let _ = sender.send(result);
        });

        receiver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn runs_job_off_caller() {
        let pool = WorkerPool::current(2).unwrap();
        let caller = std::thread::current().id();
        let worker = pool
            .submit(move || Ok(std::thread::current().id()))
            .await
            .unwrap()
            .unwrap();
        assert_ne!(caller, worker);
        assert_eq!(pool.stats().completed, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn bounds_concurrency() {
        let pool = WorkerPool::current(2).unwrap();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let receivers: Vec<_> = (0..6)
            .map(|_| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                pool.submit(move || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(30));
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .collect();

        for receiver in receivers {
            receiver.await.unwrap().unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.stats().completed, 6);
        assert_eq!(pool.stats().queued(), 0);
        assert_eq!(pool.available_workers(), 2);
    }

    #[tokio::test]
    async fn panicking_job_is_worker_error() {
        let pool = WorkerPool::current(1).unwrap();
        let result = pool
            .submit(|| -> Result<(), EnvironmentError> { panic!("job blew up") })
            .await
            .unwrap();
        assert!(matches!(result, Err(EnvironmentError::Worker(_))));
        assert_eq!(pool.stats().failed, 1);

        // pool keeps working afterwards
        let value = pool.submit(|| Ok(7)).await.unwrap().unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn no_runtime() {
        assert!(matches!(
            WorkerPool::current(1),
            Err(EnvironmentError::NoRuntime)
        ));
    }

    #[test]
    fn zero_workers_clamped() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let pool = WorkerPool::new(0, runtime.handle().clone());
        assert_eq!(pool.max_workers(), 1);
    }
}
