//! Background Job Execution Implementation

use bridge_traits::{
    background::{Job, WorkerPool},
    error::{BridgeError, Result},
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::{debug, warn};

const DEFAULT_MAX_THREADS: usize = 8;

/// Tokio-based worker pool for desktop.
///
/// Jobs run on the blocking thread pool of either a runtime owned by the pool
/// or a borrowed runtime handle.
pub struct TokioWorkerPool {
    handle: Handle,
    owned: Option<Runtime>,
    in_flight: Arc<AtomicUsize>,
}

struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl TokioWorkerPool {
    /// Create a pool backed by its own runtime with the default thread cap.
    pub fn new() -> Result<Self> {
        Self::with_max_threads(DEFAULT_MAX_THREADS)
    }

    /// Create a pool backed by its own runtime with at most `max_threads`
    /// concurrent jobs.
    pub fn with_max_threads(max_threads: usize) -> Result<Self> {
        if max_threads == 0 {
            return Err(BridgeError::NotAvailable(
                "worker pool needs at least one thread".to_string(),
            ));
        }

        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(max_threads)
            .thread_name("bridge-worker")
            .enable_time()
            .build()
            .map_err(|e| BridgeError::NotAvailable(format!("failed to build runtime: {}", e)))?;

        Ok(Self {
            handle: runtime.handle().clone(),
            owned: Some(runtime),
            in_flight: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Create a pool that schedules onto an existing runtime.
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            handle,
            owned: None,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a pool on the runtime the caller is currently running in.
    pub fn current() -> Result<Self> {
        Handle::try_current()
            .map(Self::from_handle)
            .map_err(|e| BridgeError::NotAvailable(format!("no tokio runtime: {}", e)))
    }

    /// Number of jobs queued or running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

impl WorkerPool for TokioWorkerPool {
    fn execute(&self, job: Job) -> Result<()> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlightGuard(Arc::clone(&self.in_flight));

        debug!(in_flight = self.in_flight(), "Queueing worker job");
        self.handle.spawn_blocking(move || {
            let _guard = guard;
            job();
        });
        Ok(())
    }

    fn name(&self) -> &str {
        "tokio-blocking"
    }
}

impl Drop for TokioWorkerPool {
    fn drop(&mut self) {
        if let Some(runtime) = self.owned.take() {
            let pending = self.in_flight();
            if pending > 0 {
                warn!(pending, "Dropping worker pool with jobs still running");
            }
            // Safe to call from inside another runtime, unlike a plain drop.
            runtime.shutdown_background();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_owned_pool_runs_job() {
        let pool = TokioWorkerPool::with_max_threads(2).unwrap();
        let (tx, rx) = mpsc::channel();

        pool.execute(Box::new(move || {
            tx.send(std::thread::current().name().map(str::to_string))
                .unwrap();
        }))
        .unwrap();

        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(name.as_deref(), Some("bridge-worker"));
    }

    #[test]
    fn test_zero_threads_rejected() {
        assert!(TokioWorkerPool::with_max_threads(0).is_err());
    }

    #[test]
    fn test_current_requires_runtime() {
        assert!(TokioWorkerPool::current().is_err());
    }

    #[tokio::test]
    async fn test_current_pool_counts_in_flight() {
        let pool = TokioWorkerPool::current().unwrap();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();

        pool.execute(Box::new(move || {
            release_rx.recv().ok();
            done_tx.send(()).ok();
        }))
        .unwrap();
        assert_eq!(pool.in_flight(), 1);

        release_tx.send(()).unwrap();
        done_rx.await.unwrap();

        // The guard drops right after the job body returns.
        for _ in 0..100 {
            if pool.in_flight() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(pool.in_flight(), 0);
    }
}
