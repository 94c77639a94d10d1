//! Background Execution
//!
//! Provides the host thread pool that handlers use to offload long-running work
//! so that the invocation lock is released quickly.

use crate::error::Result;

/// A unit of work handed to the host thread pool.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Worker pool trait
///
/// Abstracts the platform thread pool that background handler work runs on:
/// - **Android**: `CordovaInterface::getThreadPool()`
/// - **iOS**: a global dispatch queue
/// - **Desktop**: tokio blocking pool (see `bridge-desktop`)
///
/// Jobs are plain blocking closures; the pool must not assume they yield.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::background::WorkerPool;
///
/// fn offload(pool: &dyn WorkerPool) -> bridge_traits::error::Result<()> {
///     pool.execute(Box::new(|| {
///         // long-running work
///     }))
/// }
/// ```
pub trait WorkerPool: Send + Sync {
    /// Queue a job for execution on some worker thread.
    fn execute(&self, job: Job) -> Result<()>;

    /// Check if background execution is available
    fn is_available(&self) -> bool {
        true
    }

    /// Human-readable pool name for diagnostics.
    fn name(&self) -> &str {
        "worker-pool"
    }
}

/// Pool that runs every job inline on the calling thread.
///
/// Useful for deterministic tests and for hosts without background threads.
/// Handlers that loop until canceled must not be given this pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineWorkerPool;

impl WorkerPool for InlineWorkerPool {
    fn execute(&self, job: Job) -> Result<()> {
        job();
        Ok(())
    }

    fn name(&self) -> &str {
        "inline"
    }
}
