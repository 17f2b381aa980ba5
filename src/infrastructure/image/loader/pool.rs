//! Bounded worker pool for blocking tiers (disk, network, decode).

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::domain::errors::LoadError;
use crate::infrastructure::config::PoolConfig;

/// Runs load tasks off the caller's thread.
///
/// At most `max_concurrency` tasks run at once; the rest wait in FIFO order
/// for a permit.
pub struct WorkerPool {
    runtime: Option<Runtime>,
    handle: Handle,
    permits: Arc<Semaphore>,
    max_concurrency: usize,
    submitted: AtomicU64,
}

impl WorkerPool {
    /// Builds a pool backed by its own multi-threaded runtime.
    ///
    /// # Errors
    /// Returns error if the runtime cannot be started.
    pub fn new(config: &PoolConfig) -> Result<Self, LoadError> {
        let max_threads = config.max_threads.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(config.core_threads.max(1))
            .max_blocking_threads(max_threads)
            .thread_keep_alive(Duration::from_secs(config.keep_alive_secs))
            .thread_name_fn(|| {
                static NEXT_WORKER: AtomicUsize = AtomicUsize::new(1);
                let id = NEXT_WORKER.fetch_add(1, Ordering::Relaxed);
                format!("vignette-worker-{id}")
            })
            .enable_all()
            .build()
            .map_err(|e| LoadError::pool(format!("Failed to start worker pool: {e}")))?;

        debug!(
            core_threads = config.core_threads,
            max_threads = max_threads,
            keep_alive_secs = config.keep_alive_secs,
            "Worker pool started"
        );

        let handle = runtime.handle().clone();
        Ok(Self {
            runtime: Some(runtime),
            handle,
            permits: Arc::new(Semaphore::new(max_threads)),
            max_concurrency: max_threads,
            submitted: AtomicU64::new(0),
        })
    }

    /// Builds a pool that schedules onto an existing runtime.
    #[must_use]
    pub fn with_handle(handle: Handle, max_concurrency: usize) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            runtime: None,
            handle,
            permits: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
            submitted: AtomicU64::new(0),
        }
    }

    /// Queues a task. It starts once a permit is free.
    pub fn submit<F>(&self, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let seq = self.submitted.fetch_add(1, Ordering::Relaxed) + 1;
        let permits = Arc::clone(&self.permits);
        trace!(task = seq, "Task submitted to worker pool");
        self.handle.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            task.await;
        })
    }

    /// Total number of tasks submitted since creation.
    #[must_use]
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Maximum number of tasks running at once.
    #[must_use]
    pub const fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Permits not currently held by a running task.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            // Safe from inside another runtime, unlike a blocking shutdown.
            runtime.shutdown_background();
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("owned_runtime", &self.runtime.is_some())
            .field("max_concurrency", &self.max_concurrency)
            .field("submitted", &self.submitted())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::oneshot;

    use super::*;

    #[test]
    fn test_owned_runtime_runs_tasks() -> Result<(), Box<dyn std::error::Error>> {
        let config = PoolConfig {
            core_threads: 1,
            max_threads: 2,
            keep_alive_secs: 1,
        };
        let pool = WorkerPool::new(&config)?;
        let (tx, rx) = std::sync::mpsc::channel();

        pool.submit(async move {
            let name = std::thread::current().name().map(String::from);
            let _ = tx.send(name);
        });

        let name = rx.recv_timeout(Duration::from_secs(5))?;
        assert!(name.is_some_and(|n| n.starts_with("vignette-worker-")));
        assert_eq!(pool.submitted(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_drop_inside_async_context() -> Result<(), Box<dyn std::error::Error>> {
        let pool = WorkerPool::new(&PoolConfig::default())?;
        drop(pool);
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() -> Result<(), Box<dyn std::error::Error>> {
        let pool = WorkerPool::with_handle(Handle::current(), 2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();

        for _ in 0..6 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            handles.push(pool.submit(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await?;
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.submitted(), 6);
        assert_eq!(pool.available_permits(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_submit_returns_join_handle() -> Result<(), Box<dyn std::error::Error>> {
        let pool = WorkerPool::with_handle(Handle::current(), 1);
        let (tx, rx) = oneshot::channel();

        pool.submit(async move {
            let _ = tx.send(7);
        })
        .await?;

        assert_eq!(rx.await?, 7);
        Ok(())
    }
}
