//! Bounded worker pool with dedicated OS threads.
//!
//! Each worker thread owns a single-threaded tokio runtime and runs one job
//! at a time, so the worker count is the pool's concurrency ceiling. Jobs
//! wait in a bounded queue; submission never blocks; a full queue rejects the
//! job immediately.
//!
//! # Design
//!
//! - **No polling**: workers block on channel recv; completion uses oneshot
//! - **Clean shutdown**: dropping the sender unblocks every idle worker
//! - **Error channel**: failed and panicked jobs are counted and logged here
//!
//! ```rust
//! use prometheus_task_timer::config::WorkerPoolConfig;
//! use prometheus_task_timer::core::{JobStatus, WorkerPool};
//!
//! let pool = WorkerPool::new(WorkerPoolConfig::new().with_worker_count(2)).unwrap();
//! let handle = pool.submit("hello", async { Ok(()) }).unwrap();
//! assert_eq!(handle.wait_blocking().unwrap(), JobStatus::Completed);
//! pool.shutdown();
//! ```

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::config::WorkerPoolConfig;

/// A unit of work accepted by the pool.
pub type Job = BoxFuture<'static, anyhow::Result<()>>;

/// Errors that can occur when using a `WorkerPool`.
#[derive(Debug)]
pub enum PoolError {
    /// The job queue is full; no more jobs can be accepted right now.
    QueueFull,

    /// The pool has been shut down.
    PoolShutdown,

    /// Configuration validation failed.
    InvalidConfig(String),

    /// Internal error (worker spawn failure, job dropped, etc.).
    Internal(String),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueFull => write!(f, "job queue is full"),
            Self::PoolShutdown => write!(f, "pool has been shut down"),
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for PoolError {}

/// Final state of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// The job returned `Ok`.
    Completed,
    /// The job returned an error.
    Failed(String),
    /// The job panicked.
    Panicked(String),
}

impl JobStatus {
    /// True for [`JobStatus::Completed`].
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Statistics about pool utilization.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Number of worker threads.
    pub worker_count: usize,

    /// Currently executing jobs.
    pub active_jobs: u64,

    /// Jobs waiting in the queue.
    pub queued_jobs: u64,

    /// Total jobs accepted.
    pub submitted_jobs: u64,

    /// Total jobs that finished successfully.
    pub completed_jobs: u64,

    /// Total jobs that failed or panicked.
    pub failed_jobs: u64,

    /// Total jobs rejected because the queue was full.
    pub rejected_jobs: u64,
}

/// Internal counters for pool statistics (thread-safe).
#[derive(Debug, Default)]
struct PoolCounters {
    active_jobs: AtomicU64,
    queued_jobs: AtomicU64,
    submitted_jobs: AtomicU64,
    completed_jobs: AtomicU64,
    failed_jobs: AtomicU64,
    rejected_jobs: AtomicU64,
}

impl PoolCounters {
    fn snapshot(&self, worker_count: usize) -> PoolStats {
        PoolStats {
            worker_count,
            active_jobs: self.active_jobs.load(Ordering::Relaxed),
            queued_jobs: self.queued_jobs.load(Ordering::Relaxed),
            submitted_jobs: self.submitted_jobs.load(Ordering::Relaxed),
            completed_jobs: self.completed_jobs.load(Ordering::Relaxed),
            failed_jobs: self.failed_jobs.load(Ordering::Relaxed),
            rejected_jobs: self.rejected_jobs.load(Ordering::Relaxed),
        }
    }
}

struct WorkerTask {
    id: u64,
    label: String,
    job: Job,
    done: oneshot::Sender<JobStatus>,
}

/// Completion handle returned by [`WorkerPool::submit`].
///
/// Dropping the handle detaches the job; it still runs.
#[derive(Debug)]
pub struct JobHandle {
    id: u64,
    rx: oneshot::Receiver<JobStatus>,
}

impl JobHandle {
    /// Pool-unique job identifier.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the job to finish.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Internal` if the job was dropped before running,
    /// which happens when the pool shuts down with the job still queued.
    pub async fn wait(self) -> Result<JobStatus, PoolError> {
        self.rx
            .await
            .map_err(|_| PoolError::Internal(format!("job {} dropped before completion", self.id)))
    }

    /// Blocking variant of [`JobHandle::wait`]. Must not be called from
    /// inside an async runtime.
    ///
    /// # Errors
    ///
    /// Same as [`JobHandle::wait`].
    pub fn wait_blocking(self) -> Result<JobStatus, PoolError> {
        let id = self.id;
        self.rx
            .blocking_recv()
            .map_err(|_| PoolError::Internal(format!("job {id} dropped before completion")))
    }
}

/// Worker pool with dedicated OS threads.
pub struct WorkerPool {
    /// Pool configuration.
    config: WorkerPoolConfig,

    /// Job sender (to workers). Option allows clean shutdown by dropping.
    job_tx: Mutex<Option<Sender<WorkerTask>>>,

    /// Pool statistics counters (lock-free atomics).
    counters: Arc<PoolCounters>,

    /// Shutdown flag (lock-free atomic).
    shutdown: Arc<AtomicBool>,

    /// Worker thread handles.
    workers: Mutex<Vec<JoinHandle<()>>>,

    /// Job ID counter (lock-free atomic).
    job_id_counter: AtomicU64,
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl WorkerPool {
    /// Create a new worker pool, spawning `config.worker_count` threads.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::InvalidConfig` if the configuration is invalid and
    /// `PoolError::Internal` if a worker thread cannot be spawned.
    pub fn new(config: WorkerPoolConfig) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;

        let (job_tx, job_rx) = bounded::<WorkerTask>(config.max_queue_depth);
        let counters = Arc::new(PoolCounters::default());
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(config.worker_count);
        for worker_id in 0..config.worker_count {
            let worker = spawn_worker(
                worker_id,
                job_rx.clone(),
                Arc::clone(&counters),
                Arc::clone(&shutdown),
                config.thread_stack_size,
            )
            .map_err(|e| PoolError::Internal(format!("spawn worker {worker_id}: {e}")))?;
            workers.push(worker);
        }

        info!(
            worker_count = config.worker_count,
            max_queue_depth = config.max_queue_depth,
            "WorkerPool initialized"
        );

        Ok(Self {
            config,
            job_tx: Mutex::new(Some(job_tx)),
            counters,
            shutdown,
            workers: Mutex::new(workers),
            job_id_counter: AtomicU64::new(0),
        })
    }

    /// Submit a job. Never blocks.
    ///
    /// # Errors
    ///
    /// - `PoolError::QueueFull` if the queue is full
    /// - `PoolError::PoolShutdown` if the pool has been shut down
    pub fn submit<F>(&self, label: impl Into<String>, job: F) -> Result<JobHandle, PoolError>
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(PoolError::PoolShutdown);
        }
        let job: Job = Box::pin(job);

        let id = self.job_id_counter.fetch_add(1, Ordering::Relaxed);
        let label = label.into();
        let (done, rx) = oneshot::channel();
        let task = WorkerTask {
            id,
            label,
            job,
            done,
        };

        let job_tx_guard = self.job_tx.lock();
        let Some(job_tx) = job_tx_guard.as_ref() else {
            return Err(PoolError::PoolShutdown);
        };

        // count before sending so a fast worker never decrements below zero
        self.counters.queued_jobs.fetch_add(1, Ordering::Relaxed);
        match job_tx.try_send(task) {
            Ok(()) => {
                self.counters.submitted_jobs.fetch_add(1, Ordering::Relaxed);
                debug!(job_id = id, "Job submitted to worker pool");
                Ok(JobHandle { id, rx })
            }
            Err(TrySendError::Full(task)) => {
                self.counters.queued_jobs.fetch_sub(1, Ordering::Relaxed);
                self.counters.rejected_jobs.fetch_add(1, Ordering::Relaxed);
                warn!(job_id = id, label = %task.label, "Worker pool queue is full");
                Err(PoolError::QueueFull)
            }
            Err(TrySendError::Disconnected(_)) => {
                self.counters.queued_jobs.fetch_sub(1, Ordering::Relaxed);
                Err(PoolError::PoolShutdown)
            }
        }
    }

    /// Get current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.counters.snapshot(self.config.worker_count)
    }

    /// Whether [`WorkerPool::shutdown`] has been called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Shut down the pool gracefully.
    ///
    /// Drops the job sender to unblock idle workers, then joins each worker,
    /// detaching any that do not exit within two seconds. Jobs still queued
    /// are dropped; their handles resolve to an error.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }

        info!("Shutting down worker pool");

        {
            let mut job_tx = self.job_tx.lock();
            *job_tx = None;
        }

        let mut workers = self.workers.lock();
        let worker_count = workers.len();

        for (idx, worker) in workers.drain(..).enumerate() {
            let (tx, rx) = std::sync::mpsc::channel();
            let join_thread = thread::spawn(move || {
                let result = worker.join();
                let _ = tx.send(result.is_ok());
            });

            match rx.recv_timeout(Duration::from_secs(2)) {
                Ok(true) => {
                    debug!(worker_id = idx, "Worker joined successfully");
                }
                Ok(false) => {
                    warn!(worker_id = idx, "Worker panicked");
                }
                Err(_) => {
                    warn!(worker_id = idx, "Worker did not exit within timeout - detaching");
                    continue;
                }
            }

            let _ = join_thread.join();
        }

        info!(worker_count = worker_count, "Worker pool shut down complete");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // signal only; joining here can hang on long jobs
        if !self.shutdown.swap(true, Ordering::AcqRel) {
            let mut job_tx = self.job_tx.lock();
            *job_tx = None;
            debug!("WorkerPool dropped without explicit shutdown - workers will be detached");
        }
    }
}

fn spawn_worker(
    worker_id: usize,
    job_rx: Receiver<WorkerTask>,
    counters: Arc<PoolCounters>,
    shutdown: Arc<AtomicBool>,
    stack_size: usize,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("timer-worker-{worker_id}"))
        .stack_size(stack_size)
        .spawn(move || {
            debug!(worker_id = worker_id, "Worker thread started");

            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    error!(worker_id = worker_id, error = %e, "Failed to create worker runtime");
                    return;
                }
            };

            // recv() errors once the sender is dropped
            while let Ok(task) = job_rx.recv() {
                counters.queued_jobs.fetch_sub(1, Ordering::Relaxed);

                if shutdown.load(Ordering::Acquire) {
                    debug!(worker_id = worker_id, "Worker shutdown with job pending, exiting");
                    break;
                }

                counters.active_jobs.fetch_add(1, Ordering::Relaxed);
                debug!(worker_id = worker_id, job_id = task.id, label = %task.label, "Worker executing job");

                let outcome = rt.block_on(AssertUnwindSafe(task.job).catch_unwind());
                let status = match outcome {
                    Ok(Ok(())) => JobStatus::Completed,
                    Ok(Err(e)) => JobStatus::Failed(format!("{e:#}")),
                    Err(panic) => JobStatus::Panicked(panic_message(panic.as_ref())),
                };

                counters.active_jobs.fetch_sub(1, Ordering::Relaxed);
                match &status {
                    JobStatus::Completed => {
                        counters.completed_jobs.fetch_add(1, Ordering::Relaxed);
                    }
                    JobStatus::Failed(msg) | JobStatus::Panicked(msg) => {
                        counters.failed_jobs.fetch_add(1, Ordering::Relaxed);
                        error!(worker_id = worker_id, job_id = task.id, label = %task.label, error = %msg, "Job failed");
                    }
                }

                let _ = task.done.send(status);
            }

            debug!(worker_id = worker_id, "Worker thread exiting");
        })
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn pool(workers: usize, depth: usize) -> WorkerPool {
        WorkerPool::new(
            WorkerPoolConfig::new()
                .with_worker_count(workers)
                .with_max_queue_depth(depth),
        )
        .unwrap()
    }

    #[test]
    fn test_pool_error_display() {
        assert_eq!(PoolError::QueueFull.to_string(), "job queue is full");
        assert_eq!(PoolError::PoolShutdown.to_string(), "pool has been shut down");
    }

    #[test]
    fn test_runs_jobs_and_reports_status() {
        let pool = pool(2, 10);
        let ok = pool.submit("ok", async { Ok(()) }).unwrap();
        let bad = pool
            .submit("bad", async { Err(anyhow::anyhow!("nope")) })
            .unwrap();

        assert_eq!(ok.wait_blocking().unwrap(), JobStatus::Completed);
        assert_eq!(bad.wait_blocking().unwrap(), JobStatus::Failed("nope".into()));

        let stats = pool.stats();
        assert_eq!(stats.submitted_jobs, 2);
        assert_eq!(stats.completed_jobs, 1);
        assert_eq!(stats.failed_jobs, 1);
        pool.shutdown();
    }

    #[test]
    fn test_panicking_job_keeps_worker_alive() {
        let pool = pool(1, 10);
        let boom = pool
            .submit("boom", async { panic!("kaboom") })
            .unwrap();
        assert_eq!(boom.wait_blocking().unwrap(), JobStatus::Panicked("kaboom".into()));

        let after = pool.submit("after", async { Ok(()) }).unwrap();
        assert!(after.wait_blocking().unwrap().is_completed());
        pool.shutdown();
    }

    #[test]
    fn test_full_queue_rejects_without_blocking() {
        let pool = pool(1, 1);
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let started = Arc::new(AtomicUsize::new(0));

        let started_c = Arc::clone(&started);
        let blocker = pool
            .submit(
                "blocker",
                async move {
                    started_c.fetch_add(1, Ordering::SeqCst);
                    let _ = release_rx.recv();
                    Ok(())
                },
            )
            .unwrap();
        while started.load(Ordering::SeqCst) == 0 {
            thread::sleep(Duration::from_millis(5));
        }

        let queued = pool.submit("queued", async { Ok(()) }).unwrap();
        let rejected = pool.submit("rejected", async { Ok(()) });
        assert!(matches!(rejected, Err(PoolError::QueueFull)));
        assert_eq!(pool.stats().rejected_jobs, 1);

        release_tx.send(()).unwrap();
        assert!(blocker.wait_blocking().unwrap().is_completed());
        assert!(queued.wait_blocking().unwrap().is_completed());
        pool.shutdown();
    }

    #[test]
    fn test_submit_after_shutdown_fails() {
        let pool = pool(1, 1);
        pool.shutdown();
        assert!(pool.is_shutdown());
        assert!(matches!(
            pool.submit("late", async { Ok(()) }),
            Err(PoolError::PoolShutdown)
        ));
    }
}
