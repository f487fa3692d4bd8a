//! Scheduler core: heartbeat, interval loops and one-shot dedupe.
//!
//! A single ticker evaluates Scheduled and OneShot tasks once per tick. Each
//! IntervalLoop task gets its own loop. Every path hands work to the shared
//! [`WorkerPool`] through a non-blocking submit, so a saturated pool drops
//! dispatches instead of stalling the ticker.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::error::SchedulerError;
use super::execution::ExecutionWrapper;
use super::registry::TaskRegistry;
use super::stats::StatsSink;
use super::task::Task;
use super::worker_pool::{JobHandle, PoolError, PoolStats, WorkerPool};
use crate::config::{OverlapPolicy, SchedulerConfig};
use crate::util::clock::{now_in, until_next_second};

/// A task handed to the pool during a tick.
#[derive(Debug)]
pub struct Dispatch {
    /// Task name.
    pub name: String,
    /// Completion handle of the submitted job.
    pub handle: JobHandle,
}

/// Removes a task name from the running set when the job ends.
struct RunningGuard {
    running: Arc<Mutex<HashSet<String>>>,
    name: String,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.running.lock().remove(&self.name);
    }
}

/// Shared submission path used by the ticker and every interval loop.
#[derive(Clone)]
struct Dispatcher {
    executor: Arc<ExecutionWrapper>,
    pool: Arc<WorkerPool>,
    running: Arc<Mutex<HashSet<String>>>,
    overlap: OverlapPolicy,
}

impl Dispatcher {
    fn dispatch(&self, task: &Arc<dyn Task>, at: DateTime<Tz>) -> Option<JobHandle> {
        let name = task.name().to_string();

        let guard = match self.overlap {
            OverlapPolicy::Allow => None,
            OverlapPolicy::SkipIfRunning => {
                if !self.running.lock().insert(name.clone()) {
                    debug!(task = %name, "previous run still in progress, skipping");
                    return None;
                }
                Some(RunningGuard {
                    running: Arc::clone(&self.running),
                    name: name.clone(),
                })
            }
        };

        let executor = Arc::clone(&self.executor);
        let task = Arc::clone(task);
        let job = async move {
            let _guard = guard;
            executor
                .execute(task, at)
                .await
                .map(|_| ())
                .map_err(anyhow::Error::from)
        };

        match self.pool.submit(name.clone(), job) {
            Ok(handle) => Some(handle),
            Err(PoolError::QueueFull) => {
                warn!(task = %name, "dispatch dropped, worker queue full");
                None
            }
            Err(e) => {
                warn!(task = %name, error = %e, "dispatch failed");
                None
            }
        }
    }
}

/// Drives every registered task according to its run mode.
pub struct Scheduler {
    config: SchedulerConfig,
    tz: Tz,
    registry: Arc<TaskRegistry>,
    dispatcher: Dispatcher,
    started_at: RwLock<Option<DateTime<Tz>>>,
    completed: Mutex<HashSet<String>>,
    shutdown_tx: watch::Sender<bool>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Create a scheduler and spawn its worker pool.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] for invalid configuration and
    /// [`SchedulerError::Pool`] if the pool cannot start.
    pub fn new(
        config: SchedulerConfig,
        registry: TaskRegistry,
        stats: Arc<dyn StatsSink>,
    ) -> Result<Self, SchedulerError> {
        config.validate().map_err(SchedulerError::InvalidConfig)?;
        let tz = config.time_zone().map_err(SchedulerError::InvalidConfig)?;
        let pool = WorkerPool::new(config.pool_config())?;
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            tz,
            registry: Arc::new(registry),
            dispatcher: Dispatcher {
                executor: Arc::new(ExecutionWrapper::new(stats)),
                pool: Arc::new(pool),
                running: Arc::new(Mutex::new(HashSet::new())),
                overlap: config.overlap,
            },
            config,
            started_at: RwLock::new(None),
            completed: Mutex::new(HashSet::new()),
            shutdown_tx,
        })
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Resolved time zone.
    #[must_use]
    pub const fn time_zone(&self) -> Tz {
        self.tz
    }

    /// Registered tasks.
    #[must_use]
    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// The execution wrapper shared by every dispatch.
    #[must_use]
    pub fn executor(&self) -> &ExecutionWrapper {
        &self.dispatcher.executor
    }

    /// Worker pool statistics.
    #[must_use]
    pub fn pool_stats(&self) -> PoolStats {
        self.dispatcher.pool.stats()
    }

    /// Reference time for `AFTER_` targets, set by the first tick or by
    /// [`Scheduler::run`].
    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Tz>> {
        *self.started_at.read()
    }

    /// Whether a one-shot task has been dispatched.
    #[must_use]
    pub fn is_one_shot_done(&self, name: &str) -> bool {
        self.completed.lock().contains(name)
    }

    /// Run one heartbeat pass at `now` and return what was submitted.
    ///
    /// Scheduled tasks matching `now` are dispatched in registry order, then
    /// one-shot tasks that are due and have not run yet.
    pub fn tick_at(&self, now: DateTime<Tz>) -> Vec<Dispatch> {
        let started_at = *self.started_at.write().get_or_insert(now);
        let mut dispatched = Vec::new();

        for task in self.registry.due_scheduled(&now) {
            if let Some(handle) = self.dispatcher.dispatch(&task, now) {
                dispatched.push(Dispatch {
                    name: task.name().to_string(),
                    handle,
                });
            }
        }

        for (task, target) in self.registry.one_shot_tasks() {
            let name = task.name();
            if self.completed.lock().contains(name) || !target.is_due(&now, &started_at) {
                continue;
            }
            if !self.completed.lock().insert(name.to_string()) {
                continue;
            }
            match self.dispatcher.dispatch(task, now) {
                Some(handle) => {
                    info!(task = %name, target = %target, "one-shot task dispatched");
                    dispatched.push(Dispatch {
                        name: name.to_string(),
                        handle,
                    });
                }
                None => {
                    // not submitted, try again next tick
                    self.completed.lock().remove(name);
                }
            }
        }

        if !dispatched.is_empty() {
            debug!(at = %now, count = dispatched.len(), "tick dispatched tasks");
        }
        dispatched
    }

    /// Run until [`Scheduler::shutdown`] is called.
    ///
    /// Starts one loop per interval task, aligns the heartbeat to the next
    /// whole second, then ticks every `tick_interval_ms`. A tick landing in
    /// a second that was already evaluated is skipped, so a shorter interval
    /// never fires a cron match twice.
    pub async fn run(&self) {
        let mut shutdown = self.shutdown_tx.subscribe();
        if *shutdown.borrow() {
            return;
        }

        let started_at = *self.started_at.write().get_or_insert_with(|| now_in(self.tz));
        info!(
            tasks = self.registry.len(),
            workers = self.config.max_workers,
            time_zone = %self.tz,
            started_at = %started_at,
            "scheduler started"
        );

        let mut loops = JoinSet::new();
        for (task, period) in self.registry.interval_tasks() {
            loops.spawn(interval_loop(
                self.dispatcher.clone(),
                Arc::clone(task),
                period,
                self.tz,
                self.shutdown_tx.subscribe(),
            ));
        }

        tokio::select! {
            () = tokio::time::sleep(until_next_second(&Utc::now())) => {}
            _ = shutdown.changed() => {
                loops.shutdown().await;
                return;
            }
        }

        let mut ticker = tokio::time::interval(self.config.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_second = None;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = now_in(self.tz);
                    // each wall-clock second is evaluated at most once
                    if last_second.replace(now.timestamp()) != Some(now.timestamp()) {
                        self.tick_at(now);
                    }
                }
                _ = shutdown.changed() => break,
            }
        }

        loops.shutdown().await;
        info!("scheduler stopped");
    }

    /// Stop the ticker and every interval loop. Running jobs finish.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Stop accepting jobs and join the worker threads.
    ///
    /// Blocks for up to two seconds per busy worker.
    pub fn shutdown_pool(&self) {
        self.dispatcher.pool.shutdown();
    }
}

/// Shortest pause between interval dispatches.
pub const MIN_INTERVAL_PERIOD: Duration = Duration::from_millis(1);

async fn interval_loop(
    dispatcher: Dispatcher,
    task: Arc<dyn Task>,
    period: Duration,
    tz: Tz,
    mut shutdown: watch::Receiver<bool>,
) {
    let period = period.max(MIN_INTERVAL_PERIOD);
    debug!(task = %task.name(), period = ?period, "interval loop started");
    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            () = tokio::time::sleep(period) => {}
            _ = shutdown.changed() => break,
        }

        let Some(handle) = dispatcher.dispatch(&task, now_in(tz)) else {
            continue;
        };
        // next period starts after this run ends
        tokio::select! {
            _ = handle.wait() => {}
            _ = shutdown.changed() => break,
        }
    }
    debug!(task = %task.name(), "interval loop stopped");
}
