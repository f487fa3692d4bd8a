//! Execution wrapper: runs one dispatch of a task under its retry policy.
//!
//! Every attempt produces exactly one [`ExecutionRecord`]. Attempts are
//! bounded by the task timeout when it is non-zero; a timed-out attempt is a
//! failed attempt and consumes one retry like any other failure.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures::FutureExt;
use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use super::error::ExecutionError;
use super::stats::{ExecutionRecord, StatsSink};
use super::task::{Task, TaskContext};
use super::worker_pool::panic_message;

/// Summary of a dispatch whose final attempt succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// Attempts made, including the successful one.
    pub attempts: u32,
    /// Attempts reported as retries.
    pub retries: u32,
    /// Wall-clock time across all attempts and delays.
    pub elapsed: Duration,
    /// Error of the post-success hook, if it failed.
    pub hook_error: Option<String>,
}

/// Key identifying one dispatch of one task.
#[must_use]
pub fn execution_key(dispatched_at: &DateTime<Tz>, name: &str) -> String {
    format!("{}_{name}", dispatched_at.timestamp())
}

/// Runs tasks and reports every attempt to a stats sink.
pub struct ExecutionWrapper {
    stats: Arc<dyn StatsSink>,
    in_flight: Mutex<HashSet<String>>,
}

impl std::fmt::Debug for ExecutionWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionWrapper")
            .field("in_flight", &self.in_flight.lock().len())
            .finish_non_exhaustive()
    }
}

struct KeyGuard<'a> {
    set: &'a Mutex<HashSet<String>>,
    key: String,
    owner: bool,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        if self.owner {
            self.set.lock().remove(&self.key);
        }
    }
}

impl ExecutionWrapper {
    /// Create a wrapper reporting to `stats`.
    #[must_use]
    pub fn new(stats: Arc<dyn StatsSink>) -> Self {
        Self {
            stats,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Whether a dispatch with this key is currently executing.
    #[must_use]
    pub fn is_in_flight(&self, key: &str) -> bool {
        self.in_flight.lock().contains(key)
    }

    /// Number of dispatches currently executing.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Execute one dispatch of `task`.
    ///
    /// If the same dispatch key is already tracked, every attempt is flagged
    /// as a retry. That flag is informational; the run still proceeds.
    ///
    /// # Errors
    ///
    /// Returns the error of the final attempt once the retry budget is spent.
    pub async fn execute(
        &self,
        task: Arc<dyn Task>,
        dispatched_at: DateTime<Tz>,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let key = execution_key(&dispatched_at, task.name());
        let owner = self.in_flight.lock().insert(key.clone());
        let _guard = KeyGuard {
            set: &self.in_flight,
            key,
            owner,
        };

        let clock = Instant::now();
        let retry_budget = task.retry_count();
        let mut attempt = 0u32;
        let mut retries = 0u32;

        loop {
            let ctx = TaskContext {
                name: task.name().to_string(),
                dispatched_at,
                attempt,
                retry: attempt > 0 || !owner,
            };
            if ctx.retry {
                retries += 1;
            }

            let started_at = Utc::now();
            let started = Instant::now();
            let result = run_attempt(task.as_ref(), &ctx).await;
            self.report(task.as_ref(), &ctx, started_at, started.elapsed(), result.as_ref().err());

            match result {
                Ok(()) => {
                    let hook = AssertUnwindSafe(task.after(&ctx)).catch_unwind().await;
                    let hook_error = match hook {
                        Ok(Ok(())) => None,
                        Ok(Err(e)) => Some(format!("{e:#}")),
                        Err(panic) => {
                            Some(format!("hook panicked: {}", panic_message(panic.as_ref())))
                        }
                    };
                    if let Some(error) = &hook_error {
                        warn!(task = %ctx.name, error = %error, "post-success hook failed");
                    }
                    debug!(task = %ctx.name, attempts = attempt + 1, "task finished");
                    return Ok(ExecutionOutcome {
                        attempts: attempt + 1,
                        retries,
                        elapsed: clock.elapsed(),
                        hook_error,
                    });
                }
                Err(e) if attempt < retry_budget => {
                    warn!(
                        task = %ctx.name,
                        attempt = attempt,
                        remaining = retry_budget - attempt,
                        error = %e,
                        "task attempt failed, retrying"
                    );
                    let delay = task.retry_delay();
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn report(
        &self,
        task: &dyn Task,
        ctx: &TaskContext,
        started_at: DateTime<Utc>,
        duration: Duration,
        error: Option<&ExecutionError>,
    ) {
        self.stats.record(ExecutionRecord {
            run_id: Uuid::new_v4(),
            name: ctx.name.clone(),
            alias: task.alias().to_string(),
            run_mode: task.run_mode().kind(),
            attempt: ctx.attempt,
            retry: ctx.retry,
            started_at,
            ended_at: Utc::now(),
            duration,
            memory_kb: 0,
            cpu_percent: 0.0,
            success: error.is_none(),
            error: error.map(ToString::to_string),
        });
    }
}

async fn run_attempt(task: &dyn Task, ctx: &TaskContext) -> Result<(), ExecutionError> {
    let timeout = task.timeout();
    let work = AssertUnwindSafe(task.run(ctx)).catch_unwind();
    let outcome = if timeout.is_zero() {
        work.await
    } else if let Ok(outcome) = tokio::time::timeout(timeout, work).await {
        outcome
    } else {
        warn!(task = %ctx.name, timeout = ?timeout, "task attempt timed out");
        return Err(ExecutionError::Timeout(timeout));
    };

    match outcome {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(ExecutionError::Failed(format!("{e:#}"))),
        Err(panic) => Err(ExecutionError::Panicked(panic_message(panic.as_ref()))),
    }
}
