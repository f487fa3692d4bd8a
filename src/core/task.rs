//! Task capability trait and run modes.
//!
//! A task only has to provide a name, a run mode and a work callback. Every
//! other knob has a default: no timeout, no retries, no post-success hook.
//!
//! ```rust
//! use std::time::Duration;
//! use prometheus_task_timer::core::{FnTask, RunMode};
//!
//! let task = FnTask::new("cleanup", RunMode::scheduled("* * * * 3-3 0,0 0,0"), |_ctx| async {
//!     Ok(())
//! })
//! .with_alias("nightly cleanup")
//! .with_retries(2, Duration::from_secs(5));
//! ```

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use super::error::SchedulerError;

/// Result type returned by task callbacks.
pub type TaskResult = anyhow::Result<()>;

/// Prefix of an absolute one-shot target, e.g. `TIME_2022-08-13 22:36:21`.
pub const ONE_SHOT_TIME_PREFIX: &str = "TIME_";
/// Prefix of a startup-relative one-shot target, e.g. `AFTER_30`.
pub const ONE_SHOT_AFTER_PREFIX: &str = "AFTER_";
/// Format of the timestamp following [`ONE_SHOT_TIME_PREFIX`].
pub const ONE_SHOT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// When a one-shot task becomes eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OneShotTarget {
    /// Wall-clock time, interpreted in the scheduler time zone.
    At(NaiveDateTime),
    /// Delay measured from scheduler start.
    After(Duration),
}

impl OneShotTarget {
    /// Whether the target is reached at `now` for a scheduler started at `started_at`.
    #[must_use]
    pub fn is_due(&self, now: &DateTime<Tz>, started_at: &DateTime<Tz>) -> bool {
        match self {
            Self::At(target) => now.naive_local() >= *target,
            Self::After(delay) => {
                let elapsed = now.timestamp() - started_at.timestamp();
                u64::try_from(elapsed).is_ok_and(|secs| secs >= delay.as_secs())
            }
        }
    }
}

impl FromStr for OneShotTarget {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(at) = s.strip_prefix(ONE_SHOT_TIME_PREFIX) {
            return NaiveDateTime::parse_from_str(at, ONE_SHOT_TIME_FORMAT)
                .map(Self::At)
                .map_err(|e| SchedulerError::InvalidOneShotTarget(format!("{s}: {e}")));
        }
        if let Some(after) = s.strip_prefix(ONE_SHOT_AFTER_PREFIX) {
            return after
                .parse::<u64>()
                .map(|secs| Self::After(Duration::from_secs(secs)))
                .map_err(|e| SchedulerError::InvalidOneShotTarget(format!("{s}: {e}")));
        }
        Err(SchedulerError::InvalidOneShotTarget(format!(
            "{s}: expected `{ONE_SHOT_TIME_PREFIX}` or `{ONE_SHOT_AFTER_PREFIX}` prefix"
        )))
    }
}

impl fmt::Display for OneShotTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::At(at) => write!(f, "{ONE_SHOT_TIME_PREFIX}{}", at.format(ONE_SHOT_TIME_FORMAT)),
            Self::After(delay) => write!(f, "{ONE_SHOT_AFTER_PREFIX}{}", delay.as_secs()),
        }
    }
}

/// Timing discipline of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Re-run forever, sleeping `period` before each run.
    IntervalLoop(Duration),
    /// Run on every tick matching a seven-field cron expression.
    Scheduled(String),
    /// Run exactly once when the target is reached.
    OneShot(OneShotTarget),
}

impl RunMode {
    /// Interval loop with the given period.
    #[must_use]
    pub const fn every(period: Duration) -> Self {
        Self::IntervalLoop(period)
    }

    /// Cron-scheduled mode.
    #[must_use]
    pub fn scheduled(expr: impl Into<String>) -> Self {
        Self::Scheduled(expr.into())
    }

    /// One-shot mode from a `TIME_...` or `AFTER_...` target string.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidOneShotTarget`] for malformed targets.
    pub fn one_shot(target: &str) -> Result<Self, SchedulerError> {
        target.parse().map(Self::OneShot)
    }

    /// Discriminant without parameters.
    #[must_use]
    pub const fn kind(&self) -> RunModeKind {
        match self {
            Self::IntervalLoop(_) => RunModeKind::IntervalLoop,
            Self::Scheduled(_) => RunModeKind::Scheduled,
            Self::OneShot(_) => RunModeKind::OneShot,
        }
    }
}

/// Run mode without parameters, used in records and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunModeKind {
    /// Fixed-period loop.
    IntervalLoop,
    /// Cron expression.
    Scheduled,
    /// Single run.
    OneShot,
}

impl fmt::Display for RunModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::IntervalLoop => "interval_loop",
            Self::Scheduled => "scheduled",
            Self::OneShot => "one_shot",
        })
    }
}

/// Information handed to a task callback for one attempt.
#[derive(Debug, Clone)]
pub struct TaskContext {
    /// Task name.
    pub name: String,
    /// Timestamp of the dispatch that produced this attempt.
    pub dispatched_at: DateTime<Tz>,
    /// Zero-based attempt index within the dispatch.
    pub attempt: u32,
    /// Whether this attempt is reported as a retry.
    pub retry: bool,
}

impl TaskContext {
    /// Dispatch timestamp in UTC.
    #[must_use]
    pub fn dispatched_at_utc(&self) -> DateTime<Utc> {
        self.dispatched_at.with_timezone(&Utc)
    }
}

/// A unit of work the scheduler can run.
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Unique name, used as dedupe and stats key.
    fn name(&self) -> &str;

    /// Display label. Defaults to the name.
    fn alias(&self) -> &str {
        self.name()
    }

    /// Timing discipline.
    fn run_mode(&self) -> &RunMode;

    /// Per-attempt timeout. Zero means unbounded.
    fn timeout(&self) -> Duration {
        Duration::ZERO
    }

    /// Additional attempts after a failure.
    fn retry_count(&self) -> u32 {
        0
    }

    /// Pause between attempts.
    fn retry_delay(&self) -> Duration {
        Duration::ZERO
    }

    /// Perform the work.
    async fn run(&self, ctx: &TaskContext) -> TaskResult;

    /// Hook invoked after a successful [`Task::run`].
    async fn after(&self, _ctx: &TaskContext) -> TaskResult {
        Ok(())
    }
}

type Callback = Arc<dyn Fn(TaskContext) -> BoxFuture<'static, TaskResult> + Send + Sync>;

/// Closure-backed [`Task`].
#[derive(Clone)]
pub struct FnTask {
    name: String,
    alias: Option<String>,
    mode: RunMode,
    timeout: Duration,
    retry_count: u32,
    retry_delay: Duration,
    work: Callback,
    after: Option<Callback>,
}

impl FnTask {
    /// Create a task running `work` under `mode`.
    pub fn new<F, Fut>(name: impl Into<String>, mode: RunMode, work: F) -> Self
    where
        F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TaskResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            alias: None,
            mode,
            timeout: Duration::ZERO,
            retry_count: 0,
            retry_delay: Duration::ZERO,
            work: boxed(work),
            after: None,
        }
    }

    /// Set the display label.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Set the per-attempt timeout. Zero disables it.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Allow `count` extra attempts, `delay` apart.
    #[must_use]
    pub const fn with_retries(mut self, count: u32, delay: Duration) -> Self {
        self.retry_count = count;
        self.retry_delay = delay;
        self
    }

    /// Set the post-success hook.
    #[must_use]
    pub fn with_after<F, Fut>(mut self, after: F) -> Self
    where
        F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TaskResult> + Send + 'static,
    {
        self.after = Some(boxed(after));
        self
    }
}

fn boxed<F, Fut>(f: F) -> Callback
where
    F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = TaskResult> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)))
}

impl fmt::Debug for FnTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTask")
            .field("name", &self.name)
            .field("alias", &self.alias)
            .field("mode", &self.mode)
            .field("timeout", &self.timeout)
            .field("retry_count", &self.retry_count)
            .field("retry_delay", &self.retry_delay)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Task for FnTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn alias(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    fn run_mode(&self) -> &RunMode {
        &self.mode
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn retry_count(&self) -> u32 {
        self.retry_count
    }

    fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    async fn run(&self, ctx: &TaskContext) -> TaskResult {
        (self.work)(ctx.clone()).await
    }

    async fn after(&self, ctx: &TaskContext) -> TaskResult {
        match &self.after {
            Some(after) => after(ctx.clone()).await,
            None => Ok(()),
        }
    }
}
