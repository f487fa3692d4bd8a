//! Builder wiring configuration, tasks and a stats sink into a [`Scheduler`].

use std::sync::Arc;

use crate::config::SchedulerConfig;
use crate::core::{NoopStatsSink, Scheduler, SchedulerError, StatsSink, Task, TaskRegistry};
use crate::infra::LogStatsSink;

/// Collects everything a [`Scheduler`] needs before it starts.
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use prometheus_task_timer::builders::SchedulerBuilder;
/// use prometheus_task_timer::config::SchedulerConfig;
/// use prometheus_task_timer::core::{FnTask, RunMode};
/// use prometheus_task_timer::infra::InMemoryStats;
///
/// let stats = Arc::new(InMemoryStats::new());
/// let scheduler = SchedulerBuilder::new(SchedulerConfig::default().with_max_workers(2))
///     .register(FnTask::new("heartbeat", RunMode::every(Duration::from_secs(5)), |_| async { Ok(()) }))
///     .unwrap()
///     .with_stats(stats)
///     .build()
///     .unwrap();
/// assert_eq!(scheduler.registry().len(), 1);
/// scheduler.shutdown_pool();
/// ```
pub struct SchedulerBuilder {
    config: SchedulerConfig,
    registry: TaskRegistry,
    stats: Option<Arc<dyn StatsSink>>,
}

impl std::fmt::Debug for SchedulerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerBuilder")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl SchedulerBuilder {
    /// Start from `config`.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            registry: TaskRegistry::new(),
            stats: None,
        }
    }

    /// Start from [`SchedulerConfig::from_env`].
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] if the environment is invalid.
    pub fn from_env() -> Result<Self, SchedulerError> {
        SchedulerConfig::from_env()
            .map(Self::new)
            .map_err(SchedulerError::InvalidConfig)
    }

    /// Register a task.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::DuplicateTask`] if the name is taken.
    pub fn register(self, task: impl Task) -> Result<Self, SchedulerError> {
        self.register_arc(Arc::new(task))
    }

    /// Register a shared task.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::DuplicateTask`] if the name is taken.
    pub fn register_arc(mut self, task: Arc<dyn Task>) -> Result<Self, SchedulerError> {
        self.registry.register(task)?;
        Ok(self)
    }

    /// Report outcomes to `stats`. Defaults to dropping them.
    #[must_use]
    pub fn with_stats(mut self, stats: Arc<dyn StatsSink>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Build the scheduler, starting its worker pool.
    ///
    /// With `console` enabled the sink is wrapped so every record is also
    /// logged.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] or [`SchedulerError::Pool`].
    pub fn build(self) -> Result<Scheduler, SchedulerError> {
        let stats = self
            .stats
            .unwrap_or_else(|| Arc::new(NoopStatsSink) as Arc<dyn StatsSink>);
        let stats: Arc<dyn StatsSink> = if self.config.console {
            Arc::new(LogStatsSink::new(stats))
        } else {
            stats
        };
        Scheduler::new(self.config, self.registry, stats)
    }
}
