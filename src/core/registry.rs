//! Task registry.
//!
//! Registration happens before the scheduler starts; afterwards the registry
//! is shared read-only behind an `Arc`. Iteration follows insertion order.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone};
use tracing::{debug, warn};

use super::error::SchedulerError;
use super::task::{OneShotTarget, RunMode, Task};
use crate::cron::{is_time_hit, lint};

/// Ordered set of uniquely named tasks.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: Vec<Arc<dyn Task>>,
    names: HashSet<String>,
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.tasks.iter().map(|t| t.name())).finish()
    }
}

impl TaskRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task.
    ///
    /// Scheduled tasks whose expression can never fire are accepted and
    /// logged once here; they are simply never dispatched.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::DuplicateTask`] if the name is taken.
    pub fn register(&mut self, task: Arc<dyn Task>) -> Result<(), SchedulerError> {
        let name = task.name().to_string();
        if !self.names.insert(name.clone()) {
            return Err(SchedulerError::DuplicateTask(name));
        }

        match task.run_mode() {
            RunMode::Scheduled(expr) if expr.trim().is_empty() => {
                warn!(task = %name, "scheduled task has no cron expression and will never run");
            }
            RunMode::Scheduled(expr) => {
                for issue in lint(expr) {
                    warn!(task = %name, expr = %expr, issue = %issue, "cron field never fires");
                }
            }
            RunMode::IntervalLoop(period) if period.is_zero() => {
                warn!(task = %name, "interval loop has a zero period, pausing 1ms between runs");
            }
            _ => {}
        }

        debug!(task = %name, mode = %task.run_mode().kind(), "task registered");
        self.tasks.push(task);
        Ok(())
    }

    /// Number of tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether no task is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Look a task up by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Task>> {
        self.tasks.iter().find(|t| t.name() == name)
    }

    /// Every task in insertion order.
    #[must_use]
    pub fn all(&self) -> &[Arc<dyn Task>] {
        &self.tasks
    }

    /// Interval-loop tasks with their periods.
    pub fn interval_tasks(&self) -> impl Iterator<Item = (&Arc<dyn Task>, Duration)> {
        self.tasks.iter().filter_map(|t| match t.run_mode() {
            RunMode::IntervalLoop(period) => Some((t, *period)),
            _ => None,
        })
    }

    /// Scheduled tasks with their expressions.
    pub fn scheduled_tasks(&self) -> impl Iterator<Item = (&Arc<dyn Task>, &str)> {
        self.tasks.iter().filter_map(|t| match t.run_mode() {
            RunMode::Scheduled(expr) => Some((t, expr.as_str())),
            _ => None,
        })
    }

    /// One-shot tasks with their targets.
    pub fn one_shot_tasks(&self) -> impl Iterator<Item = (&Arc<dyn Task>, &OneShotTarget)> {
        self.tasks.iter().filter_map(|t| match t.run_mode() {
            RunMode::OneShot(target) => Some((t, target)),
            _ => None,
        })
    }

    /// Scheduled tasks whose expression matches `at`, in insertion order.
    #[must_use]
    pub fn due_scheduled<Z: TimeZone>(&self, at: &DateTime<Z>) -> Vec<Arc<dyn Task>> {
        self.scheduled_tasks()
            .filter(|(_, expr)| is_time_hit(expr, at))
            .map(|(task, _)| Arc::clone(task))
            .collect()
    }
}
