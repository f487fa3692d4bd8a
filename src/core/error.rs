//! Error types for scheduler operations.

use std::time::Duration;

use thiserror::Error;

use super::worker_pool::PoolError;

/// Errors produced while configuring or wiring the scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A task with the same name is already registered.
    #[error("task already registered: {0}")]
    DuplicateTask(String),
    /// A one-shot target string could not be parsed.
    #[error("invalid one-shot target: {0}")]
    InvalidOneShotTarget(String),
    /// The worker pool rejected an operation.
    #[error("worker pool error: {0}")]
    Pool(#[from] PoolError),
}

/// Why a single attempt of a task failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutionError {
    /// The callback returned an error.
    #[error("task failed: {0}")]
    Failed(String),
    /// The attempt exceeded the task timeout.
    #[error("task timed out after {0:?}")]
    Timeout(Duration),
    /// The callback panicked.
    #[error("task panicked: {0}")]
    Panicked(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
