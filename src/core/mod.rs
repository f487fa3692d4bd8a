//! Core scheduling abstractions: tasks, registry, execution and dispatch.

pub mod error;
pub mod execution;
pub mod registry;
pub mod scheduler;
pub mod stats;
pub mod task;
pub mod worker_pool;

pub use error::{AppResult, ExecutionError, SchedulerError};
pub use execution::{execution_key, ExecutionOutcome, ExecutionWrapper};
pub use registry::TaskRegistry;
pub use scheduler::{Dispatch, Scheduler, MIN_INTERVAL_PERIOD};
pub use stats::{ExecutionRecord, NoopStatsSink, StatsSink};
pub use task::{
    FnTask, OneShotTarget, RunMode, RunModeKind, Task, TaskContext, TaskResult,
    ONE_SHOT_AFTER_PREFIX, ONE_SHOT_TIME_FORMAT, ONE_SHOT_TIME_PREFIX,
};
pub use worker_pool::{Job, JobHandle, JobStatus, PoolError, PoolStats, WorkerPool};
