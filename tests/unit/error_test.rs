//! Tests for error display and conversion

use std::time::Duration;

use prometheus_task_timer::core::{ExecutionError, PoolError, SchedulerError};

#[test]
fn test_scheduler_error_display() {
    assert_eq!(
        SchedulerError::DuplicateTask("report".into()).to_string(),
        "task already registered: report"
    );
    assert_eq!(
        SchedulerError::InvalidConfig("max_workers".into()).to_string(),
        "invalid configuration: max_workers"
    );
}

#[test]
fn test_pool_error_converts() {
    let err: SchedulerError = PoolError::QueueFull.into();
    assert!(matches!(err, SchedulerError::Pool(PoolError::QueueFull)));
    assert_eq!(err.to_string(), "worker pool error: job queue is full");
}

#[test]
fn test_execution_error_display() {
    assert_eq!(
        ExecutionError::Timeout(Duration::from_millis(1500)).to_string(),
        "task timed out after 1.5s"
    );
    assert_eq!(ExecutionError::Failed("disk".into()).to_string(), "task failed: disk");
    assert_eq!(ExecutionError::Panicked("oops".into()).to_string(), "task panicked: oops");
}

#[test]
fn test_execution_error_into_anyhow() {
    let err = anyhow::Error::from(ExecutionError::Failed("x".into()));
    assert!(err.downcast_ref::<ExecutionError>().is_some());
}
