//! Tests for task descriptors and run modes

use std::time::Duration;

use chrono::TimeZone;
use chrono_tz::Tz;
use prometheus_task_timer::core::{
    FnTask, OneShotTarget, RunMode, RunModeKind, SchedulerError, Task, TaskContext,
};

#[test]
fn test_run_mode_kinds() {
    assert_eq!(RunMode::every(Duration::from_secs(2)).kind(), RunModeKind::IntervalLoop);
    assert_eq!(RunMode::scheduled("* * * * * * *").kind(), RunModeKind::Scheduled);
    assert_eq!(RunMode::one_shot("AFTER_1").unwrap().kind(), RunModeKind::OneShot);
    assert_eq!(RunModeKind::OneShot.to_string(), "one_shot");
}

#[test]
fn test_one_shot_rejects_unknown_prefix() {
    let err = RunMode::one_shot("LATER_5").unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidOneShotTarget(_)));
}

#[test]
fn test_one_shot_target_display_round_trip() {
    for text in ["AFTER_0", "AFTER_3600", "TIME_2030-01-02 03:04:05"] {
        let target: OneShotTarget = text.parse().unwrap();
        assert_eq!(target.to_string(), text);
    }
}

#[tokio::test]
async fn test_fn_task_options_and_context() {
    let task = FnTask::new("ctx", RunMode::scheduled("* * * * * * *"), |ctx: TaskContext| async move {
        anyhow::ensure!(ctx.attempt == 2 && ctx.retry, "unexpected context {ctx:?}");
        Ok(())
    })
    .with_alias("context check")
    .with_timeout(Duration::from_secs(3))
    .with_retries(4, Duration::from_millis(250));

    assert_eq!(task.alias(), "context check");
    assert_eq!(task.timeout(), Duration::from_secs(3));
    assert_eq!(task.retry_count(), 4);
    assert_eq!(task.retry_delay(), Duration::from_millis(250));

    let ctx = TaskContext {
        name: "ctx".into(),
        dispatched_at: Tz::UTC.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        attempt: 2,
        retry: true,
    };
    assert!(task.run(&ctx).await.is_ok());
    assert!(task.run(&TaskContext { attempt: 0, ..ctx }).await.is_err());
}
