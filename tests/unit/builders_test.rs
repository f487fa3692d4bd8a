//! Tests for the scheduler builder

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeZone;
use chrono_tz::Tz;
use prometheus_task_timer::builders::SchedulerBuilder;
use prometheus_task_timer::config::SchedulerConfig;
use prometheus_task_timer::core::{FnTask, RunMode, SchedulerError};
use prometheus_task_timer::infra::InMemoryStats;

#[test]
fn test_duplicate_registration_fails() {
    let result = SchedulerBuilder::new(SchedulerConfig::default())
        .register(FnTask::new("a", RunMode::every(Duration::from_secs(1)), |_| async { Ok(()) }))
        .unwrap()
        .register(FnTask::new("a", RunMode::scheduled("* * * * * * *"), |_| async { Ok(()) }));
    assert!(matches!(result, Err(SchedulerError::DuplicateTask(_))));
}

#[test]
fn test_invalid_config_fails_build() {
    let result = SchedulerBuilder::new(SchedulerConfig::default().with_max_workers(0)).build();
    assert!(matches!(result, Err(SchedulerError::InvalidConfig(_))));
}

#[test]
fn test_console_echo_still_reaches_sink() {
    let stats = Arc::new(InMemoryStats::new());
    let scheduler = SchedulerBuilder::new(
        SchedulerConfig::default()
            .with_max_workers(1)
            .with_console(true)
            .with_time_zone("Asia/Tokyo"),
    )
    .register(FnTask::new("every", RunMode::scheduled("* * * * * * *"), |_| async { Ok(()) }))
    .unwrap()
    .with_stats(stats.clone())
    .build()
    .unwrap();

    assert_eq!(scheduler.time_zone(), chrono_tz::Asia::Tokyo);
    let now = Tz::Asia__Tokyo.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    for dispatch in scheduler.tick_at(now) {
        assert!(dispatch.handle.wait_blocking().unwrap().is_completed());
    }
    assert_eq!(stats.run_times(), 1);
    scheduler.shutdown_pool();
}
