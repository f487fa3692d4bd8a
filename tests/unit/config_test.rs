//! Tests for configuration validation and loading

use std::collections::HashMap;
use std::time::Duration;

use prometheus_task_timer::config::{OverlapPolicy, SchedulerConfig, WorkerPoolConfig};

#[test]
fn test_scheduler_defaults() {
    let cfg = SchedulerConfig::default();
    assert_eq!(cfg.max_workers, 20);
    assert_eq!(cfg.time_zone, "UTC");
    assert_eq!(cfg.tick_interval(), Duration::from_secs(1));
    assert_eq!(cfg.overlap, OverlapPolicy::Allow);
    assert!(!cfg.console);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_pool_config_validation() {
    assert!(WorkerPoolConfig::new().validate().is_ok());
    assert!(WorkerPoolConfig::new().with_worker_count(0).validate().is_err());
    assert!(WorkerPoolConfig::new().with_max_queue_depth(0).validate().is_err());
    assert!(WorkerPoolConfig::new().with_thread_stack_size(1024).validate().is_err());
}

#[test]
fn test_scheduler_config_invalid_fields() {
    assert!(SchedulerConfig::default().with_max_workers(0).validate().is_err());
    assert!(SchedulerConfig::default().with_tick_interval_ms(0).validate().is_err());
    let err = SchedulerConfig::default()
        .with_time_zone("Nowhere/Special")
        .validate()
        .unwrap_err();
    assert!(err.contains("Nowhere/Special"));
}

#[test]
fn test_pool_config_follows_scheduler() {
    let cfg = SchedulerConfig::default().with_max_workers(3).with_max_queue_depth(7);
    let pool = cfg.pool_config();
    assert_eq!(pool.worker_count, 3);
    assert_eq!(pool.max_queue_depth, 7);
}

#[test]
fn test_from_json_str_fills_defaults() {
    let cfg = SchedulerConfig::from_json_str(
        r#"{ "max_workers": 4, "time_zone": "Asia/Shanghai", "overlap": "skip_if_running" }"#,
    )
    .unwrap();
    assert_eq!(cfg.max_workers, 4);
    assert_eq!(cfg.overlap, OverlapPolicy::SkipIfRunning);
    assert_eq!(cfg.tick_interval_ms, 1000);
    assert_eq!(cfg.time_zone().unwrap(), chrono_tz::Asia::Shanghai);

    assert!(SchedulerConfig::from_json_str(r#"{ "max_workers": 0 }"#).is_err());
    assert!(SchedulerConfig::from_json_str("not json").is_err());
}

#[test]
fn test_from_lookup_reads_prefixed_keys() {
    let vars: HashMap<&str, &str> = [
        ("TASK_TIMER_MAX_WORKERS", "6"),
        ("TASK_TIMER_CONSOLE", "yes"),
        ("TASK_TIMER_OVERLAP", "skip"),
        ("TASK_TIMER_TIME_ZONE", "Europe/Berlin"),
    ]
    .into_iter()
    .collect();
    let cfg = SchedulerConfig::from_lookup(|key| vars.get(key).map(ToString::to_string)).unwrap();
    assert_eq!(cfg.max_workers, 6);
    assert!(cfg.console);
    assert_eq!(cfg.overlap, OverlapPolicy::SkipIfRunning);
    assert_eq!(cfg.time_zone, "Europe/Berlin");
}

#[test]
fn test_from_lookup_rejects_bad_values() {
    let err = SchedulerConfig::from_lookup(|key| {
        (key == "TASK_TIMER_MAX_WORKERS").then(|| "many".to_string())
    })
    .unwrap_err();
    assert!(err.starts_with("TASK_TIMER_MAX_WORKERS"));

    assert!(SchedulerConfig::from_lookup(|key| {
        (key == "TASK_TIMER_CONSOLE").then(|| "maybe".to_string())
    })
    .is_err());
}

#[test]
fn test_overlap_policy_text() {
    assert_eq!("Allow".parse::<OverlapPolicy>().unwrap(), OverlapPolicy::Allow);
    assert_eq!(OverlapPolicy::SkipIfRunning.to_string(), "skip_if_running");
    assert!("sometimes".parse::<OverlapPolicy>().is_err());
}
