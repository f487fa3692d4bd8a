//! Tests for stats sinks

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use prometheus_task_timer::core::{ExecutionRecord, RunModeKind, StatsSink};
use prometheus_task_timer::infra::{InMemoryStats, JsonLinesStatsSink, LogStatsSink};
use uuid::Uuid;

fn record(name: &str, success: bool) -> ExecutionRecord {
    let now = Utc::now();
    ExecutionRecord {
        run_id: Uuid::new_v4(),
        name: name.to_string(),
        alias: name.to_uppercase(),
        run_mode: RunModeKind::IntervalLoop,
        attempt: 0,
        retry: false,
        started_at: now,
        ended_at: now,
        duration: Duration::from_millis(3),
        memory_kb: 0,
        cpu_percent: 0.0,
        success,
        error: (!success).then(|| "failed".to_string()),
    }
}

#[test]
fn test_concurrent_writers() {
    let stats = Arc::new(InMemoryStats::new());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let stats = Arc::clone(&stats);
            thread::spawn(move || {
                for _ in 0..100 {
                    stats.record(record(&format!("task-{}", i % 2), true));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(stats.run_times(), 800);
    assert_eq!(stats.global().task_count, 2);
    assert_eq!(stats.task("task-0").unwrap().count, 400);
}

#[test]
fn test_log_sink_forwards() {
    let memory = Arc::new(InMemoryStats::new());
    let sink = LogStatsSink::new(Arc::clone(&memory));
    sink.record(record("echo", true));
    sink.record(record("echo", false));

    let echo = sink.inner().task("echo").unwrap();
    assert_eq!(echo.count, 2);
    assert!((echo.success_rate - 0.5).abs() < f64::EPSILON);
    assert_eq!(echo.alias, "ECHO");
}

#[test]
fn test_jsonl_sink_persists_records() {
    let dir = std::env::temp_dir().join(format!("task-timer-it-{}", Uuid::new_v4()));
    let sink = JsonLinesStatsSink::new(&dir, "jobs").unwrap();
    assert!(sink.path().ends_with("jobs_stats.jsonl"));

    sink.record(record("persisted", false));
    let loaded = sink.load().unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].name, "persisted");
    assert_eq!(loaded[0].error.as_deref(), Some("failed"));

    let _ = std::fs::remove_dir_all(dir);
}
