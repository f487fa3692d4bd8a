//! Aggregating in-memory stats sink.

use std::collections::{HashMap, VecDeque};
use std::fmt::Write as _;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::core::{ExecutionRecord, RunModeKind, StatsSink};

/// Number of recent records kept per task.
pub const RECENT_RUNS: usize = 10;

/// Aggregated statistics for one task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskStats {
    /// Task name.
    pub name: String,
    /// Task display label.
    pub alias: String,
    /// Task run mode.
    pub run_mode: RunModeKind,
    /// Attempts recorded.
    pub count: u64,
    /// Attempts flagged as retries.
    pub retries: u64,
    /// Successful attempts.
    pub successes: u64,
    /// `successes / count`, rounded to two decimals.
    pub success_rate: f64,
    /// Mean attempt duration.
    pub avg_duration: Duration,
    /// Longest attempt duration.
    pub max_duration: Duration,
    /// Mean memory usage in KiB.
    pub avg_memory_kb: u64,
    /// Peak memory usage in KiB.
    pub max_memory_kb: u64,
    /// Mean CPU usage in percent.
    pub avg_cpu_percent: f64,
    /// Peak CPU usage in percent.
    pub max_cpu_percent: f64,
    /// End of the most recent attempt.
    pub last_at: Option<DateTime<Utc>>,
    /// Most recent records, oldest first.
    pub recent: VecDeque<ExecutionRecord>,
}

impl TaskStats {
    fn new(record: &ExecutionRecord) -> Self {
        Self {
            name: record.name.clone(),
            alias: record.alias.clone(),
            run_mode: record.run_mode,
            count: 0,
            retries: 0,
            successes: 0,
            success_rate: 1.0,
            avg_duration: Duration::ZERO,
            max_duration: Duration::ZERO,
            avg_memory_kb: 0,
            max_memory_kb: 0,
            avg_cpu_percent: 0.0,
            max_cpu_percent: 0.0,
            last_at: None,
            recent: VecDeque::with_capacity(RECENT_RUNS),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn apply(&mut self, record: &ExecutionRecord) {
        self.count += 1;
        self.last_at = Some(record.ended_at);
        if record.success {
            self.successes += 1;
        }
        if record.retry {
            self.retries += 1;
        }
        self.success_rate = (self.successes as f64 / self.count as f64 * 100.0).round() / 100.0;

        let n = u32::try_from(self.count).unwrap_or(u32::MAX);
        self.avg_duration = (self.avg_duration * (n - 1) + record.duration) / n;
        self.max_duration = self.max_duration.max(record.duration);

        self.avg_memory_kb = (self.avg_memory_kb * (self.count - 1) + record.memory_kb) / self.count;
        self.max_memory_kb = self.max_memory_kb.max(record.memory_kb);

        self.avg_cpu_percent = (self.avg_cpu_percent * (self.count - 1) as f64
            + record.cpu_percent)
            / self.count as f64;
        self.max_cpu_percent = self.max_cpu_percent.max(record.cpu_percent);

        if self.recent.len() >= RECENT_RUNS {
            self.recent.pop_front();
        }
        self.recent.push_back(record.clone());
    }
}

/// Totals across every task.
#[derive(Debug, Clone, Serialize)]
pub struct GlobalStats {
    /// When the sink was created.
    pub started_at: DateTime<Utc>,
    /// Distinct tasks seen.
    pub task_count: usize,
    /// Attempts recorded.
    pub run_times: u64,
    /// Successful attempts.
    pub success_times: u64,
    /// Name of the task recorded last.
    pub last_run_task: Option<String>,
    /// End of the attempt recorded last.
    pub last_run_at: Option<DateTime<Utc>>,
    /// Outcome of the attempt recorded last.
    pub last_run_success: Option<bool>,
    /// Error of the attempt recorded last.
    pub last_run_msg: Option<String>,
}

#[derive(Debug)]
struct Inner {
    global: GlobalStats,
    tasks: HashMap<String, TaskStats>,
}

/// Stats sink that keeps per-task aggregates and a bounded run history.
#[derive(Debug)]
pub struct InMemoryStats {
    inner: RwLock<Inner>,
}

impl Default for InMemoryStats {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStats {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                global: GlobalStats {
                    started_at: Utc::now(),
                    task_count: 0,
                    run_times: 0,
                    success_times: 0,
                    last_run_task: None,
                    last_run_at: None,
                    last_run_success: None,
                    last_run_msg: None,
                },
                tasks: HashMap::new(),
            }),
        }
    }

    /// Snapshot of one task's aggregates.
    #[must_use]
    pub fn task(&self, name: &str) -> Option<TaskStats> {
        self.inner.read().tasks.get(name).cloned()
    }

    /// Snapshot of the global totals.
    #[must_use]
    pub fn global(&self) -> GlobalStats {
        self.inner.read().global.clone()
    }

    /// Whether any attempt of `name` has been recorded.
    #[must_use]
    pub fn has_run(&self, name: &str) -> bool {
        self.inner.read().tasks.contains_key(name)
    }

    /// Total attempts recorded.
    #[must_use]
    pub fn run_times(&self) -> u64 {
        self.inner.read().global.run_times
    }

    /// One-line aggregate summary of a task.
    #[must_use]
    pub fn summary(&self, name: &str) -> Option<String> {
        let stats = self.task(name)?;
        Some(format!(
            "{} | {} | {} | count={} retries={} successes={} success_rate={:.2} \
             avg={:?} max={:?} mem_avg={}KiB mem_max={}KiB cpu_avg={:.2}% cpu_max={:.2}% last_at={}",
            stats.name,
            stats.alias,
            stats.run_mode,
            stats.count,
            stats.retries,
            stats.successes,
            stats.success_rate,
            stats.avg_duration,
            stats.max_duration,
            stats.avg_memory_kb,
            stats.max_memory_kb,
            stats.avg_cpu_percent,
            stats.max_cpu_percent,
            stats
                .last_at
                .map_or_else(|| "-".to_string(), |at| at.to_rfc3339()),
        ))
    }

    /// Recent attempts of a task, one line each, skipping the first `skip`.
    #[must_use]
    pub fn detail(&self, name: &str, skip: usize) -> Option<String> {
        let stats = self.task(name)?;
        let mut out = format!("{} | {} | {}", stats.name, stats.alias, stats.run_mode);
        for record in stats.recent.iter().skip(skip) {
            let _ = write!(
                out,
                "\n  retry={} start={} end={} took={:?} mem={}KiB cpu={:.2}% success={} msg={}",
                record.retry,
                record.started_at.to_rfc3339(),
                record.ended_at.to_rfc3339(),
                record.duration,
                record.memory_kb,
                record.cpu_percent,
                record.success,
                record.error.as_deref().unwrap_or(""),
            );
        }
        Some(out)
    }

    /// Global totals rendered as one line.
    #[must_use]
    pub fn describe(&self) -> String {
        let g = self.global();
        format!(
            "started={} now={} tasks={} runs={} successes={} last_task={} last_at={} last_success={} last_msg={}",
            g.started_at.to_rfc3339(),
            Utc::now().to_rfc3339(),
            g.task_count,
            g.run_times,
            g.success_times,
            g.last_run_task.as_deref().unwrap_or("-"),
            g.last_run_at.map_or_else(|| "-".to_string(), |at| at.to_rfc3339()),
            g.last_run_success.map_or_else(|| "-".to_string(), |ok| ok.to_string()),
            g.last_run_msg.as_deref().unwrap_or(""),
        )
    }
}

impl StatsSink for InMemoryStats {
    fn record(&self, record: ExecutionRecord) {
        let mut inner = self.inner.write();
        let Inner { global, tasks } = &mut *inner;

        global.run_times += 1;
        if record.success {
            global.success_times += 1;
        }
        global.last_run_task = Some(record.name.clone());
        global.last_run_at = Some(record.ended_at);
        global.last_run_success = Some(record.success);
        global.last_run_msg.clone_from(&record.error);

        if !tasks.contains_key(&record.name) {
            global.task_count += 1;
        }
        tasks
            .entry(record.name.clone())
            .or_insert_with(|| TaskStats::new(&record))
            .apply(&record);
    }
}
