//! Execution outcome records and the sink contract.
//!
//! One [`ExecutionRecord`] is pushed per attempt. Sinks own aggregation and
//! must tolerate concurrent writes from every worker thread.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task::RunModeKind;

/// Outcome of one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Unique identifier of this record.
    pub run_id: Uuid,
    /// Task name.
    pub name: String,
    /// Task display label.
    pub alias: String,
    /// Run mode of the task.
    pub run_mode: RunModeKind,
    /// Zero-based attempt index within the dispatch.
    pub attempt: u32,
    /// Whether the attempt was a retry.
    pub retry: bool,
    /// Attempt start.
    pub started_at: DateTime<Utc>,
    /// Attempt end.
    pub ended_at: DateTime<Utc>,
    /// Wall-clock duration of the attempt.
    pub duration: Duration,
    /// Memory usage in KiB. Not sampled yet, always zero.
    pub memory_kb: u64,
    /// CPU usage in percent. Not sampled yet, always zero.
    pub cpu_percent: f64,
    /// Whether the attempt succeeded.
    pub success: bool,
    /// Error message for failed attempts.
    pub error: Option<String>,
}

/// Receiver of execution records.
pub trait StatsSink: Send + Sync {
    /// Record one attempt outcome.
    fn record(&self, record: ExecutionRecord);
}

impl<S: StatsSink + ?Sized> StatsSink for Arc<S> {
    fn record(&self, record: ExecutionRecord) {
        (**self).record(record);
    }
}

/// Sink that drops every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStatsSink;

impl StatsSink for NoopStatsSink {
    fn record(&self, _record: ExecutionRecord) {}
}
