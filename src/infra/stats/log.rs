//! Tracing echo for execution records.

use tracing::{info, warn};

use crate::core::{ExecutionRecord, StatsSink};

/// Logs every record, then forwards it to the wrapped sink.
pub struct LogStatsSink<S> {
    inner: S,
}

impl<S: StatsSink> LogStatsSink<S> {
    /// Wrap `inner`.
    pub const fn new(inner: S) -> Self {
        Self { inner }
    }

    /// The wrapped sink.
    pub const fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: StatsSink> StatsSink for LogStatsSink<S> {
    fn record(&self, record: ExecutionRecord) {
        if record.success {
            info!(
                task = %record.name,
                alias = %record.alias,
                mode = %record.run_mode,
                attempt = record.attempt,
                retry = record.retry,
                duration_ms = u64::try_from(record.duration.as_millis()).unwrap_or(u64::MAX),
                "task attempt succeeded"
            );
        } else {
            warn!(
                task = %record.name,
                alias = %record.alias,
                mode = %record.run_mode,
                attempt = record.attempt,
                retry = record.retry,
                duration_ms = u64::try_from(record.duration.as_millis()).unwrap_or(u64::MAX),
                error = record.error.as_deref().unwrap_or(""),
                "task attempt failed"
            );
        }
        self.inner.record(record);
    }
}
