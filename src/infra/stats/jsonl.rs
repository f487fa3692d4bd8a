//! File-backed stats sink writing one JSON record per line.

use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::warn;

use crate::core::{ExecutionRecord, SchedulerError, StatsSink};

/// Append-only JSON lines sink, one file per stream.
pub struct JsonLinesStatsSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonLinesStatsSink {
    /// Open (or create) `<dir>/<stream>_stats.jsonl` for appending.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] if the directory or file
    /// cannot be created.
    pub fn new(dir: impl AsRef<Path>, stream: &str) -> Result<Self, SchedulerError> {
        let dir = dir.as_ref();
        create_dir_all(dir).map_err(|e| SchedulerError::InvalidConfig(e.to_string()))?;
        let path = dir.join(format!("{stream}_stats.jsonl"));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| SchedulerError::InvalidConfig(e.to_string()))?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record written so far.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a line does not parse.
    pub fn load(&self) -> anyhow::Result<Vec<ExecutionRecord>> {
        let file = File::open(&self.path)?;
        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }
}

impl StatsSink for JsonLinesStatsSink {
    fn record(&self, record: ExecutionRecord) {
        let line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(e) => {
                warn!(task = %record.name, error = %e, "failed to encode execution record");
                return;
            }
        };
        let mut file = self.file.lock();
        if let Err(e) = writeln!(file, "{line}") {
            warn!(path = %self.path.display(), error = %e, "failed to append execution record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RunModeKind;
    use chrono::Utc;
    use std::time::Duration;
    use uuid::Uuid;

    #[test]
    fn test_appends_and_loads_records() {
        let dir = std::env::temp_dir().join(format!("task-timer-{}", Uuid::new_v4()));
        let sink = JsonLinesStatsSink::new(&dir, "unit").unwrap();
        let now = Utc::now();
        for success in [true, false] {
            sink.record(ExecutionRecord {
                run_id: Uuid::new_v4(),
                name: "report".into(),
                alias: "daily report".into(),
                run_mode: RunModeKind::OneShot,
                attempt: 0,
                retry: false,
                started_at: now,
                ended_at: now,
                duration: Duration::from_millis(12),
                memory_kb: 0,
                cpu_percent: 0.0,
                success,
                error: None,
            });
        }

        let records = sink.load().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].success);
        assert!(!records[1].success);
        assert_eq!(records[0].run_mode, RunModeKind::OneShot);

        let _ = std::fs::remove_dir_all(dir);
    }
}
