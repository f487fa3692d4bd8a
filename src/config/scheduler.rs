//! Scheduler configuration.
//!
//! Values come from code, JSON, or the environment:
//!
//! | Variable                      | Field              |
//! |-------------------------------|--------------------|
//! | `TASK_TIMER_MAX_WORKERS`      | `max_workers`      |
//! | `TASK_TIMER_MAX_QUEUE_DEPTH`  | `max_queue_depth`  |
//! | `TASK_TIMER_TIME_ZONE`        | `time_zone`        |
//! | `TASK_TIMER_TICK_INTERVAL_MS` | `tick_interval_ms` |
//! | `TASK_TIMER_CONSOLE`          | `console`          |
//! | `TASK_TIMER_OVERLAP`          | `overlap`          |

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::pool::{
    WorkerPoolConfig, DEFAULT_MAX_QUEUE_DEPTH, DEFAULT_THREAD_STACK_SIZE, DEFAULT_WORKER_COUNT,
};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "TASK_TIMER_";

/// What to do when a task is dispatched while a previous run is still going.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Run both.
    #[default]
    Allow,
    /// Drop the new dispatch.
    SkipIfRunning,
}

impl FromStr for OverlapPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow" => Ok(Self::Allow),
            "skip_if_running" | "skip" => Ok(Self::SkipIfRunning),
            other => Err(format!("unknown overlap policy `{other}`")),
        }
    }
}

impl fmt::Display for OverlapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Allow => "allow",
            Self::SkipIfRunning => "skip_if_running",
        })
    }
}

/// Root scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Worker pool concurrency.
    pub max_workers: usize,
    /// Dispatches waiting for a worker before new ones are rejected.
    pub max_queue_depth: usize,
    /// IANA time zone used for cron evaluation and `TIME_` targets.
    pub time_zone: String,
    /// Heartbeat period in milliseconds.
    pub tick_interval_ms: u64,
    /// Echo every outcome record to the log.
    pub console: bool,
    /// Overlapping-run policy.
    pub overlap: OverlapPolicy,
    /// Worker thread stack size in bytes.
    pub thread_stack_size: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_WORKER_COUNT,
            max_queue_depth: DEFAULT_MAX_QUEUE_DEPTH,
            time_zone: "UTC".to_string(),
            tick_interval_ms: 1000,
            console: false,
            overlap: OverlapPolicy::Allow,
            thread_stack_size: DEFAULT_THREAD_STACK_SIZE,
        }
    }
}

impl SchedulerConfig {
    /// Set the worker pool concurrency.
    #[must_use]
    pub const fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Set the dispatch queue capacity.
    #[must_use]
    pub const fn with_max_queue_depth(mut self, max_queue_depth: usize) -> Self {
        self.max_queue_depth = max_queue_depth;
        self
    }

    /// Set the time zone by IANA name.
    #[must_use]
    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = time_zone.into();
        self
    }

    /// Set the heartbeat period.
    #[must_use]
    pub const fn with_tick_interval_ms(mut self, tick_interval_ms: u64) -> Self {
        self.tick_interval_ms = tick_interval_ms;
        self
    }

    /// Enable or disable the outcome echo.
    #[must_use]
    pub const fn with_console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }

    /// Set the overlap policy.
    #[must_use]
    pub const fn with_overlap(mut self, overlap: OverlapPolicy) -> Self {
        self.overlap = overlap;
        self
    }

    /// Heartbeat period.
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Resolve the configured time zone.
    ///
    /// # Errors
    ///
    /// Returns a message if the name is not a known IANA zone.
    pub fn time_zone(&self) -> Result<Tz, String> {
        self.time_zone
            .parse::<Tz>()
            .map_err(|e| format!("time_zone `{}` invalid: {e}", self.time_zone))
    }

    /// Pool configuration derived from this configuration.
    #[must_use]
    pub const fn pool_config(&self) -> WorkerPoolConfig {
        WorkerPoolConfig::new()
            .with_worker_count(self.max_workers)
            .with_max_queue_depth(self.max_queue_depth)
            .with_thread_stack_size(self.thread_stack_size)
    }

    /// Validate every field.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.tick_interval_ms == 0 {
            return Err("tick_interval_ms must be greater than 0".into());
        }
        self.time_zone()?;
        self.pool_config()
            .validate()
            .map_err(|e| format!("pool invalid: {e}"))
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns a message on parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load `.env` if present, then build configuration from
    /// `TASK_TIMER_*` variables over the defaults.
    ///
    /// # Errors
    ///
    /// Returns a message if a variable does not parse or validation fails.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup, using the same
    /// variable names as [`SchedulerConfig::from_env`].
    ///
    /// # Errors
    ///
    /// Returns a message if a value does not parse or validation fails.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut cfg = Self::default();

        if let Some(v) = get("MAX_WORKERS") {
            cfg.max_workers = parse_var("MAX_WORKERS", &v)?;
        }
        if let Some(v) = get("MAX_QUEUE_DEPTH") {
            cfg.max_queue_depth = parse_var("MAX_QUEUE_DEPTH", &v)?;
        }
        if let Some(v) = get("TIME_ZONE") {
            cfg.time_zone = v.trim().to_string();
        }
        if let Some(v) = get("TICK_INTERVAL_MS") {
            cfg.tick_interval_ms = parse_var("TICK_INTERVAL_MS", &v)?;
        }
        if let Some(v) = get("CONSOLE") {
            cfg.console = parse_flag(&v)
                .ok_or_else(|| format!("{ENV_PREFIX}CONSOLE: expected a boolean, got `{v}`"))?;
        }
        if let Some(v) = get("OVERLAP") {
            cfg.overlap = v.parse().map_err(|e| format!("{ENV_PREFIX}OVERLAP: {e}"))?;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| format!("{ENV_PREFIX}{name}: {e}"))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
