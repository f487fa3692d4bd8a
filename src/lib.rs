//! # Prometheus Task Timer
//!
//! An in-process task scheduler driven by seven-field cron expressions.
//!
//! Tasks are registered up front, each with one of three run modes, and are
//! executed on a bounded pool of dedicated worker threads so a slow task never
//! delays the heartbeat or other tasks.
//!
//! ## Run Modes
//!
//! - **IntervalLoop**: sleep a fixed period, run, repeat. Each task has its own loop.
//! - **Scheduled**: run on every one-second tick whose timestamp matches the
//!   task's cron expression.
//! - **OneShot**: run once, at an absolute time (`TIME_2024-05-01 08:00:00`)
//!   or a delay after start (`AFTER_30`).
//!
//! ## Cron Expressions
//!
//! Seven whitespace-separated fields in the order
//! `year month day weekday hour minute second`. Each field is one of:
//!
//! | Form      | Meaning                                        |
//! |-----------|------------------------------------------------|
//! | `*`       | any value                                      |
//! | `a,b,c`   | listed points (two or more)                    |
//! | `a-b`     | inclusive range                                |
//! | `n/*`     | `n` evenly spaced points over the unit domain  |
//! | `n/a-b`   | `n` evenly spaced points over `a..=b`          |
//! | `a,b/c-d` | listed points restricted to `c..=d`            |
//!
//! Anything else never matches. A field that never matches makes the whole
//! expression silent; no error is raised. Weekdays count Monday as `1` and
//! Sunday as `7`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use prometheus_task_timer::builders::SchedulerBuilder;
//! use prometheus_task_timer::config::SchedulerConfig;
//! use prometheus_task_timer::core::{FnTask, RunMode};
//! use prometheus_task_timer::infra::InMemoryStats;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! prometheus_task_timer::util::init_tracing();
//! let stats = Arc::new(InMemoryStats::new());
//!
//! let scheduler = SchedulerBuilder::new(SchedulerConfig::default())
//!     // every weekday at 08:30:00
//!     .register(FnTask::new("report", RunMode::scheduled("* * * 1-5 8-8 30,30 0,0"), |ctx| async move {
//!         tracing::info!(at = %ctx.dispatched_at, "building report");
//!         Ok(())
//!     }).with_retries(2, Duration::from_secs(10)))?
//!     .register(FnTask::new("warmup", RunMode::one_shot("AFTER_5")?, |_| async { Ok(()) }))?
//!     .with_stats(stats.clone())
//!     .build()?;
//!
//! scheduler.run().await;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Seven-field cron expression engine.
pub mod cron;
/// Tasks, registry, execution wrapper, worker pool and scheduler.
pub mod core;
/// Scheduler and worker pool configuration.
pub mod config;
/// Builders to construct a scheduler from configuration.
pub mod builders;
/// Execution statistics backends.
pub mod infra;
/// Shared utilities.
pub mod util;
