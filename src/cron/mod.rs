//! Seven-field cron engine: year, month, day, weekday, hour, minute, second.
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use prometheus_task_timer::cron::is_time_hit;
//!
//! let at = Utc.with_ymd_and_hms(2024, 3, 4, 9, 30, 0).unwrap();
//! // Mondays, 09:00-09:59, on the half hour, at second 0
//! assert!(is_time_hit("* * * 1-1 9-9 0,30 0,0", &at));
//! ```

pub mod expression;
pub mod field;
pub mod unit;

pub use expression::{is_time_hit, is_time_hit_in, lint, CronError, CronExpression, FieldIssue, FIELD_COUNT};
pub use field::{distribution, CronField, Distribution, FieldSyntax};
pub use unit::{days_in_month, is_leap_year, TimeUnit, UnitValue};
