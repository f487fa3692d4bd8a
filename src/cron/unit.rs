//! Calendar unit accessors feeding domain-aware field parsing.

use std::fmt;

use chrono::{DateTime, Datelike, TimeZone, Timelike};

/// The seven units of a cron expression, in expression order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    /// Calendar year. Unbounded domain.
    Year,
    /// Month, 1-12.
    Month,
    /// Day of month, 1 to the length of the current month.
    Day,
    /// Weekday, 1 (Monday) to 7 (Sunday).
    Weekday,
    /// Hour, 0-23.
    Hour,
    /// Minute, 0-59.
    Minute,
    /// Second, 0-59.
    Second,
}

/// Current value and domain of a unit at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitValue {
    /// Value of the unit at the instant.
    pub current: i32,
    /// Domain minimum, `None` when the unit is unbounded.
    pub min: Option<i32>,
    /// Domain maximum, `None` when the unit is unbounded.
    pub max: Option<i32>,
}

impl TimeUnit {
    /// All units in expression order.
    pub const ALL: [Self; 7] = [
        Self::Year,
        Self::Month,
        Self::Day,
        Self::Weekday,
        Self::Hour,
        Self::Minute,
        Self::Second,
    ];

    /// Short lowercase label used in logs and lint messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Month => "month",
            Self::Day => "day",
            Self::Weekday => "weekday",
            Self::Hour => "hour",
            Self::Minute => "minute",
            Self::Second => "second",
        }
    }

    /// Derive the unit's current value and domain at `at`.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn value_at<Tz: TimeZone>(self, at: &DateTime<Tz>) -> UnitValue {
        match self {
            Self::Year => UnitValue {
                current: at.year(),
                min: None,
                max: None,
            },
            Self::Month => bounded(at.month() as i32, 1, 12),
            Self::Day => bounded(
                at.day() as i32,
                1,
                i32::from(days_in_month(at.year(), at.month())),
            ),
            Self::Weekday => bounded(at.weekday().number_from_monday() as i32, 1, 7),
            Self::Hour => bounded(at.hour() as i32, 0, 23),
            Self::Minute => bounded(at.minute() as i32, 0, 59),
            Self::Second => bounded(at.second() as i32, 0, 59),
        }
    }

    /// Human readable value of the unit at `at`, e.g. `"month 8"`.
    #[must_use]
    pub fn describe<Tz: TimeZone>(self, at: &DateTime<Tz>) -> String {
        format!("{} {}", self.label(), self.value_at(at).current)
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const fn bounded(current: i32, min: i32, max: i32) -> UnitValue {
    UnitValue {
        current,
        min: Some(min),
        max: Some(max),
    }
}

/// Gregorian leap year rule.
#[must_use]
pub const fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days in `month` (1-12) of `year`.
#[must_use]
pub const fn days_in_month(year: i32, month: u32) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        _ if is_leap_year(year) => 29,
        _ => 28,
    }
}
