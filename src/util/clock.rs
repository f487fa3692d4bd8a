//! Wall-clock helpers.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// Current time in `tz`.
#[must_use]
pub fn now_in(tz: Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(&tz)
}

/// Time left until the next whole second after `now`.
#[must_use]
pub fn until_next_second<Z: TimeZone>(now: &DateTime<Z>) -> Duration {
    let nanos = now.nanosecond() % 1_000_000_000;
    Duration::from_nanos(u64::from(1_000_000_000 - nanos))
}
