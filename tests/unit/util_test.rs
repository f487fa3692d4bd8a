//! Tests for utility helpers

use std::time::Duration;

use chrono::{TimeZone, Utc};
use prometheus_task_timer::util::{init_tracing, now_in, until_next_second};

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
}

#[test]
fn test_until_next_second_is_at_most_one_second() {
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 59).unwrap() + chrono::Duration::milliseconds(999);
    assert_eq!(until_next_second(&at), Duration::from_millis(1));
    assert!(until_next_second(&now_in(chrono_tz::Tz::UTC)) <= Duration::from_secs(1));
}
