//! Tests for seven-field expressions and calendar units

use chrono::{TimeZone, Utc};
use chrono_tz::Tz;
use prometheus_task_timer::cron::{
    days_in_month, is_leap_year, is_time_hit, is_time_hit_in, lint, CronError, CronExpression,
    TimeUnit,
};
use rand::Rng;

#[test]
fn test_wrong_token_count_never_hits() {
    let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let mut rng = rand::rng();
    for _ in 0..50 {
        let n = rng.random_range(0..15);
        if n == 7 {
            continue;
        }
        let expr = vec!["*"; n].join(" ");
        assert!(!is_time_hit(&expr, &at), "{n} tokens");
    }
    assert!(is_time_hit("*  *\t* * *\n* *", &at));
}

#[test]
fn test_oversized_distribution_count_keeps_tick_fast() {
    let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let started = std::time::Instant::now();
    // step far below one month still resolves arithmetically
    assert!(is_time_hit("* 4000000000/1-12 * * * * *", &at));
    assert!(!is_time_hit("4000000000/1000000000-1000000001 * * * * * *", &at));
    assert!(started.elapsed() < std::time::Duration::from_secs(1));
}

#[test]
fn test_leap_year_day_maximum() {
    for (year, days) in [(2000, 29), (1900, 28), (2024, 29), (2023, 28)] {
        assert_eq!(days_in_month(year, 2), days, "{year}");
        let at = Utc.with_ymd_and_hms(year, 2, 10, 0, 0, 0).unwrap();
        assert_eq!(TimeUnit::Day.value_at(&at).max, Some(i32::from(days)));
    }
    assert!(is_leap_year(2000));
    assert!(!is_leap_year(1900));
}

#[test]
fn test_month_lengths() {
    for month in [1, 3, 5, 7, 8, 10, 12] {
        assert_eq!(days_in_month(2023, month), 31);
    }
    for month in [4, 6, 9, 11] {
        assert_eq!(days_in_month(2023, month), 30);
    }
}

#[test]
fn test_weekday_numbering() {
    let monday = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
    let sunday = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
    assert_eq!(TimeUnit::Weekday.value_at(&monday).current, 1);
    assert_eq!(TimeUnit::Weekday.value_at(&sunday).current, 7);

    assert!(is_time_hit("* * * 1-5 * * *", &monday));
    assert!(!is_time_hit("* * * 1-5 * * *", &sunday));
}

#[test]
fn test_fields_evaluated_in_time_zone() {
    // 2024-03-04 01:30:00 UTC is 09:30 in Shanghai
    let instant = Utc.with_ymd_and_hms(2024, 3, 4, 1, 30, 0).unwrap();
    let shanghai: Tz = "Asia/Shanghai".parse().unwrap();
    let expr = "* * * * 9-9 30-30 0-0";
    assert!(is_time_hit_in(expr, instant, shanghai));
    assert!(!is_time_hit_in(expr, instant, Tz::UTC));
}

#[test]
fn test_expression_resolution() {
    let at = Utc.with_ymd_and_hms(2024, 2, 15, 8, 0, 0).unwrap();
    let expr = CronExpression::parse("* 1,2 10/*  * 8-8 0-0 0-0", &at).unwrap();
    assert_eq!(expr.source(), "* 1,2 10/*  * 8-8 0-0 0-0");
    assert_eq!(expr.field(TimeUnit::Day).to_string(), "10/1-29");
    assert!(expr.never_units().is_empty());
    assert!(expr.matches(&at));

    assert_eq!(
        CronExpression::parse("* * *", &at).unwrap_err(),
        CronError::FieldCount(3)
    );
}

#[test]
fn test_lint_reports_silent_fields() {
    assert!(lint("* * * * * 30/0-59 *").is_empty());

    let issues = lint("2024 * * * * */2 0/*");
    let units: Vec<_> = issues.iter().map(|i| i.unit).collect();
    assert_eq!(
        units,
        vec![Some(TimeUnit::Year), Some(TimeUnit::Minute), Some(TimeUnit::Second)]
    );
    assert!(issues[2].to_string().contains("zero"));

    let whole = lint("* * *");
    assert_eq!(whole.len(), 1);
    assert!(whole[0].unit.is_none());
}
