//! Tests for single-field parsing and hit testing

use prometheus_task_timer::cron::{distribution, CronField, FieldSyntax};
use rand::Rng;

#[test]
fn test_range_hits_exactly_its_bounds() {
    let mut rng = rand::rng();
    for _ in 0..200 {
        let a = rng.random_range(0..60);
        let b = rng.random_range(a..60);
        let field = CronField::parse(&format!("{a}-{b}"), Some(0), Some(59));
        assert_eq!(field, CronField::Range { min: a, max: b });

        for v in -5..70 {
            assert_eq!(field.hit(v), (a..=b).contains(&v), "{a}-{b} at {v}");
        }
    }
}

#[test]
fn test_reversed_range_hits_nothing() {
    let field = CronField::parse("10-3", Some(0), Some(59));
    assert!((0..60).all(|v| !field.hit(v)));
}

#[test]
fn test_distribution_yields_requested_points() {
    let mut rng = rand::rng();
    for _ in 0..200 {
        let min = rng.random_range(1..20);
        let max = rng.random_range(min..min + 40);
        let span = u32::try_from(max - min + 1).unwrap();
        // once count exceeds the span the float step is below one and the
        // sequence stops short of `count`
        let count = rng.random_range(1..=span);

        let points: Vec<_> = distribution(count, min, max).collect();
        assert_eq!(points.len(), count as usize, "{count}/{min}-{max}");
        assert_eq!(points[0], min);
        assert!(points.windows(2).all(|w| w[0] <= w[1]));
        assert!(points.iter().all(|p| *p <= max));
    }
}

#[test]
fn test_distributed_over_unit_domain() {
    let field = CronField::parse("4/*", Some(1), Some(12));
    match &field {
        CronField::Distributed { count, min, max } => {
            assert_eq!((*count, *min, *max), (4, 1, 12));
        }
        other => panic!("expected distributed field, got {other:?}"),
    }
    let hits: Vec<_> = (1..=12).filter(|m| field.hit(*m)).collect();
    assert_eq!(hits, [1, 4, 7, 10]);
}

#[test]
fn test_distribution_over_zero_or_absent_domain_never_fires() {
    // hour/minute/second domains start at zero
    assert!(CronField::parse("2/*", Some(0), Some(59)).is_never());
    // year has no domain
    assert!(CronField::parse("2/*", None, None).is_never());
}

#[test]
fn test_zero_count_is_never() {
    let mut rng = rand::rng();
    for token in ["0/*", "0/0-59", "0/1-31"] {
        let field = CronField::parse(token, Some(1), Some(31));
        assert!(field.is_never(), "{token}");
        for _ in 0..100 {
            assert!(!field.hit(rng.random_range(-1000..1000)));
        }
    }
}

#[test]
fn test_any_hits_every_integer() {
    let field = CronField::parse("*", Some(1), Some(12));
    let mut rng = rand::rng();
    for _ in 0..500 {
        assert!(field.hit(rng.random()));
    }
    assert!(field.hit(i32::MIN));
    assert!(field.hit(-1));
}

#[test]
fn test_points_filtered_to_range() {
    let field = CronField::parse("5,10,15,40/8-20", Some(0), Some(59));
    assert_eq!(field.to_string(), "10,15/8-20");
    assert!(field.hit(10));
    assert!(!field.hit(5));
    assert!(!field.hit(40));
    assert!(CronField::parse("5,10/20-8", Some(0), Some(59)).is_never());
}

#[test]
fn test_star_slash_step_is_not_a_grammar() {
    assert_eq!(FieldSyntax::classify("*/2"), FieldSyntax::Invalid);
    assert!(CronField::parse("*/2", Some(0), Some(59)).is_never());
}
