//! Single-field grammar classification and hit testing.
//!
//! A field token is matched against six grammars, in order:
//!
//! | Token          | Field                                  |
//! |----------------|----------------------------------------|
//! | `*`            | [`CronField::Any`]                     |
//! | `v1,v2,...`    | [`CronField::Points`]                  |
//! | `a-b`          | [`CronField::Range`]                   |
//! | `n/*`          | [`CronField::Distributed`] over domain |
//! | `n/a-b`        | [`CronField::Distributed`] over `a-b`  |
//! | `v1,v2/a-b`    | [`CronField::DistributedFiltered`]     |
//!
//! Anything else, and every degenerate form, resolves to [`CronField::Never`].

use std::collections::BTreeSet;
use std::fmt;

/// Grammar a raw token belongs to, before it is resolved against a domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSyntax {
    /// `*`
    Any,
    /// `v1,v2,...` with at least two values.
    Points(Vec<i32>),
    /// `a-b`
    Range(i32, i32),
    /// `n/*`
    Times(u32),
    /// `n/a-b`
    RangeTimes(u32, i32, i32),
    /// `v1,v2,.../a-b`
    RangePoints(Vec<i32>, i32, i32),
    /// Matches none of the grammars, or a number failed to parse.
    Invalid,
}

impl FieldSyntax {
    /// Classify a token. First matching grammar wins.
    #[must_use]
    pub fn classify(token: &str) -> Self {
        let token = token.trim();
        if token == "*" {
            return Self::Any;
        }
        if let Some(points) = parse_points(token) {
            return Self::Points(points);
        }
        if let Some((lo, hi)) = parse_range(token) {
            return Self::Range(lo, hi);
        }

        let Some((head, tail)) = token.split_once('/') else {
            return Self::Invalid;
        };

        if tail == "*" {
            return parse_uint(head).map_or(Self::Invalid, Self::Times);
        }
        let Some((lo, hi)) = parse_range(tail) else {
            return Self::Invalid;
        };
        if let Some(count) = parse_uint(head) {
            return Self::RangeTimes(count, lo, hi);
        }
        parse_points(head).map_or(Self::Invalid, |points| Self::RangePoints(points, lo, hi))
    }
}

/// One parsed time-unit expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CronField {
    /// Matches every value.
    Any,
    /// Matches only the listed values.
    Points(BTreeSet<i32>),
    /// Matches every value in `min..=max`. A reversed range matches nothing.
    Range {
        /// Lower bound, inclusive.
        min: i32,
        /// Upper bound, inclusive.
        max: i32,
    },
    /// `count` evenly spread hit points across `min..=max`.
    Distributed {
        /// Requested number of hits.
        count: u32,
        /// Start of the distribution range.
        min: i32,
        /// End of the distribution range.
        max: i32,
    },
    /// Listed points restricted to `min..=max`.
    DistributedFiltered {
        /// Listed points that fall inside the range.
        points: BTreeSet<i32>,
        /// Lower bound, inclusive.
        min: i32,
        /// Upper bound, inclusive.
        max: i32,
    },
    /// Matches nothing.
    Never,
}

impl CronField {
    /// Parse `token` against the unit domain `[domain_min, domain_max]`.
    ///
    /// Domain bounds only matter for `n/*`; an absent or zero bound makes it
    /// [`CronField::Never`]. Malformed tokens never error, they resolve to
    /// [`CronField::Never`].
    #[must_use]
    pub fn parse(token: &str, domain_min: Option<i32>, domain_max: Option<i32>) -> Self {
        Self::resolve(FieldSyntax::classify(token), domain_min, domain_max)
    }

    /// Resolve an already classified token against a unit domain.
    #[must_use]
    pub fn resolve(syntax: FieldSyntax, domain_min: Option<i32>, domain_max: Option<i32>) -> Self {
        match syntax {
            FieldSyntax::Any => Self::Any,
            FieldSyntax::Points(points) => Self::Points(points.into_iter().collect()),
            FieldSyntax::Range(min, max) => Self::Range { min, max },
            FieldSyntax::Times(count) => {
                // a zero bound counts as absent
                match (domain_min, domain_max) {
                    (Some(min), Some(max)) if count > 0 && min != 0 && max != 0 => {
                        Self::distributed(count, min, max)
                    }
                    _ => Self::Never,
                }
            }
            FieldSyntax::RangeTimes(count, min, max) => {
                if count == 0 || max == 0 || max < min {
                    Self::Never
                } else {
                    Self::distributed(count, min, max)
                }
            }
            FieldSyntax::RangePoints(points, min, max) => {
                if max < min {
                    return Self::Never;
                }
                let points = points
                    .into_iter()
                    .filter(|p| (min..=max).contains(p))
                    .collect();
                Self::DistributedFiltered { points, min, max }
            }
            FieldSyntax::Invalid => Self::Never,
        }
    }

    const fn distributed(count: u32, min: i32, max: i32) -> Self {
        Self::Distributed { count, min, max }
    }

    /// Whether `value` is a hit for this field.
    #[must_use]
    pub fn hit(&self, value: i32) -> bool {
        match self {
            Self::Never => false,
            Self::Any => true,
            Self::Points(points) | Self::DistributedFiltered { points, .. } => {
                points.contains(&value)
            }
            Self::Range { min, max } => *min <= value && value <= *max,
            Self::Distributed { count, min, max } => {
                distribution(*count, *min, *max).contains(value)
            }
        }
    }

    /// True for [`CronField::Never`].
    #[must_use]
    pub const fn is_never(&self) -> bool {
        matches!(self, Self::Never)
    }
}

impl fmt::Display for CronField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "*"),
            Self::Points(points) => write!(f, "{}", join(points)),
            Self::Range { min, max } => write!(f, "{min}-{max}"),
            Self::Distributed { count, min, max, .. } => write!(f, "{count}/{min}-{max}"),
            Self::DistributedFiltered { points, min, max } => {
                write!(f, "{}/{min}-{max}", join(points))
            }
            Self::Never => write!(f, "!"),
        }
    }
}

/// Generate the distribution sequence for `count` hits over `min..=max`.
///
/// Point `k` is `min + k * step` truncated, with `step = (max - min + 1) / count`,
/// while the untruncated value stays at or below `max`. The sequence is lazy and computed
/// in exact integer arithmetic, so a huge `count` costs nothing until
/// consumed. When `count` exceeds the span, points repeat and the upper bound
/// can be missed.
#[must_use]
pub fn distribution(count: u32, min: i32, max: i32) -> Distribution {
    let count = i128::from(count);
    let span = i128::from(max) - i128::from(min) + 1;
    let last = if count == 0 || span <= 0 {
        -1
    } else {
        count * (span - 1) / span
    };
    Distribution {
        count: count.max(1),
        min,
        span,
        next: 0,
        last,
    }
}

/// Lazy distribution sequence returned by [`distribution`].
#[derive(Debug, Clone)]
pub struct Distribution {
    count: i128,
    min: i32,
    span: i128,
    next: i128,
    // inclusive, -1 when empty
    last: i128,
}

impl Distribution {
    /// Whether `value` is one of the points, without walking the sequence.
    #[must_use]
    pub fn contains(&self, value: i32) -> bool {
        let offset = i128::from(value) - i128::from(self.min);
        if self.last < 0 || offset < 0 {
            return false;
        }
        // smallest k whose point is at least `value`
        let k = (offset * self.count + self.span - 1) / self.span;
        k <= self.last && k * self.span < (offset + 1) * self.count
    }

    fn point(&self, k: i128) -> i32 {
        let point = i128::from(self.min) + k * self.span / self.count;
        i32::try_from(point).unwrap_or(i32::MAX)
    }
}

impl Iterator for Distribution {
    type Item = i32;

    fn next(&mut self) -> Option<i32> {
        if self.next > self.last {
            return None;
        }
        let point = self.point(self.next);
        self.next += 1;
        Some(point)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.last - self.next + 1).max(0);
        usize::try_from(remaining).map_or((usize::MAX, None), |n| (n, Some(n)))
    }
}

fn join(points: &BTreeSet<i32>) -> String {
    points
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn parse_int(s: &str) -> Option<i32> {
    if is_digits(s) {
        s.parse().ok()
    } else {
        None
    }
}

fn parse_uint(s: &str) -> Option<u32> {
    if is_digits(s) {
        s.parse().ok()
    } else {
        None
    }
}

/// `v1,v2,...` with at least two values.
fn parse_points(s: &str) -> Option<Vec<i32>> {
    if !s.contains(',') {
        return None;
    }
    s.split(',').map(parse_int).collect()
}

/// `a-b`
fn parse_range(s: &str) -> Option<(i32, i32)> {
    let (lo, hi) = s.split_once('-')?;
    Some((parse_int(lo)?, parse_int(hi)?))
}
