//! Seven-field expressions and timestamp evaluation.

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

use super::field::{CronField, FieldSyntax};
use super::unit::TimeUnit;

/// Number of fields in an expression.
pub const FIELD_COUNT: usize = 7;

/// Errors raised by the strict [`CronExpression::parse`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CronError {
    /// The expression does not split into seven fields.
    #[error("expected 7 fields, found {0}")]
    FieldCount(usize),
}

/// Test whether `at` matches the seven-field expression `expr`.
///
/// Fields are evaluated in expression order and evaluation stops at the first
/// field that misses. An expression that does not split into exactly seven
/// whitespace separated tokens never matches.
#[must_use]
pub fn is_time_hit<Z: TimeZone>(expr: &str, at: &DateTime<Z>) -> bool {
    let tokens: Vec<&str> = expr.split_whitespace().collect();
    if tokens.len() != FIELD_COUNT {
        return false;
    }
    TimeUnit::ALL.iter().zip(tokens).all(|(unit, token)| {
        let value = unit.value_at(at);
        CronField::parse(token, value.min, value.max).hit(value.current)
    })
}

/// [`is_time_hit`] for a UTC instant viewed in `tz`.
#[must_use]
pub fn is_time_hit_in(expr: &str, instant: DateTime<Utc>, tz: Tz) -> bool {
    is_time_hit(expr, &instant.with_timezone(&tz))
}

/// An expression whose seven fields are resolved against one instant.
///
/// Day-of-month resolution depends on the month, so a resolved expression
/// is only meaningful for instants sharing the same calendar month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpression {
    source: String,
    fields: [CronField; FIELD_COUNT],
}

impl CronExpression {
    /// Resolve every field of `expr` against the domains at `at`.
    ///
    /// # Errors
    ///
    /// Returns [`CronError::FieldCount`] if `expr` does not have seven fields.
    pub fn parse<Z: TimeZone>(expr: &str, at: &DateTime<Z>) -> Result<Self, CronError> {
        let tokens: Vec<&str> = expr.split_whitespace().collect();
        if tokens.len() != FIELD_COUNT {
            return Err(CronError::FieldCount(tokens.len()));
        }
        let fields = TimeUnit::ALL.map(|unit| {
            let value = unit.value_at(at);
            CronField::parse(tokens[unit as usize], value.min, value.max)
        });
        Ok(Self {
            source: expr.trim().to_string(),
            fields,
        })
    }

    /// Original expression text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Resolved fields in expression order.
    #[must_use]
    pub const fn fields(&self) -> &[CronField; FIELD_COUNT] {
        &self.fields
    }

    /// Resolved field for one unit.
    #[must_use]
    pub fn field(&self, unit: TimeUnit) -> &CronField {
        &self.fields[unit as usize]
    }

    /// Whether every field hits the corresponding unit value at `at`.
    #[must_use]
    pub fn matches<Z: TimeZone>(&self, at: &DateTime<Z>) -> bool {
        TimeUnit::ALL
            .iter()
            .zip(&self.fields)
            .all(|(unit, field)| field.hit(unit.value_at(at).current))
    }

    /// Units whose field resolved to [`CronField::Never`].
    #[must_use]
    pub fn never_units(&self) -> Vec<TimeUnit> {
        TimeUnit::ALL
            .iter()
            .zip(&self.fields)
            .filter(|(_, field)| field.is_never())
            .map(|(unit, _)| *unit)
            .collect()
    }
}

impl fmt::Display for CronExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.fields.iter().map(ToString::to_string).collect();
        f.write_str(&rendered.join(" "))
    }
}

/// A reason one field of an expression can never fire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    /// Offending unit, `None` when the whole expression is malformed.
    pub unit: Option<TimeUnit>,
    /// Raw token, empty for whole-expression issues.
    pub token: String,
    /// What is wrong.
    pub reason: &'static str,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            Some(unit) => write!(f, "{unit} `{}`: {}", self.token, self.reason),
            None => f.write_str(self.reason),
        }
    }
}

/// Report every field of `expr` that can never fire, independent of time.
///
/// An empty result means the expression is well formed; it may still match
/// rarely or never because of how its fields combine.
#[must_use]
pub fn lint(expr: &str) -> Vec<FieldIssue> {
    let tokens: Vec<&str> = expr.split_whitespace().collect();
    if tokens.len() != FIELD_COUNT {
        return vec![FieldIssue {
            unit: None,
            token: String::new(),
            reason: "expression must have exactly 7 fields",
        }];
    }

    TimeUnit::ALL
        .iter()
        .zip(tokens)
        .filter_map(|(unit, token)| {
            syntax_issue(*unit, &FieldSyntax::classify(token)).map(|reason| FieldIssue {
                unit: Some(*unit),
                token: token.to_string(),
                reason,
            })
        })
        .collect()
}

fn syntax_issue(unit: TimeUnit, syntax: &FieldSyntax) -> Option<&'static str> {
    match syntax {
        FieldSyntax::Invalid => Some("unrecognised field syntax"),
        FieldSyntax::Times(0) | FieldSyntax::RangeTimes(0, _, _) => Some("hit count is zero"),
        FieldSyntax::Times(_) => match unit {
            TimeUnit::Year => Some("distribution needs a bounded domain"),
            TimeUnit::Hour | TimeUnit::Minute | TimeUnit::Second => {
                Some("distribution over a zero-based domain never fires")
            }
            _ => None,
        },
        FieldSyntax::RangeTimes(_, min, max) if *max == 0 || max < min => {
            Some("distribution range is empty")
        }
        FieldSyntax::RangePoints(_, min, max) if max < min => Some("filter range is empty"),
        FieldSyntax::Range(min, max) if max < min => Some("range is reversed"),
        _ => None,
    }
}
