// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Five-field cron expressions: `minute hour day month weekday`.
//!
//! Field forms: `*`, `N`, `A-B`, `*/N`, `A-B/N`, and comma lists of the
//! above. Expressions are validated when parsed — a job can never reach
//! the scheduler holding an invalid expression. Evaluation is in UTC.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use thiserror::Error;

/// Search horizon for the next matching minute.
const HORIZON_DAYS: i64 = 32;

/// Errors from cron expression parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CronError {
    #[error("expected 5 fields (minute hour day month weekday), got {0}")]
    FieldCount(usize),

    #[error("empty {0} field")]
    EmptyField(&'static str),

    #[error("{field} field: `{text}` is not a number")]
    NotANumber { field: &'static str, text: String },

    #[error("{field} field: {value} outside {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    #[error("{0} field: step must be positive")]
    ZeroStep(&'static str),

    #[error("{field} field: range {lo}-{hi} is inverted")]
    InvertedRange { field: &'static str, lo: u32, hi: u32 },
}

/// One alternative within a field's comma list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Part {
    Any,
    Value(u32),
    Range(u32, u32),
    Step { lo: u32, hi: u32, step: u32 },
}

impl Part {
    fn matches(self, v: u32) -> bool {
        match self {
            Part::Any => true,
            Part::Value(n) => v == n,
            Part::Range(lo, hi) => (lo..=hi).contains(&v),
            Part::Step { lo, hi, step } => (lo..=hi).contains(&v) && (v - lo) % step == 0,
        }
    }
}

/// A parsed field: any listed part may match.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Field {
    parts: Vec<Part>,
}

impl Field {
    fn matches(&self, v: u32) -> bool {
        self.parts.iter().any(|p| p.matches(v))
    }
}

/// A validated cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpr {
    minute: Field,
    hour: Field,
    day: Field,
    month: Field,
    weekday: Field,
}

impl CronExpr {
    /// Parse and validate a five-field expression.
    pub fn parse(expr: &str) -> Result<Self, CronError> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(CronError::FieldCount(fields.len()));
        }
        Ok(Self {
            minute: parse_field(fields[0], "minute", 0, 59)?,
            hour: parse_field(fields[1], "hour", 0, 23)?,
            day: parse_field(fields[2], "day", 1, 31)?,
            month: parse_field(fields[3], "month", 1, 12)?,
            // 7 is accepted as an alias for Sunday and normalized in matches()
            weekday: parse_field(fields[4], "weekday", 0, 7)?,
        })
    }

    /// Whether the expression matches the given broken-down minute.
    ///
    /// `weekday` uses 0 = Sunday.
    pub fn matches(&self, minute: u32, hour: u32, day: u32, month: u32, weekday: u32) -> bool {
        self.minute.matches(minute)
            && self.hour.matches(hour)
            && self.day.matches(day)
            && self.month.matches(month)
            && (self.weekday.matches(weekday) || (weekday == 0 && self.weekday.matches(7)))
    }

    fn matches_datetime(&self, t: DateTime<Utc>) -> bool {
        self.matches(
            t.minute(),
            t.hour(),
            t.day(),
            t.month(),
            t.weekday().num_days_from_sunday(),
        )
    }

    /// Earliest minute boundary at or after `from` (epoch ms) matching
    /// this expression. Steps minute-by-minute, bounded to 32 days;
    /// `None` when nothing matches within the horizon.
    pub fn next_after(&self, from_epoch_ms: u64) -> Option<u64> {
        let from = DateTime::<Utc>::from_timestamp_millis(from_epoch_ms as i64)?;
        // Round up to the next minute boundary unless already on one.
        let mut t = from
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))?;
        if t < from {
            t += Duration::minutes(1);
        }
        let horizon = from + Duration::days(HORIZON_DAYS);
        while t <= horizon {
            if self.matches_datetime(t) {
                return Some(t.timestamp_millis() as u64);
            }
            t += Duration::minutes(1);
        }
        None
    }
}

fn parse_field(text: &str, name: &'static str, min: u32, max: u32) -> Result<Field, CronError> {
    if text.is_empty() {
        return Err(CronError::EmptyField(name));
    }
    let mut parts = Vec::new();
    for item in text.split(',') {
        parts.push(parse_part(item, name, min, max)?);
    }
    Ok(Field { parts })
}

fn parse_part(item: &str, name: &'static str, min: u32, max: u32) -> Result<Part, CronError> {
    if item == "*" {
        return Ok(Part::Any);
    }
    if let Some((range, step)) = item.split_once('/') {
        let step = parse_number(step, name)?;
        if step == 0 {
            return Err(CronError::ZeroStep(name));
        }
        let (lo, hi) = if range == "*" {
            (min, max)
        } else {
            parse_range(range, name, min, max)?
        };
        return Ok(Part::Step { lo, hi, step });
    }
    if item.contains('-') {
        let (lo, hi) = parse_range(item, name, min, max)?;
        return Ok(Part::Range(lo, hi));
    }
    let value = parse_number(item, name)?;
    check_range(value, name, min, max)?;
    Ok(Part::Value(value))
}

fn parse_range(text: &str, name: &'static str, min: u32, max: u32) -> Result<(u32, u32), CronError> {
    let Some((lo, hi)) = text.split_once('-') else {
        // `A/N` without a dash: treat the single value as the range start.
        let lo = parse_number(text, name)?;
        check_range(lo, name, min, max)?;
        return Ok((lo, max));
    };
    let lo = parse_number(lo, name)?;
    let hi = parse_number(hi, name)?;
    check_range(lo, name, min, max)?;
    check_range(hi, name, min, max)?;
    if lo > hi {
        return Err(CronError::InvertedRange { field: name, lo, hi });
    }
    Ok((lo, hi))
}

fn parse_number(text: &str, name: &'static str) -> Result<u32, CronError> {
    text.parse()
        .map_err(|_| CronError::NotANumber { field: name, text: text.to_string() })
}

fn check_range(value: u32, name: &'static str, min: u32, max: u32) -> Result<(), CronError> {
    if value < min || value > max {
        return Err(CronError::OutOfRange { field: name, value, min, max });
    }
    Ok(())
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
