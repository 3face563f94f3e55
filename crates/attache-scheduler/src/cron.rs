//! A small five-field cron matcher.
//!
//! Supports `*`, single values, comma lists, and `a-b` ranges in each of the
//! five fields (minute, hour, day of month, month, day of week). That covers
//! the expressions reminders actually use without pulling in a full cron
//! engine.

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::error::{Result, SchedulerError};

/// One cron field, either a wildcard or an explicit set of allowed values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Any,
    Values(Vec<u32>),
}

impl Field {
    fn matches(&self, value: u32) -> bool {
        match self {
            Field::Any => true,
            Field::Values(values) => values.contains(&value),
        }
    }
}

/// A parsed five-field cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpr {
    pub minute: Field,
    pub hour: Field,
    pub day_of_month: Field,
    pub month: Field,
    pub day_of_week: Field,
}

impl CronExpr {
    /// Parses an expression like `0 9 * * 1-5`.
    pub fn parse(expr: &str) -> Result<Self> {
        let parts: Vec<&str> = expr.split_whitespace().collect();
        if parts.len() != 5 {
            return Err(SchedulerError::InvalidCron(format!(
                "expected 5 fields, got {} in {:?}",
                parts.len(),
                expr
            )));
        }

        Ok(Self {
            minute: parse_field(parts[0], 0, 59)?,
            hour: parse_field(parts[1], 0, 23)?,
            day_of_month: parse_field(parts[2], 1, 31)?,
            month: parse_field(parts[3], 1, 12)?,
            day_of_week: parse_field(parts[4], 0, 6)?,
        })
    }

    /// Whether the expression matches the given instant, to minute precision.
    pub fn matches(&self, at: DateTime<Utc>) -> bool {
        self.minute.matches(at.minute())
            && self.hour.matches(at.hour())
            && self.day_of_month.matches(at.day())
            && self.month.matches(at.month())
            && self.day_of_week.matches(at.weekday().num_days_from_sunday())
    }
}

fn parse_field(part: &str, min: u32, max: u32) -> Result<Field> {
    if part == "*" {
        return Ok(Field::Any);
    }

    let mut values = Vec::new();
    for piece in part.split(',') {
        if let Some((start, end)) = piece.split_once('-') {
            let start = parse_value(start, min, max)?;
            let end = parse_value(end, min, max)?;
            if start > end {
                return Err(SchedulerError::InvalidCron(format!(
                    "descending range {:?}",
                    piece
                )));
            }
            values.extend(start..=end);
        } else {
            values.push(parse_value(piece, min, max)?);
        }
    }
    Ok(Field::Values(values))
}

fn parse_value(piece: &str, min: u32, max: u32) -> Result<u32> {
    let value: u32 = piece
        .parse()
        .map_err(|_| SchedulerError::InvalidCron(format!("bad field value {:?}", piece)))?;
    if value < min || value > max {
        return Err(SchedulerError::InvalidCron(format!(
            "value {} out of range {}-{}",
            value, min, max
        )));
    }
    Ok(value)
}
