#![forbid(unsafe_code)]

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContractViolation {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: &'static str,
    },
    #[error("{field} out of range [{min}, {max}]: got {got}")]
    InvalidRange {
        field: &'static str,
        min: f64,
        max: f64,
        got: f64,
    },
    #[error("{field} must be finite")]
    NotFinite { field: &'static str },
    #[error("invalid format for {field}: {detail}")]
    InvalidFormat { field: &'static str, detail: String },
}

pub trait Validate {
    fn validate(&self) -> Result<(), ContractViolation>;
}

/// Identifiers become part of state keys, so they are restricted to
/// printable ASCII without whitespace.
pub fn validate_id(field: &'static str, s: &str, max_len: usize) -> Result<(), ContractViolation> {
    if s.trim().is_empty() {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must not be empty",
        });
    }
    if s.len() > max_len {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "too long",
        });
    }
    if !s.chars().all(|c| c.is_ascii_graphic()) {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must be printable ASCII without whitespace",
        });
    }
    Ok(())
}

pub fn validate_text(field: &'static str, s: &str, max_len: usize) -> Result<(), ContractViolation> {
    if s.trim().is_empty() {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must not be empty",
        });
    }
    if s.len() > max_len {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "too long",
        });
    }
    Ok(())
}

pub fn parse_timestamp(field: &'static str, s: &str) -> Result<DateTime<Utc>, ContractViolation> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ContractViolation::InvalidFormat {
            field,
            detail: format!("expected RFC 3339 timestamp: {e}"),
        })
}

/// Inclusive time window. An absent bound leaves that side open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Accepts `YYYY-MM-DD` or RFC 3339 for either bound. A date-only end
    /// bound covers the whole of that day.
    pub fn parse(start: &str, end: &str) -> Result<Self, ContractViolation> {
        let start = parse_bound("date_range.start", start, BoundSide::Start)?;
        let end = parse_bound("date_range.end", end, BoundSide::End)?;
        let r = Self { start, end };
        r.validate()?;
        Ok(r)
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| t >= s) && self.end.map_or(true, |e| t <= e)
    }
}

impl Validate for DateRange {
    fn validate(&self) -> Result<(), ContractViolation> {
        if let (Some(s), Some(e)) = (self.start, self.end) {
            if s > e {
                return Err(ContractViolation::InvalidValue {
                    field: "date_range",
                    reason: "start must not be after end",
                });
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum BoundSide {
    Start,
    End,
}

fn parse_bound(
    field: &'static str,
    s: &str,
    side: BoundSide,
) -> Result<Option<DateTime<Utc>>, ContractViolation> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    if let Ok(day) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let time = match side {
            BoundSide::Start => NaiveTime::from_hms_opt(0, 0, 0),
            BoundSide::End => NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999),
        }
        .ok_or(ContractViolation::InvalidValue {
            field,
            reason: "day boundary unavailable",
        })?;
        return Ok(Some(day.and_time(time).and_utc()));
    }
    parse_timestamp(field, s).map(Some)
}
