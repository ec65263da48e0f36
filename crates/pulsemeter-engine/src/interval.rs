//! Day-aligned interval arithmetic
//!
//! Usage queries address whole calendar days counted back from "today".
//! Spans accept a plain day count or `<integer><unit>` with unit d/w/m/y
//! and fixed multipliers 1/7/30/365. The month and year multipliers are
//! intentionally calendar-naive; downstream callers rely on the fixed
//! values.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use tracing::error;

use pulsemeter_common::IntervalError;

/// Days per week span unit
const DAYS_PER_WEEK: i64 = 7;

/// Days per month span unit (fixed, not calendar-aware)
const DAYS_PER_MONTH: i64 = 30;

/// Days per year span unit (fixed, not calendar-aware)
const DAYS_PER_YEAR: i64 = 365;

/// Span input: a plain day count or a `<integer><unit>` spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanArg {
    Days(i64),
    Spec(String),
}

impl From<i64> for SpanArg {
    fn from(days: i64) -> Self {
        SpanArg::Days(days)
    }
}

impl From<&str> for SpanArg {
    fn from(spec: &str) -> Self {
        SpanArg::Spec(spec.to_string())
    }
}

impl From<String> for SpanArg {
    fn from(spec: String) -> Self {
        SpanArg::Spec(spec)
    }
}

impl SpanArg {
    /// Resolve to a whole number of days
    pub fn days(&self) -> Result<i64, IntervalError> {
        match self {
            SpanArg::Days(days) => Ok(*days),
            SpanArg::Spec(spec) => parse_spec(spec),
        }
    }
}

fn parse_spec(spec: &str) -> Result<i64, IntervalError> {
    let invalid = || IntervalError::InvalidSpan(spec.to_string());
    let (digits, multiplier) = match spec.chars().last() {
        Some('d') => (&spec[..spec.len() - 1], 1),
        Some('w') => (&spec[..spec.len() - 1], DAYS_PER_WEEK),
        Some('m') => (&spec[..spec.len() - 1], DAYS_PER_MONTH),
        Some('y') => (&spec[..spec.len() - 1], DAYS_PER_YEAR),
        Some(_) => (spec, 1),
        None => return Err(invalid()),
    };
    let count: i64 = digits.parse().map_err(|_| invalid())?;
    count
        .checked_mul(multiplier)
        .ok_or(IntervalError::OutOfRange { days: count })
}

/// Day-aligned query window
///
/// Starts at 00:00:00.000 of its start day and ends at 23:59:59.999 of its
/// end day, both UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl UsageInterval {
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Window start in UTC milliseconds
    pub fn start_ms(&self) -> i64 {
        self.start.timestamp_millis()
    }

    /// Window end in UTC milliseconds
    pub fn end_ms(&self) -> i64 {
        self.end.timestamp_millis()
    }
}

/// Resolve `start` and `length` against `today` into a full-day window
///
/// The window covers exactly `length` calendar days and ends `start` days
/// before today, inclusive, day-aligned regardless of the time of day at
/// query time. Malformed spans and out-of-range dates are logged and
/// returned as errors.
pub fn fullday_interval(
    today: NaiveDate,
    start: &SpanArg,
    length: &SpanArg,
) -> Result<UsageInterval, IntervalError> {
    let start_days = resolved_days(start)?;
    let length_days = resolved_days(length)?;
    let end_days = start_days - (length_days - 1);

    let start_date = shift_back(today, start_days)?;
    let end_date = shift_back(today, end_days)?;

    let start = start_date.and_time(NaiveTime::MIN).and_utc();
    let end = end_date
        .succ_opt()
        .ok_or(IntervalError::OutOfRange { days: end_days })?
        .and_time(NaiveTime::MIN)
        .and_utc()
        - Duration::milliseconds(1);

    Ok(UsageInterval { start, end })
}

fn resolved_days(arg: &SpanArg) -> Result<i64, IntervalError> {
    arg.days().map_err(|err| {
        error!(%err, "Usage interval rejected");
        err
    })
}

fn shift_back(today: NaiveDate, days: i64) -> Result<NaiveDate, IntervalError> {
    let delta = Duration::try_days(days).ok_or(IntervalError::OutOfRange { days })?;
    today
        .checked_sub_signed(delta)
        .ok_or(IntervalError::OutOfRange { days })
}
