//! Date and DateTime values
//!
//! A `Date` is a calendar day, a `DateTime` an instant kept as the ISO text
//! it was created from. Both carry the run's timezone tag. The tag is stored
//! and propagated, but day boundaries are always computed in UTC.

use std::fmt;
use std::sync::Arc;

use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeDelta, Utc,
};

use crate::interpreter::errors::{EvalError, EvalResult};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/* ===================== Date ===================== */

#[derive(Debug, Clone, PartialEq)]
pub struct DateValue {
    day: NaiveDate,
    timezone: Option<Arc<str>>,
}

impl DateValue {
    pub fn new(day: NaiveDate, timezone: Option<Arc<str>>) -> Self {
        Self { day, timezone }
    }

    /// Parse the leading `YYYY-MM-DD` of an ISO string
    pub fn parse(text: &str, timezone: Option<Arc<str>>) -> EvalResult<Self> {
        let head = text.get(..10).unwrap_or(text);
        let day = NaiveDate::parse_from_str(head, "%Y-%m-%d")
            .map_err(|_| EvalError::InvalidDate(text.to_string()))?;
        Ok(Self::new(day, timezone))
    }

    pub fn day(&self) -> NaiveDate {
        self.day
    }

    pub fn timezone(&self) -> Option<&str> {
        self.timezone.as_deref()
    }

    /// Shift by whole days; the fractional part is dropped
    pub fn add_days(&self, days: f64) -> EvalResult<Self> {
        let day = TimeDelta::try_days(days.trunc() as i64)
            .and_then(|delta| self.day.checked_add_signed(delta))
            .ok_or_else(|| EvalError::InvalidDate(format!("{} + {}", self.day, days)))?;
        Ok(Self::new(day, self.timezone.clone()))
    }

    /// Days from `other` to `self`
    pub fn days_since(&self, other: NaiveDate) -> f64 {
        (self.day - other).num_days() as f64
    }

    /// First millisecond of the day, in UTC
    pub fn start(&self) -> DateTimeValue {
        let instant = self.day.and_time(NaiveTime::MIN).and_utc();
        DateTimeValue::from_instant(instant.fixed_offset(), self.timezone.clone())
    }

    /// Last millisecond of the day, in UTC
    pub fn end(&self) -> DateTimeValue {
        let last = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
        let instant = self.day.and_time(last).and_utc();
        DateTimeValue::from_instant(instant.fixed_offset(), self.timezone.clone())
    }
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.day.format("%Y-%m-%d"))
    }
}

/* ===================== DateTime ===================== */

#[derive(Debug, Clone, PartialEq)]
pub struct DateTimeValue {
    text: Arc<str>,
    instant: DateTime<FixedOffset>,
    timezone: Option<Arc<str>>,
}

impl DateTimeValue {
    /// Parse ISO text, keeping it verbatim for output
    pub fn parse(text: &str, timezone: Option<Arc<str>>) -> EvalResult<Self> {
        let instant =
            parse_instant(text).ok_or_else(|| EvalError::InvalidDate(text.to_string()))?;
        Ok(Self {
            text: text.into(),
            instant,
            timezone,
        })
    }

    pub fn from_instant(instant: DateTime<FixedOffset>, timezone: Option<Arc<str>>) -> Self {
        Self {
            text: instant.to_rfc3339_opts(SecondsFormat::Millis, true).into(),
            instant,
            timezone,
        }
    }

    pub fn instant(&self) -> DateTime<FixedOffset> {
        self.instant
    }

    pub fn timezone(&self) -> Option<&str> {
        self.timezone.as_deref()
    }

    /// Calendar day of the instant, in its own offset
    pub fn date(&self) -> DateValue {
        DateValue::new(self.instant.date_naive(), self.timezone.clone())
    }

    /// Shift by a (possibly fractional) number of days
    pub fn add_days(&self, days: f64) -> EvalResult<Self> {
        let instant = TimeDelta::try_milliseconds((days * MILLIS_PER_DAY).round() as i64)
            .and_then(|delta| self.instant.checked_add_signed(delta))
            .ok_or_else(|| EvalError::InvalidDate(format!("{} + {}", self.text, days)))?;
        Ok(Self::from_instant(instant, self.timezone.clone()))
    }
}

impl fmt::Display for DateTimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// RFC 3339 first; naive forms are read as UTC
fn parse_instant(text: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Some(instant);
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc().fixed_offset());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|day| day.and_time(NaiveTime::MIN).and_utc().fixed_offset())
}

/* ===================== Clock ===================== */

/// Source of `now()` and `today()` for one program
#[derive(Debug, Clone, Default)]
pub struct Clock {
    fixed: Option<String>,
    timezone: Option<Arc<str>>,
}

impl Clock {
    pub fn new(fixed: Option<String>, timezone: Option<String>) -> Self {
        Self {
            fixed,
            timezone: timezone.map(Arc::from),
        }
    }

    pub fn timezone(&self) -> Option<Arc<str>> {
        self.timezone.clone()
    }

    pub fn now(&self) -> EvalResult<DateTimeValue> {
        match &self.fixed {
            Some(fixed) => DateTimeValue::parse(fixed, self.timezone()),
            None => Ok(DateTimeValue::from_instant(
                Utc::now().fixed_offset(),
                self.timezone(),
            )),
        }
    }

    pub fn today(&self) -> EvalResult<DateValue> {
        match &self.fixed {
            Some(fixed) => DateValue::parse(fixed, self.timezone()),
            None => Ok(DateValue::new(Utc::now().date_naive(), self.timezone())),
        }
    }
}
