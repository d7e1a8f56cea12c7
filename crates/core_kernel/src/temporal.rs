//! Validity windows and local-date handling
//!
//! Business rules carry a validity window and proposals expire on a local
//! calendar date, so both need explicit time semantics.

use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use thiserror::Error;

/// Timezone wrapper for the brokerage's operating jurisdiction
///
/// Wraps chrono_tz::Tz with string serialization (`"America/Sao_Paulo"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timezone(pub Tz);

impl Serialize for Timezone {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.0.name())
    }
}

impl<'de> Deserialize<'de> for Timezone {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Timezone::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl Timezone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// Parses an IANA timezone name
    pub fn parse(name: &str) -> Result<Self, TemporalError> {
        Tz::from_str(name)
            .map(Timezone)
            .map_err(|_| TemporalError::UnknownTimezone(name.to_string()))
    }

    /// Calendar date of a UTC instant in this timezone
    pub fn local_date(&self, utc: DateTime<Utc>) -> NaiveDate {
        utc.with_timezone(&self.0).date_naive()
    }

    /// Local date of `utc` plus a number of calendar days
    pub fn date_after_days(&self, utc: DateTime<Utc>, days: u32) -> Result<NaiveDate, TemporalError> {
        self.local_date(utc)
            .checked_add_days(Days::new(u64::from(days)))
            .ok_or(TemporalError::DateOutOfRange { days })
    }
}

impl Default for Timezone {
    fn default() -> Self {
        Self(chrono_tz::America::Sao_Paulo)
    }
}

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid period: start {start} must be before end {end}")]
    InvalidPeriod {
        start: String,
        end: String,
    },

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("Date {days} days ahead is out of range")]
    DateOutOfRange { days: u32 },
}

/// A validity window: start inclusive, end exclusive, `None` means open-ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidPeriod {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl ValidPeriod {
    /// Creates a new valid period
    pub fn new(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Result<Self, TemporalError> {
        if let Some(end) = end {
            if start >= end {
                return Err(TemporalError::InvalidPeriod {
                    start: start.to_string(),
                    end: end.to_string(),
                });
            }
        }
        Ok(Self { start, end })
    }

    /// Creates an unbounded period starting from the given time
    pub fn from(start: DateTime<Utc>) -> Self {
        Self { start, end: None }
    }

    /// A period covering all time
    pub fn always() -> Self {
        Self {
            start: DateTime::<Utc>::MIN_UTC,
            end: None,
        }
    }

    /// Creates a bounded period
    pub fn bounded(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TemporalError> {
        Self::new(start, Some(end))
    }

    /// Returns true if this period contains the given timestamp
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start && self.end.map_or(true, |e| timestamp < e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_period_contains_is_half_open() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap();
        let period = ValidPeriod::bounded(start, end).unwrap();

        assert!(period.contains(start));
        assert!(!period.contains(end));
        assert!(!period.contains(start - Duration::seconds(1)));
    }

    #[test]
    fn test_inverted_period_is_rejected() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(matches!(
            ValidPeriod::bounded(start, end),
            Err(TemporalError::InvalidPeriod { .. })
        ));
    }

    #[test]
    fn test_always_contains_now() {
        assert!(ValidPeriod::always().contains(Utc::now()));
    }

    #[test]
    fn test_local_date_crosses_midnight() {
        // 01:30 UTC is still the previous evening in Sao Paulo (UTC-3)
        let utc = Utc.with_ymd_and_hms(2024, 3, 10, 1, 30, 0).unwrap();
        let tz = Timezone::default();
        assert_eq!(tz.local_date(utc), NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        assert_eq!(
            tz.date_after_days(utc, 30),
            Ok(NaiveDate::from_ymd_opt(2024, 4, 8).unwrap())
        );
    }

    #[test]
    fn test_date_after_days_overflow_is_an_error() {
        let utc = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        assert_eq!(
            Timezone::default().date_after_days(utc, u32::MAX),
            Err(TemporalError::DateOutOfRange { days: u32::MAX })
        );
    }

    #[test]
    fn test_timezone_parse() {
        assert!(Timezone::parse("America/Sao_Paulo").is_ok());
        assert!(matches!(
            Timezone::parse("Mars/Olympus"),
            Err(TemporalError::UnknownTimezone(_))
        ));
    }
}
