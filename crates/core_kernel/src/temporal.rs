//! Accounting dates and the shop timezone
//!
//! Journal batches carry a calendar date, not an instant. Source records from
//! the shop application are timestamped in UTC, so the ledger converts them to
//! the shop's local calendar before posting; a sale rung up at 00:30 local
//! time belongs to that local day even though it is still "yesterday" in UTC.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use std::fmt;
use std::str::FromStr;

/// Timezone wrapper for the shop's accounting calendar
///
/// Wraps chrono_tz::Tz with string serialization (`"Asia/Kolkata"`).
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
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl FromStr for Timezone {
    type Err = TemporalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tz::from_str(s)
            .map(Timezone)
            .map_err(|_| TemporalError::UnknownTimezone(s.to_string()))
    }
}

impl fmt::Display for Timezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.name())
    }
}

impl Timezone {
    /// The shop's home timezone, used when nothing else is configured.
    pub fn shop_default() -> Self {
        Self(chrono_tz::Asia::Kolkata)
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Local calendar date of an instant
    pub fn accounting_date(&self, utc: DateTime<Utc>) -> NaiveDate {
        utc.with_timezone(&self.0).date_naive()
    }

    /// Today's local calendar date
    pub fn today(&self) -> NaiveDate {
        self.accounting_date(Utc::now())
    }
}

impl Default for Timezone {
    fn default() -> Self {
        Self(chrono_tz::UTC)
    }
}

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid period: start {start} must not be after end {end}")]
    InvalidPeriod {
        start: String,
        end: String,
    },

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),
}

/// An inclusive range of accounting dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, TemporalError> {
        if start > end {
            return Err(TemporalError::InvalidPeriod {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_accounting_date_crosses_midnight_in_local_time() {
        let tz = Timezone::shop_default();
        // 19:00 UTC is 00:30 the next day in Kolkata (UTC+05:30)
        let instant = Utc.with_ymd_and_hms(2024, 3, 31, 19, 0, 0).unwrap();
        assert_eq!(tz.accounting_date(instant), NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let d1 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let range = DateRange::new(d1, d2).unwrap();
        assert!(range.contains(d1));
        assert!(range.contains(d2));
        assert!(!range.contains(d2.succ_opt().unwrap()));
    }
}
