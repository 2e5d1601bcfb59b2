//! Calendar-day identifiers.
//!
//! A day is keyed by its ISO `YYYY-MM-DD` string, which sorts the same way as
//! the dates it names. Keys are built from naive calendar arithmetic so the
//! host timezone never shifts a day across a month boundary, and a
//! (year, month, day) triple that does not exist is rejected instead of being
//! rolled into the following month.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{AppError, AppResult};

/// A validated calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    /// Build a key from a zero-based month (0 = January).
    pub fn new(year: i32, month0: u32, day: u32) -> AppResult<Self> {
        if month0 > 11 {
            return Err(AppError::Validation(format!(
                "Invalid month index {} (expected 0-11)",
                month0
            )));
        }
        let max_day = days_in_month(year, month0)?;
        if day == 0 || day > max_day {
            return Err(AppError::Validation(format!(
                "Invalid day {}: {:04}-{:02} has days 1-{}",
                day,
                year,
                month0 + 1,
                max_day
            )));
        }
        NaiveDate::from_ymd_opt(year, month0 + 1, day)
            .map(DateKey)
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "Invalid date: {:04}-{:02}-{:02}",
                    year,
                    month0 + 1,
                    day
                ))
            })
    }

    /// Parse a `YYYY-MM-DD` key. Anything else, including real-looking but
    /// nonexistent dates such as `2025-04-31`, is a validation error.
    pub fn parse(key: &str) -> AppResult<Self> {
        let invalid_format = || AppError::Validation(format!("Invalid date format: {}", key));

        let bytes = key.as_bytes();
        if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
            return Err(invalid_format());
        }
        let digits_ok = bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
        if !digits_ok {
            return Err(invalid_format());
        }

        let year: i32 = key[0..4].parse().map_err(|_| invalid_format())?;
        let month: u32 = key[5..7].parse().map_err(|_| invalid_format())?;
        let day: u32 = key[8..10].parse().map_err(|_| invalid_format())?;
        if month == 0 {
            return Err(AppError::Validation(format!(
                "Invalid date: {}. This date does not exist.",
                key
            )));
        }

        let parsed = Self::new(year, month - 1, day).map_err(|_| {
            AppError::Validation(format!("Invalid date: {}. This date does not exist.", key))
        })?;

        // Reconstruct and compare so a key can never silently name a different day.
        if parsed.to_string() != key {
            return Err(AppError::Validation(format!(
                "Invalid date: {}. This date does not exist.",
                key
            )));
        }
        Ok(parsed)
    }

    pub fn from_naive(date: NaiveDate) -> Self {
        DateKey(date)
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// Zero-based month (0 = January).
    pub fn month0(&self) -> u32 {
        self.0.month0()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    /// (year, zero-based month, day).
    pub fn parts(&self) -> (i32, u32, u32) {
        (self.year(), self.month0(), self.day())
    }

    /// Day of week, 0 = Sunday.
    pub fn weekday(&self) -> u32 {
        self.0.weekday().num_days_from_sunday()
    }

    pub fn as_naive(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl std::str::FromStr for DateKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DateKey::parse(s)
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateKey::parse(&raw).map_err(|e| serde::de::Error::custom(e.public_message()))
    }
}

/// `date_key(year, month0, day)` as a string.
pub fn date_key(year: i32, month0: u32, day: u32) -> AppResult<String> {
    DateKey::new(year, month0, day).map(|k| k.to_string())
}

/// Inverse of [`date_key`]: `(year, month0, day)`.
pub fn parse_date_key(key: &str) -> AppResult<(i32, u32, u32)> {
    DateKey::parse(key).map(|k| k.parts())
}

/// Number of days in a month (zero-based month).
pub fn days_in_month(year: i32, month0: u32) -> AppResult<u32> {
    if month0 > 11 {
        return Err(AppError::Validation(format!(
            "Invalid month index {} (expected 0-11)",
            month0
        )));
    }
    let first = NaiveDate::from_ymd_opt(year, month0 + 1, 1)
        .ok_or_else(|| AppError::Validation(format!("Year {} is out of range", year)))?;
    let next_first = if month0 == 11 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month0 + 2, 1)
    }
    .ok_or_else(|| AppError::Validation(format!("Year {} is out of range", year)))?;

    Ok((next_first - first).num_days() as u32)
}

/// Weekday of the 1st of the month, 0 = Sunday.
pub fn first_weekday(year: i32, month0: u32) -> AppResult<u32> {
    DateKey::new(year, month0, 1).map(|k| k.weekday())
}

/// First and last day of the month, inclusive.
pub fn month_range(year: i32, month0: u32) -> AppResult<(DateKey, DateKey)> {
    let last = days_in_month(year, month0)?;
    Ok((DateKey::new(year, month0, 1)?, DateKey::new(year, month0, last)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_zero_padded_keys() {
        assert_eq!(date_key(2024, 0, 31).unwrap(), "2024-01-31");
        assert_eq!(date_key(2025, 8, 5).unwrap(), "2025-09-05");
        assert_eq!(date_key(2025, 11, 31).unwrap(), "2025-12-31");
    }

    #[test]
    fn every_valid_day_round_trips() {
        for year in [1999, 2000, 2023, 2024, 2100] {
            for month0 in 0..12 {
                let n = days_in_month(year, month0).unwrap();
                for day in 1..=n {
                    let key = date_key(year, month0, day).unwrap();
                    assert_eq!(parse_date_key(&key).unwrap(), (year, month0, day));
                }
            }
        }
    }

    #[test]
    fn day_past_month_end_is_rejected_not_rolled_over() {
        for year in [2023, 2024] {
            for month0 in 0..12 {
                let n = days_in_month(year, month0).unwrap();
                for day in (n + 1)..=32 {
                    let err = date_key(year, month0, day).unwrap_err();
                    assert!(matches!(err, AppError::Validation(_)));
                }
            }
        }
        assert!(date_key(2025, 3, 0).is_err());
        assert!(date_key(2025, 12, 1).is_err());
    }

    #[test]
    fn days_in_month_handles_leap_years() {
        assert_eq!(days_in_month(2024, 1).unwrap(), 29);
        assert_eq!(days_in_month(2023, 1).unwrap(), 28);
        assert_eq!(days_in_month(1900, 1).unwrap(), 28);
        assert_eq!(days_in_month(2000, 1).unwrap(), 29);
        assert_eq!(days_in_month(2025, 3).unwrap(), 30);
        assert_eq!(days_in_month(2025, 11).unwrap(), 31);
    }

    #[test]
    fn parse_rejects_malformed_and_nonexistent_keys() {
        for bad in [
            "",
            "2025-4-01",
            "2025/04/01",
            "2025-04-01T00:00:00Z",
            "20a5-04-01",
            "2025-00-10",
            "2025-13-01",
            "2025-04-31",
            "2023-02-29",
            " 2025-04-01",
        ] {
            assert!(DateKey::parse(bad).is_err(), "{bad} should be rejected");
        }
        assert!(DateKey::parse("2024-02-29").is_ok());
    }

    #[test]
    fn first_weekday_is_sunday_based() {
        // 1 June 2025 was a Sunday, 1 March 2025 a Saturday.
        assert_eq!(first_weekday(2025, 5).unwrap(), 0);
        assert_eq!(first_weekday(2025, 2).unwrap(), 6);
    }

    #[test]
    fn month_range_covers_whole_month() {
        let (start, end) = month_range(2024, 1).unwrap();
        assert_eq!(start.to_string(), "2024-02-01");
        assert_eq!(end.to_string(), "2024-02-29");
        assert!(start < end);
    }

    #[test]
    fn serde_uses_the_key_string() {
        let key = DateKey::new(2025, 2, 5).unwrap();
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"2025-03-05\"");
        let back: DateKey = serde_json::from_str("\"2025-03-05\"").unwrap();
        assert_eq!(back, key);
        assert!(serde_json::from_str::<DateKey>("\"2025-02-30\"").is_err());
    }
}
