use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};

/// Calendar month used as the period key of every monthly series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32, // 1..=12
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The calendar month immediately after this one.
    pub fn succ(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    /// Whole months from `self` to `other` (negative when `other` is earlier).
    pub fn months_until(&self, other: &YearMonth) -> i64 {
        (other.year as i64 - self.year as i64) * 12 + (other.month as i64 - self.month as i64)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_succ_rolls_over_year() {
        let dec = YearMonth::new(2024, 12).unwrap();
        assert_eq!(dec.succ(), YearMonth::new(2025, 1).unwrap());
        assert_eq!(YearMonth::new(2024, 3).unwrap().succ(), YearMonth::new(2024, 4).unwrap());
    }

    #[test]
    fn test_rejects_invalid_month() {
        assert!(YearMonth::new(2024, 0).is_none());
        assert!(YearMonth::new(2024, 13).is_none());
    }

    #[test]
    fn test_display_is_zero_padded() {
        assert_eq!(YearMonth::new(2024, 3).unwrap().to_string(), "2024-03");
        assert_eq!(YearMonth::new(987, 11).unwrap().to_string(), "0987-11");
    }

    #[test]
    fn test_ordering_and_distance() {
        let a = YearMonth::new(2023, 11).unwrap();
        let b = YearMonth::new(2024, 2).unwrap();
        assert!(a < b);
        assert_eq!(a.months_until(&b), 3);
        assert_eq!(b.months_until(&a), -3);
    }

    #[test]
    fn test_from_date() {
        let date = NaiveDate::from_ymd_opt(2024, 7, 31).unwrap();
        assert_eq!(YearMonth::from_date(date), YearMonth::new(2024, 7).unwrap());
    }

    #[test]
    fn test_serializes_as_label() {
        let json = serde_json::to_string(&YearMonth::new(2024, 1).unwrap()).unwrap();
        assert_eq!(json, "\"2024-01\"");
    }
}
