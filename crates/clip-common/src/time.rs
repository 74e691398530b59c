//! Acquisition time range handling.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A closed date interval for catalog queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimeRange {
    /// Create a time range; `end` defaults to today (UTC) when absent.
    pub fn new(start: NaiveDate, end: Option<NaiveDate>) -> Self {
        Self {
            start,
            end: end.unwrap_or_else(|| Utc::now().date_naive()),
        }
    }

    /// Format as a STAC API datetime interval: "YYYY-MM-DD/YYYY-MM-DD".
    pub fn as_stac_datetime(&self) -> String {
        format!("{}/{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stac_datetime_format() {
        let range = TimeRange::new(
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            Some(NaiveDate::from_ymd_opt(2023, 1, 31).unwrap()),
        );
        assert_eq!(range.as_stac_datetime(), "2023-01-01/2023-01-31");
    }

    #[test]
    fn test_end_defaults_to_today() {
        let range = TimeRange::new(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(), None);
        assert_eq!(range.end, Utc::now().date_naive());
    }
}
