//! Parsing of the date-time formats accepted by the API.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer};

/// Canonical request format, e.g. `2024-03-01 14:30:00`.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Accepts `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` and RFC 3339.
/// RFC 3339 values are converted to UTC.
pub fn parse_date_time(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, DATE_TIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|date| date.naive_utc())
        })
}

/// Serde helper for `#[serde(deserialize_with = "...")]` on request fields.
pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date_time(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!(
            "The date field must match the format Y-m-d H:i:s, got '{}'",
            raw
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_accepted_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();

        assert_eq!(parse_date_time("2024-03-01 14:30:00"), Some(expected));
        assert_eq!(parse_date_time("2024-03-01T14:30:00"), Some(expected));
        assert_eq!(parse_date_time("2024-03-01T15:30:00+01:00"), Some(expected));
    }

    #[test]
    fn test_rejects_other_formats() {
        assert_eq!(parse_date_time("01/03/2024"), None);
        assert_eq!(parse_date_time("2024-03-01"), None);
        assert_eq!(parse_date_time(""), None);
    }
}
