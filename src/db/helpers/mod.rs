use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};

pub fn to_i64(value: usize) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn to_usize(value: i64, field: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

/// Fixed-width RFC 3339 so that text order in SQLite equals time order.
pub fn format_datetime(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formatted_timestamps_sort_chronologically() {
        let earlier = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let later = earlier + chrono::Duration::milliseconds(500);
        assert!(format_datetime(&earlier) < format_datetime(&later));
        assert_eq!(format_datetime(&earlier), "2024-01-01T08:00:00.000Z");
    }

    #[test]
    fn parse_round_trips_formatted_value() {
        let ts = Utc.with_ymd_and_hms(2023, 11, 5, 23, 59, 1).unwrap();
        let parsed = parse_datetime(&format_datetime(&ts), "timestamp").unwrap();
        assert_eq!(parsed, ts);
    }
}
