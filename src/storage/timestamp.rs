//! Lenient timestamp parsing for stored records.
//!
//! Data files written by earlier versions of the service carry naive local
//! timestamps (`2024-05-01 10:00:00.123456`, `2024-05-01T10:05:00.654321`)
//! next to RFC 3339 ones. Naive values are read as UTC. Records are always
//! written back as RFC 3339.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse RFC 3339, offset-carrying or naive (UTC) timestamps
pub fn parse_lenient(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    None
}

/// Deserialize a required timestamp; `null` becomes the current time.
///
/// Pair with `#[serde(default = "Utc::now")]` for absent fields.
pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_lenient(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid timestamp \"{raw}\""))),
        None => Ok(Utc::now()),
    }
}

/// Deserialize an optional timestamp
pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_lenient(&raw)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid timestamp \"{raw}\""))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_rfc3339() {
        let dt = parse_lenient("2024-05-01T10:00:00Z").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());

        let shifted = parse_lenient("2024-05-01T12:00:00+02:00").unwrap();
        assert_eq!(shifted, dt);
    }

    #[test]
    fn test_naive_space_separated() {
        let dt = parse_lenient("2024-05-01 10:00:00.123456").unwrap();
        assert_eq!(dt.hour(), 10);
        assert_eq!(dt.nanosecond(), 123_456_000);

        let whole = parse_lenient("2024-05-01 10:00:00").unwrap();
        assert_eq!(whole, Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_naive_iso() {
        let dt = parse_lenient("2024-05-01T10:05:00.654321").unwrap();
        assert_eq!(dt.minute(), 5);
        assert_eq!(dt.nanosecond(), 654_321_000);
    }

    #[test]
    fn test_space_separated_with_offset() {
        let dt = parse_lenient("2024-05-01 10:00:00+00:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(parse_lenient("yesterday").is_none());
        assert!(parse_lenient("").is_none());
    }

    #[test]
    fn test_deserialize_option() {
        #[derive(Deserialize)]
        struct Row {
            #[serde(default, deserialize_with = "deserialize_option")]
            at: Option<DateTime<Utc>>,
        }

        let row: Row = serde_json::from_str(r#"{"at": null}"#).unwrap();
        assert!(row.at.is_none());
        let row: Row = serde_json::from_str("{}").unwrap();
        assert!(row.at.is_none());
        let row: Row = serde_json::from_str(r#"{"at": "2024-05-01 10:00:00"}"#).unwrap();
        assert!(row.at.is_some());
        assert!(serde_json::from_str::<Row>(r#"{"at": "soon"}"#).is_err());
    }
}
