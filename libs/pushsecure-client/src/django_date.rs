//! Serde adapter for the timestamp format emitted by the Django backend
//!
//! The server writes UTC datetimes with microsecond precision and a literal
//! `Z` suffix, e.g. `2015-06-23T21:07:38.123456Z`. Use with
//! `#[serde(with = "django_date")]`, or `django_date::option` for
//! `Option<DateTime<Utc>>` fields.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serializer};

/// Output format, microseconds always written
pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Input format, fraction digits optional and of any length
const PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

pub fn format(date: &DateTime<Utc>) -> String {
    date.format(FORMAT).to_string()
}

/// Parse a Django timestamp. Values carrying an explicit offset instead of
/// `Z` (Django with `USE_TZ` and a non-UTC zone) are normalized to UTC.
pub fn parse(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match NaiveDateTime::parse_from_str(value, PARSE_FORMAT) {
        Ok(naive) => Ok(naive.and_utc()),
        Err(err) => DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| err),
    }
}

pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format(date))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(|e| de::Error::custom(format!("invalid date {raw:?}: {e}")))
}

pub mod option {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(date) => super::serialize(date, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => super::parse(&raw)
                .map(Some)
                .map_err(|e| de::Error::custom(format!("invalid date {raw:?}: {e}"))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Stamped {
        #[serde(with = "super")]
        at: DateTime<Utc>,
        #[serde(default, with = "super::option")]
        seen: Option<DateTime<Utc>>,
    }

    fn sample() -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2015, 6, 23)
            .unwrap()
            .and_hms_micro_opt(21, 7, 38, 123_456)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn test_format_writes_microseconds() {
        assert_eq!(format(&sample()), "2015-06-23T21:07:38.123456Z");

        let whole = sample().with_nanosecond(0).unwrap();
        assert_eq!(format(&whole), "2015-06-23T21:07:38.000000Z");
    }

    #[test]
    fn test_parse_fraction_lengths() {
        let micros = parse("2015-06-23T21:07:38.123456Z").unwrap();
        assert_eq!(micros, sample());

        let millis = parse("2015-06-23T21:07:38.123Z").unwrap();
        assert_eq!(millis.nanosecond(), 123_000_000);

        let none = parse("2015-06-23T21:07:38Z").unwrap();
        assert_eq!(none.nanosecond(), 0);
        assert_eq!(none.second(), 38);
    }

    #[test]
    fn test_parse_offset_normalized_to_utc() {
        let dt = parse("2015-06-23T23:07:38.123456+02:00").unwrap();
        assert_eq!(dt, sample());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse("23/06/2015 21:07").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let value = Stamped {
            at: sample(),
            seen: Some(sample()),
        };

        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(
            json,
            r#"{"at":"2015-06-23T21:07:38.123456Z","seen":"2015-06-23T21:07:38.123456Z"}"#
        );

        let back: Stamped = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_option_null_and_missing() {
        let back: Stamped =
            serde_json::from_str(r#"{"at":"2015-06-23T21:07:38.123456Z","seen":null}"#).unwrap();
        assert_eq!(back.seen, None);

        let back: Stamped = serde_json::from_str(r#"{"at":"2015-06-23T21:07:38Z"}"#).unwrap();
        assert_eq!(back.seen, None);
    }

    #[test]
    fn test_invalid_date_is_a_decode_error() {
        let err = serde_json::from_str::<Stamped>(r#"{"at":"yesterday"}"#).unwrap_err();
        assert!(err.to_string().contains("invalid date"));
    }
}
