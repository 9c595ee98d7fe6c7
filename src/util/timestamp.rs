//! Serde helpers for `DateTime<Utc>` fields.
//!
//! Timestamps are written as fixed-width RFC 3339 strings with millisecond
//! precision (`2026-01-02T03:04:05.000Z`), so MongoDB string comparisons in
//! range filters (`$lt`, `$gte`) agree with chronological order.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// Format a timestamp the way it is stored.
pub fn format(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse any RFC 3339 timestamp into UTC.
pub fn parse(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc))
}

pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format(value))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(serde::de::Error::custom)
}

pub mod option {
    use super::*;

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_some(&format(dt)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            Some(s) => parse(&s).map(Some).map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Stamped {
        #[serde(with = "crate::util::timestamp")]
        at: DateTime<Utc>,
        #[serde(default, with = "crate::util::timestamp::option")]
        maybe: Option<DateTime<Utc>>,
    }

    #[test]
    fn test_format_is_fixed_width() {
        let whole = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format(&whole), "2026-01-02T03:04:05.000Z");
        let fractional = whole + chrono::Duration::milliseconds(250);
        assert_eq!(format(&fractional), "2026-01-02T03:04:05.250Z");
        assert!(format(&whole) < format(&fractional));
    }

    #[test]
    fn test_parse_accepts_offsets() {
        let parsed = parse("2026-01-02T05:04:05+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap());
    }

    #[test]
    fn test_serde_json_shape() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let value = serde_json::to_value(Stamped { at, maybe: None }).unwrap();
        assert_eq!(value["at"], "2026-03-01T00:00:00.000Z");
        assert!(value["maybe"].is_null());

        let back: Stamped = serde_json::from_str(r#"{"at":"2026-03-01T00:00:00Z"}"#).unwrap();
        assert_eq!(back.at, at);
        assert_eq!(back.maybe, None);
    }
}
