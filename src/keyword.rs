//! Keyword value providers for computed placeholders.
//!
//! The vocabulary is closed: `UUID`, `Random`, `Instant`, `Timestamp`.
//! The time keywords accept an optional `.plus[<unit><signed-int>]` argument
//! tail with unit `h`, `m`, or `s`.

use crate::placeholder::PlaceholderError;
use chrono::{Duration, Utc};
use rand::Rng;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Timestamp format for the `Instant` keyword (UTC, millisecond precision).
pub(crate) const INSTANT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// A named computed value provider.
pub(crate) struct Keyword {
    pub name: &'static str,
    pub value: fn(&str) -> Result<Value, PlaceholderError>,
}

/// The closed keyword vocabulary. Adding a keyword means adding one entry.
pub(crate) const KEYWORDS: &[Keyword] = &[
    Keyword {
        name: "UUID",
        value: uuid_value,
    },
    Keyword {
        name: "Random",
        value: random_value,
    },
    Keyword {
        name: "Instant",
        value: instant_value,
    },
    Keyword {
        name: "Timestamp",
        value: timestamp_value,
    },
];

/// Find a registered keyword by name.
pub(crate) fn lookup(name: &str) -> Option<&'static Keyword> {
    KEYWORDS.iter().find(|k| k.name == name)
}

/// Alternation of keyword names, used to build the keyword pattern.
pub(crate) fn name_alternation() -> String {
    KEYWORDS
        .iter()
        .map(|k| k.name)
        .collect::<Vec<_>>()
        .join("|")
}

fn uuid_value(_args: &str) -> Result<Value, PlaceholderError> {
    Ok(Value::String(random_uuid()))
}

fn random_value(_args: &str) -> Result<Value, PlaceholderError> {
    Ok(Value::from(rand::thread_rng().gen::<i32>()))
}

fn instant_value(args: &str) -> Result<Value, PlaceholderError> {
    let at = Utc::now() + parse_offset(args)?;
    Ok(Value::String(at.format(INSTANT_FORMAT).to_string()))
}

fn timestamp_value(args: &str) -> Result<Value, PlaceholderError> {
    let at = Utc::now() + parse_offset(args)?;
    Ok(Value::from(at.timestamp_millis()))
}

/// Generate a random v4-style UUID string.
pub(crate) fn random_uuid() -> String {
    let mut rng = rand::thread_rng();
    format!(
        "{:08x}-{:04x}-4{:03x}-{:04x}-{:012x}",
        rng.gen::<u32>(),
        rng.gen::<u16>(),
        rng.gen::<u16>() & 0x0fff,
        (rng.gen::<u16>() & 0x3fff) | 0x8000,
        rng.gen::<u64>() & 0xffffffffffff,
    )
}

fn offset_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\.plus\[([HhMmSs])([+-]?\d+)\]$").expect("offset pattern is valid")
    })
}

/// Parse the optional time-offset argument tail of a time keyword.
///
/// Only tails starting with `.plus[` are held to the grammar; any other tail
/// is a zero offset. The asymmetry tolerates descriptive trailing text in
/// existing stub definitions and must not be tightened.
pub(crate) fn parse_offset(args: &str) -> Result<Duration, PlaceholderError> {
    if let Some(caps) = offset_pattern().captures(args) {
        let amount: i64 = caps[2]
            .parse()
            .map_err(|_| PlaceholderError::InvalidTimeOffset(args.to_string()))?;
        let duration = match caps[1].to_lowercase().as_str() {
            "h" => Duration::try_hours(amount),
            "m" => Duration::try_minutes(amount),
            _ => Duration::try_seconds(amount),
        };
        return duration.ok_or_else(|| PlaceholderError::InvalidTimeOffset(args.to_string()));
    }
    if args.starts_with(".plus[") {
        return Err(PlaceholderError::InvalidTimeOffset(args.to_string()));
    }
    Ok(Duration::zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    #[test]
    fn test_parse_offset_hours() {
        assert_eq!(parse_offset(".plus[h2]").unwrap(), Duration::hours(2));
        assert_eq!(parse_offset(".plus[h-2]").unwrap(), Duration::hours(-2));
        assert_eq!(parse_offset(".plus[H+1]").unwrap(), Duration::hours(1));
    }

    #[test]
    fn test_parse_offset_minutes_and_seconds() {
        assert_eq!(parse_offset(".plus[m30]").unwrap(), Duration::minutes(30));
        assert_eq!(parse_offset(".plus[S15]").unwrap(), Duration::seconds(15));
        assert_eq!(parse_offset(".plus[s-90]").unwrap(), Duration::seconds(-90));
    }

    #[test]
    fn test_parse_offset_invalid_unit_fails() {
        assert!(parse_offset(".plus[x5]").is_err());
        assert!(parse_offset(".plus[h]").is_err());
        assert!(parse_offset(".plus[h2").is_err());
    }

    #[test]
    fn test_parse_offset_other_tails_ignored() {
        assert_eq!(parse_offset("").unwrap(), Duration::zero());
        assert_eq!(parse_offset("foo").unwrap(), Duration::zero());
        assert_eq!(parse_offset(" some note").unwrap(), Duration::zero());
    }

    #[test]
    fn test_uuid_value_shape() {
        let value = uuid_value("").unwrap();
        let uuid = value.as_str().unwrap();
        assert_eq!(uuid.len(), 36);
        assert_eq!(uuid.chars().nth(8), Some('-'));
        assert_eq!(uuid.chars().nth(14), Some('4'));
    }

    #[test]
    fn test_random_value_is_integer() {
        let value = random_value("").unwrap();
        assert!(value.is_i64());
    }

    #[test]
    fn test_instant_value_is_current() {
        let value = instant_value("").unwrap();
        let parsed = NaiveDateTime::parse_from_str(value.as_str().unwrap(), INSTANT_FORMAT)
            .unwrap()
            .and_utc();
        let drift = (Utc::now() - parsed).num_seconds().abs();
        assert!(drift <= 5, "instant drifted by {}s", drift);
    }

    #[test]
    fn test_timestamp_value_with_offset() {
        let value = timestamp_value(".plus[h2]").unwrap();
        let expected = (Utc::now() + Duration::hours(2)).timestamp_millis();
        let drift = (value.as_i64().unwrap() - expected).abs();
        assert!(drift <= 5_000, "timestamp drifted by {}ms", drift);
    }

    #[test]
    fn test_lookup_is_closed() {
        assert!(lookup("UUID").is_some());
        assert!(lookup("Timestamp").is_some());
        assert!(lookup("Unknown").is_none());
    }
}
