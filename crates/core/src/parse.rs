//! Value parsers.
//!
//! Each parser validates one raw [`Value`] and normalizes it to its wire
//! representation. Parsers are total: every input, null included, produces
//! either a JSON value or a [`ParseError`].

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Number, Value as JsonValue};
use std::net::IpAddr;

use crate::error::ParseError;
use crate::value::Value;

/// Outcome of a single parse.
pub type ParseResult = Result<JsonValue, ParseError>;

/// A parser bound to a special property.
pub type Parser = fn(&Value) -> ParseResult;

/// Wire format for protocol-string timestamps.
pub const PROTOCOL_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

fn unexpected(expected: &'static str, found: &Value) -> ParseError {
    match found {
        Value::Null => ParseError::Null,
        other => ParseError::UnexpectedType {
            expected,
            found: other.kind(),
        },
    }
}

/// Accepts any non-null string.
pub fn string(value: &Value) -> ParseResult {
    match value {
        Value::String(s) => Ok(JsonValue::String(s.clone())),
        other => Err(unexpected("string", other)),
    }
}

/// Accepts integer and floating point values unchanged.
pub fn number(value: &Value) -> ParseResult {
    match value {
        Value::Int(i) => Ok(JsonValue::from(*i)),
        Value::UInt(u) => Ok(JsonValue::from(*u)),
        Value::Float(f) => Number::from_f64(*f)
            .map(JsonValue::Number)
            .ok_or(ParseError::NonFinite),
        other => Err(unexpected("number", other)),
    }
}

pub fn boolean(value: &Value) -> ParseResult {
    match value {
        Value::Bool(b) => Ok(JsonValue::Bool(*b)),
        other => Err(unexpected("boolean", other)),
    }
}

/// Accepts strings, numbers and UUIDs, normalized to a non-empty string.
pub fn distinct_id(value: &Value) -> ParseResult {
    let id = match value {
        Value::String(s) => s.clone(),
        Value::Int(i) => i.to_string(),
        Value::UInt(u) => u.to_string(),
        Value::Float(f) if !f.is_finite() => return Err(ParseError::NonFinite),
        Value::Float(f) => f.to_string(),
        Value::Uuid(u) => u.to_string(),
        other => return Err(unexpected("distinct id", other)),
    };
    if id.is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(JsonValue::String(id))
}

fn is_dotted_quad(s: &str) -> bool {
    let octets: Vec<&str> = s.split('.').collect();
    octets.len() == 4
        && octets.iter().all(|octet| {
            (1..=3).contains(&octet.len())
                && octet.bytes().all(|b| b.is_ascii_digit())
                && octet.parse::<u16>().is_ok_and(|n| n <= 255)
        })
}

/// Accepts a dotted-quad string or an IPv4 (or IPv4-mapped) address.
pub fn ip(value: &Value) -> ParseResult {
    match value {
        Value::String(s) if is_dotted_quad(s) => Ok(JsonValue::String(s.clone())),
        Value::String(s) => Err(ParseError::Malformed {
            expected: "ip address",
            value: s.clone(),
        }),
        Value::Ip(IpAddr::V4(addr)) => Ok(JsonValue::String(addr.to_string())),
        Value::Ip(IpAddr::V6(addr)) => addr
            .to_ipv4_mapped()
            .map(|v4| JsonValue::String(v4.to_string()))
            .ok_or_else(|| ParseError::Malformed {
                expected: "IPv4 address",
                value: addr.to_string(),
            }),
        other => Err(unexpected("ip address", other)),
    }
}

/// Whole seconds since the Unix epoch. Integers are taken as already-unix.
pub fn unix_time(value: &Value) -> ParseResult {
    match value {
        Value::DateTime(dt) => Ok(JsonValue::from(dt.timestamp())),
        Value::DateTimeOffset(dt) => Ok(JsonValue::from(dt.timestamp())),
        Value::Int(i) => Ok(JsonValue::from(*i)),
        Value::UInt(u) => Ok(JsonValue::from(*u)),
        other => Err(unexpected("time", other)),
    }
}

/// Format a UTC instant the way the protocol expects date strings.
pub fn format_protocol_time(dt: &DateTime<Utc>) -> String {
    dt.format(PROTOCOL_TIME_FORMAT).to_string()
}

/// Digits everywhere except `-` at 4 and 7, `T` at 10, `:` at 13 and 16.
fn has_protocol_time_shape(s: &str) -> bool {
    s.len() == 19
        && s.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            10 => b == b'T',
            13 | 16 => b == b':',
            _ => b.is_ascii_digit(),
        })
}

/// `yyyy-MM-ddTHH:mm:ss` in UTC. Strings must already be in that exact form.
pub fn protocol_time(value: &Value) -> ParseResult {
    match value {
        Value::DateTime(dt) => Ok(JsonValue::String(format_protocol_time(dt))),
        Value::DateTimeOffset(dt) => Ok(JsonValue::String(format_protocol_time(
            &dt.with_timezone(&Utc),
        ))),
        Value::String(s)
            if has_protocol_time_shape(s)
                && NaiveDateTime::parse_from_str(s, PROTOCOL_TIME_FORMAT).is_ok() =>
        {
            Ok(JsonValue::String(s.clone()))
        }
        Value::String(s) => Err(ParseError::Malformed {
            expected: "yyyy-MM-ddTHH:mm:ss timestamp",
            value: s.clone(),
        }),
        other => Err(unexpected("time", other)),
    }
}

/// Durations become total seconds; plain numbers pass through.
pub fn duration(value: &Value) -> ParseResult {
    match value {
        Value::Duration(d) => number(&Value::Float(d.as_secs_f64())),
        Value::Int(_) | Value::UInt(_) | Value::Float(_) => number(value),
        other => Err(unexpected("duration", other)),
    }
}

/// Free-form property values.
///
/// With `allow_collections`, a list is accepted and each element is parsed
/// without collections; elements that fail are dropped.
pub fn generic(value: &Value, allow_collections: bool) -> ParseResult {
    match value {
        Value::Null => Ok(JsonValue::Null),
        Value::Char(c) => Ok(JsonValue::String(c.to_string())),
        Value::String(_) => string(value),
        Value::Bool(_) => boolean(value),
        Value::Int(_) | Value::UInt(_) | Value::Float(_) => number(value),
        Value::Uuid(u) => Ok(JsonValue::String(u.to_string())),
        Value::Duration(_) => duration(value),
        Value::DateTime(_) | Value::DateTimeOffset(_) => protocol_time(value),
        Value::List(_) if allow_collections => collection(value, |item| generic(item, false)),
        other => Err(ParseError::UnexpectedType {
            expected: "property value",
            found: other.kind(),
        }),
    }
}

/// A non-string sequence, parsed element-wise. Failing elements are dropped;
/// an empty result is still a success.
pub fn collection(value: &Value, item: impl Fn(&Value) -> ParseResult) -> ParseResult {
    match value {
        Value::List(items) => Ok(JsonValue::Array(
            items
                .iter()
                .filter_map(|v| match item(v) {
                    Ok(parsed) => Some(parsed),
                    Err(err) => {
                        tracing::trace!(error = %err, "Dropping collection element");
                        None
                    }
                })
                .collect(),
        )),
        other => Err(unexpected("collection", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use serde_json::json;
    use std::net::{Ipv4Addr, Ipv6Addr};
    use std::time::Duration;
    use uuid::Uuid;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> Value {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap().into()
    }

    #[test]
    fn string_accepts_only_strings() {
        assert_eq!(string(&"x".into()).unwrap(), json!("x"));
        assert_eq!(string(&Value::Null).unwrap_err(), ParseError::Null);
        assert!(string(&5.into()).is_err());
    }

    #[test]
    fn number_passes_numeric_kinds() {
        assert_eq!(number(&(-3i32).into()).unwrap(), json!(-3));
        assert_eq!(number(&7u64.into()).unwrap(), json!(7));
        assert_eq!(number(&2.5.into()).unwrap(), json!(2.5));
        assert_eq!(number(&f64::NAN.into()).unwrap_err(), ParseError::NonFinite);
        assert!(number(&"5".into()).is_err());
    }

    #[test]
    fn boolean_requires_bool() {
        assert_eq!(boolean(&true.into()).unwrap(), json!(true));
        assert!(boolean(&"true".into()).is_err());
    }

    #[test]
    fn distinct_id_normalizes_to_string() {
        assert_eq!(distinct_id(&"456".into()).unwrap(), json!("456"));
        assert_eq!(distinct_id(&456.into()).unwrap(), json!("456"));
        assert_eq!(distinct_id(&"".into()).unwrap_err(), ParseError::Empty);
        assert_eq!(distinct_id(&Value::Null).unwrap_err(), ParseError::Null);

        let id = Uuid::new_v4();
        assert_eq!(distinct_id(&id.into()).unwrap(), json!(id.to_string()));
        assert!(distinct_id(&true.into()).is_err());
    }

    #[test]
    fn distinct_id_rejects_non_finite_floats() {
        assert_eq!(distinct_id(&2.5.into()).unwrap(), json!("2.5"));
        for f in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert_eq!(distinct_id(&f.into()).unwrap_err(), ParseError::NonFinite);
        }
    }

    #[test]
    fn ip_validates_octets() {
        assert_eq!(ip(&"192.168.0.1".into()).unwrap(), json!("192.168.0.1"));
        assert!(ip(&"256.1.1.1".into()).is_err());
        assert!(ip(&"1.2.3".into()).is_err());
        assert!(ip(&"a.b.c.d".into()).is_err());
        assert!(ip(&"1.2.3.4.5".into()).is_err());
        assert_eq!(
            ip(&Ipv4Addr::new(10, 0, 0, 7).into()).unwrap(),
            json!("10.0.0.7")
        );
        assert_eq!(
            ip(&Ipv4Addr::new(10, 0, 0, 7).to_ipv6_mapped().into()).unwrap(),
            json!("10.0.0.7")
        );
        assert!(ip(&Ipv6Addr::LOCALHOST.into()).is_err());
    }

    #[test]
    fn unix_time_from_utc_date() {
        assert_eq!(
            unix_time(&utc(2013, 11, 30, 0, 0, 0)).unwrap(),
            json!(1_385_769_600)
        );
    }

    #[test]
    fn unix_time_converts_offsets_to_utc() {
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let local = plus_two.with_ymd_and_hms(2013, 11, 30, 2, 0, 0).unwrap();
        assert_eq!(unix_time(&local.into()).unwrap(), json!(1_385_769_600));
        assert_eq!(unix_time(&1_385_769_600i64.into()).unwrap(), json!(1_385_769_600));
        assert!(unix_time(&"2013-11-30T00:00:00".into()).is_err());
    }

    #[test]
    fn protocol_time_formats_in_utc() {
        assert_eq!(
            protocol_time(&utc(2013, 11, 30, 1, 2, 3)).unwrap(),
            json!("2013-11-30T01:02:03")
        );

        let minus_five = FixedOffset::west_opt(5 * 3600).unwrap();
        let local = minus_five.with_ymd_and_hms(2013, 11, 29, 20, 0, 0).unwrap();
        assert_eq!(
            protocol_time(&local.into()).unwrap(),
            json!("2013-11-30T01:00:00")
        );
    }

    #[test]
    fn protocol_time_checks_string_shape() {
        assert_eq!(
            protocol_time(&"2013-11-30T00:00:00".into()).unwrap(),
            json!("2013-11-30T00:00:00")
        );
        assert!(protocol_time(&"2013-11-30 00:00:00".into()).is_err());
        assert!(protocol_time(&"2013-11-30T00:00:00Z".into()).is_err());
        assert!(protocol_time(&"yesterday".into()).is_err());
        for padded in [
            "+2013-11-30T0:00:00",
            " 2013-11-30T1:02:03",
            "2013-11-30T 1:02:03",
            "2013-11-30T01:02:0 ",
        ] {
            assert!(
                matches!(
                    protocol_time(&padded.into()),
                    Err(ParseError::Malformed { .. })
                ),
                "{padded:?} should be rejected"
            );
        }
        assert!(protocol_time(&"2013-13-30T00:00:00".into()).is_err());
    }

    #[test]
    fn duration_in_seconds() {
        assert_eq!(
            duration(&Duration::from_millis(1500).into()).unwrap(),
            json!(1.5)
        );
        assert_eq!(duration(&3.into()).unwrap(), json!(3));
        assert!(duration(&"3s".into()).is_err());
    }

    #[test]
    fn generic_scalars() {
        assert_eq!(generic(&Value::Null, false).unwrap(), json!(null));
        assert_eq!(generic(&'x'.into(), false).unwrap(), json!("x"));
        assert_eq!(generic(&utc(2013, 11, 30, 0, 0, 0), false).unwrap(), json!("2013-11-30T00:00:00"));
        assert!(generic(&Ipv4Addr::LOCALHOST.into(), false).is_err());
        assert!(generic(&Value::map([("a", 1)]), true).is_err());
    }

    #[test]
    fn generic_collections_flatten_one_level() {
        let nested = Value::list([Value::from(1), Value::from("two"), Value::list([3])]);
        assert_eq!(generic(&nested, true).unwrap(), json!([1, "two"]));
        assert!(generic(&nested, false).is_err());
    }

    #[test]
    fn collection_drops_failing_items() {
        let items = Value::list([Value::from(1), Value::from("x"), Value::from(2.5)]);
        assert_eq!(collection(&items, number).unwrap(), json!([1, 2.5]));

        let none_valid = Value::list(["a", "b"]);
        assert_eq!(collection(&none_valid, number).unwrap(), json!([]));

        assert!(collection(&"not a list".into(), number).is_err());
        assert_eq!(collection(&Value::Null, number).unwrap_err(), ParseError::Null);
    }
}
