//! Lenient field readers shared by every schema generation
//!
//! Stores written by different builds disagree on field types: timestamps appear
//! as integers, floats, numeric strings or RFC3339 strings, and the sender type
//! as an integer or a string. These helpers accept all of them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::models::Role;

/// Reads an epoch-milliseconds timestamp from any of the shapes seen in the wild
pub fn timestamp_millis(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(ms) = s.parse::<i64>() {
                return Some(ms);
            }
            s.parse::<DateTime<Utc>>().ok().map(|dt| dt.timestamp_millis())
        }
        _ => None,
    }
}

/// Custom deserializer for optional timestamps
///
/// `null`, absent and unreadable values all map to `None`, so a bad timestamp
/// never costs the rest of the struct.
pub fn deserialize_optional_millis<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(timestamp_millis))
}

/// Maps the message `type` field to a sender role
///
/// `1`/`"1"`/`"user"`/`"human"` is the user, `2`/`"2"`/`"ai"`/`"assistant"`/`"bot"`
/// the assistant. Anything else is unknown.
pub fn sender_role(value: &Value) -> Option<Role> {
    match value {
        Value::Number(n) => match n.as_i64()? {
            1 => Some(Role::User),
            2 => Some(Role::Assistant),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "user" | "human" => Some(Role::User),
            "2" | "ai" | "assistant" | "bot" => Some(Role::Assistant),
            _ => None,
        },
        _ => None,
    }
}

/// First non-empty string among `keys`
pub fn first_str<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().filter_map(|k| value.get(*k).and_then(Value::as_str)).find(|s| !s.is_empty())
}

/// First value among `keys` that parses as a line number
pub fn first_line(value: &Value, keys: &[&str]) -> Option<u32> {
    keys.iter()
        .filter_map(|k| value.get(*k))
        .find_map(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok())))
        .and_then(|n| u32::try_from(n).ok())
}
