//! The `Value` recursive sum type carried by every log event property.
//!
//! Scalars pass through transports unchanged; `Sequence`/`Map`/`Capture`
//! are produced by the destructurer (`capture` module) when a property is
//! bound with the `@` hint or is complex under the default hint.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A log-safe value. Recursive through `Sequence`, `Map` and `Capture`.
///
/// Derives `Serialize`/`Deserialize` so the durable sink can round-trip a
/// `LogEvent`'s properties through its on-disk record schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int64(i64),
    UInt64(u64),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
    Duration(std::time::Duration),
    Sequence(Vec<Value>),
    /// Keys are stored sorted (`BTreeMap`) so two maps built from the same
    /// logical content always compare and serialise identically.
    Map(BTreeMap<String, Value>),
    /// `(type_tag, fields)` — produced by structural capture of a record.
    Capture(String, BTreeMap<String, Value>),
    /// A value whose structure was collapsed to its string form, either
    /// because the binding site used the `$` hint or because no richer
    /// representation was available.
    Opaque(String),
}

impl Value {
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Null
                | Value::Bool(_)
                | Value::Int64(_)
                | Value::UInt64(_)
                | Value::Float64(_)
                | Value::String(_)
                | Value::Bytes(_)
                | Value::Timestamp(_)
                | Value::Duration(_)
        )
    }

    /// Render this value as plain text, used by the renderer (default
    /// format) and by `$`-hint stringification.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int64(i) => i.to_string(),
            Value::UInt64(u) => u.to_string(),
            Value::Float64(f) => format!("{f}"),
            Value::String(s) => s.clone(),
            Value::Bytes(b) => format!("0x{}", hex_encode(b)),
            Value::Timestamp(t) => t.to_rfc3339(),
            Value::Duration(d) => format!("{:.3}s", d.as_secs_f64()),
            Value::Sequence(items) => {
                let parts: Vec<String> = items.iter().map(Value::to_display_string).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::Map(map) => format_map(map),
            Value::Capture(tag, fields) => format!("{tag} {}", format_map(fields)),
            Value::Opaque(s) => s.clone(),
        }
    }

    /// Project into `serde_json::Value`, used by the `j` format specifier
    /// and by the durable sink's on-disk record schema.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int64(i) => serde_json::Value::from(*i),
            Value::UInt64(u) => serde_json::Value::from(*u),
            Value::Float64(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(b) => serde_json::Value::String(hex_encode(b)),
            Value::Timestamp(t) => serde_json::Value::String(t.to_rfc3339()),
            Value::Duration(d) => serde_json::Value::from(d.as_secs_f64()),
            Value::Sequence(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Capture(tag, fields) => {
                let mut obj = serde_json::Map::new();
                obj.insert("_type".to_string(), serde_json::Value::String(tag.clone()));
                for (k, v) in fields {
                    obj.insert(k.clone(), v.to_json());
                }
                serde_json::Value::Object(obj)
            }
            Value::Opaque(s) => serde_json::Value::String(s.clone()),
        }
    }
}

fn format_map(map: &BTreeMap<String, Value>) -> String {
    let parts: Vec<String> = map
        .iter()
        .map(|(k, v)| format!("{k}: {}", v.to_display_string()))
        .collect();
    format!("{{{}}}", parts.join(", "))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}
impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}
impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int64(v as i64)
    }
}
impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt64(v)
    }
}
impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}
impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}
impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}
impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_display_without_quotes() {
        assert_eq!(Value::from("hello").to_display_string(), "hello");
        assert_eq!(Value::from(42i64).to_display_string(), "42");
    }

    #[test]
    fn sequence_display_joins_with_commas() {
        let seq = Value::Sequence(vec![Value::from(1i64), Value::from(2i64)]);
        assert_eq!(seq.to_display_string(), "[1, 2]");
    }

    #[test]
    fn capture_to_json_includes_type_tag() {
        let mut fields = BTreeMap::new();
        fields.insert("id".to_string(), Value::from(1i64));
        let cap = Value::Capture("User".to_string(), fields);
        let json = cap.to_json();
        assert_eq!(json["_type"], "User");
        assert_eq!(json["id"], 1);
    }

    #[test]
    fn is_scalar_excludes_containers() {
        assert!(Value::from(1i64).is_scalar());
        assert!(!Value::Sequence(vec![]).is_scalar());
        assert!(!Value::Map(BTreeMap::new()).is_scalar());
    }
}
