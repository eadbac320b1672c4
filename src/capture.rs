//! Destructuring of bound arguments into log-safe `Value`s.
//!
//! Three capabilities a caller's type can implement, checked in this
//! order: `LogValue` (delegate to a representative value, re-destructured
//! at the same depth), `Capturable` (hand-written structural capture with
//! field skip/rename), or neither (the value falls back to `Opaque` via
//! its `Display`/debug form, through `IntoValue`).

use std::collections::BTreeMap;

use crate::value::Value;

/// Depth, length and count ceilings applied while destructuring.
#[derive(Debug, Clone, Copy)]
pub struct CaptureOptions {
    pub max_depth: usize,
    pub max_string_length: usize,
    pub max_collection_count: usize,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        CaptureOptions {
            max_depth: 3,
            max_string_length: 1000,
            max_collection_count: 100,
        }
    }
}

/// A type that can produce its own representative `Value`. Used for
/// types that want to control their own capture shape (e.g. wrapping a
/// newtype around an already-`Value`-shaped payload) without writing a
/// full `Capturable` impl.
pub trait LogValue {
    fn to_log_value(&self) -> Value;
}

/// A type that knows how to destructure itself into a `Capture`, honouring
/// `opts` and the current recursion `depth`. Hand-implemented per struct;
/// there is no derive macro in scope.
pub trait Capturable {
    /// The type tag recorded in `Value::Capture(tag, fields)`.
    fn type_tag(&self) -> &str;

    /// Externally visible fields, already filtered for skip/rename. Each
    /// field value is *uncaptured* — `destructure` takes care of
    /// recursing into it at `depth + 1`.
    fn fields(&self) -> Vec<(String, FieldValue)>;
}

/// One field of a `Capturable` value, deferred so `destructure` controls
/// the recursive limits rather than the impl doing it itself.
pub enum FieldValue {
    Scalar(Value),
    Nested(Box<dyn Capturable>),
    NestedLogValue(Box<dyn LogValue>),
}

/// Destructure a `LogValue` implementor, honouring `max_depth` by
/// truncating cyclic or overly long `LogValue` chains to a marker rather
/// than recursing forever.
pub fn destructure_log_value(value: &dyn LogValue, opts: &CaptureOptions, depth: usize) -> Value {
    if depth >= opts.max_depth {
        return Value::Opaque("<max depth reached>".to_string());
    }
    let inner = value.to_log_value();
    clamp(inner, opts, depth)
}

/// Destructure a `Capturable` value into `Value::Capture`, recursing into
/// nested fields up to `max_depth`.
pub fn destructure_capturable(value: &dyn Capturable, opts: &CaptureOptions, depth: usize) -> Value {
    if depth >= opts.max_depth {
        return Value::Opaque(format!("<{} (max depth reached)>", value.type_tag()));
    }
    let mut fields = BTreeMap::new();
    for (name, field) in value.fields() {
        let captured = match field {
            FieldValue::Scalar(v) => clamp(v, opts, depth + 1),
            FieldValue::Nested(inner) => destructure_capturable(inner.as_ref(), opts, depth + 1),
            FieldValue::NestedLogValue(inner) => destructure_log_value(inner.as_ref(), opts, depth + 1),
        };
        fields.insert(name, captured);
    }
    Value::Capture(value.type_tag().to_string(), fields)
}

/// Apply string-length and collection-count limits to an already-built
/// `Value`, recursing into `Sequence`/`Map` at `depth + 1`. This is the
/// single choke point every capture path routes through, so the limits
/// are enforced uniformly regardless of which capability produced the
/// value.
pub fn clamp(value: Value, opts: &CaptureOptions, depth: usize) -> Value {
    match value {
        Value::String(s) => Value::String(truncate_string(s, opts.max_string_length)),
        Value::Sequence(items) => {
            if depth >= opts.max_depth {
                return Value::Opaque("<max depth reached>".to_string());
            }
            Value::Sequence(truncate_collection(items, opts, depth))
        }
        Value::Map(map) => {
            if depth >= opts.max_depth {
                return Value::Opaque("<max depth reached>".to_string());
            }
            let mut truncated = BTreeMap::new();
            for (k, v) in map.into_iter().take(opts.max_collection_count) {
                truncated.insert(k, clamp(v, opts, depth + 1));
            }
            Value::Map(truncated)
        }
        Value::Capture(tag, map) => {
            if depth >= opts.max_depth {
                return Value::Opaque(format!("<{tag} (max depth reached)>"));
            }
            let mut truncated = BTreeMap::new();
            for (k, v) in map.into_iter() {
                truncated.insert(k, clamp(v, opts, depth + 1));
            }
            Value::Capture(tag, truncated)
        }
        other => other,
    }
}

fn truncate_string(s: String, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s;
    }
    let mut truncated: String = s.chars().take(max_len).collect();
    truncated.push_str("...");
    truncated
}

fn truncate_collection(items: Vec<Value>, opts: &CaptureOptions, depth: usize) -> Vec<Value> {
    let total = items.len();
    if total <= opts.max_collection_count {
        return items.into_iter().map(|v| clamp(v, opts, depth + 1)).collect();
    }
    let mut kept: Vec<Value> = items
        .into_iter()
        .take(opts.max_collection_count)
        .map(|v| clamp(v, opts, depth + 1))
        .collect();
    kept.push(Value::Opaque(format!("... ({} more)", total - opts.max_collection_count)));
    kept
}
