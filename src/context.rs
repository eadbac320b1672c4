//! Context stack: an immutable linked list of `(key, value)` frames
//! propagated via a caller-supplied context carrier.
//!
//! Modelled as immutable cons-cells sharing structure through `Arc`, so
//! `PushProperty` is allocation-light and safe to share across threads
//! without locking — the carrier itself is just a cheap `Clone`.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::value::Value;

/// Well-known context key the deadline-awareness enricher reads.
pub const DEADLINE_KEY: &str = "__deadline_at";
/// Well-known context key holding the deadline's total budget, in
/// seconds, so remaining/total percentage thresholds can be computed.
pub const DEADLINE_TOTAL_SECONDS_KEY: &str = "__deadline_total_seconds";

#[derive(Debug)]
struct Frame {
    key: String,
    value: Value,
    parent: Option<Arc<Frame>>,
}

/// An immutable context carrier. `Context::root()` has no frames;
/// `push_property` returns a new carrier sharing the old one's tail.
#[derive(Debug, Clone, Default)]
pub struct Context {
    head: Option<Arc<Frame>>,
}

impl Context {
    pub fn root() -> Context {
        Context { head: None }
    }

    /// `PushProperty(ctx, key, value) -> ctx'`.
    pub fn push_property(&self, key: impl Into<String>, value: impl Into<Value>) -> Context {
        Context {
            head: Some(Arc::new(Frame {
                key: key.into(),
                value: value.into(),
                parent: self.head.clone(),
            })),
        }
    }

    /// Look up `key`, walking tail-to-head so the innermost (most
    /// recently pushed) frame wins on collision.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut frame = self.head.as_deref();
        while let Some(f) = frame {
            if f.key == key {
                return Some(&f.value);
            }
            frame = f.parent.as_deref();
        }
        None
    }

    /// Materialise every frame into an ordered list, innermost first —
    /// the order the pipeline binds context-stack properties in.
    pub fn materialize(&self) -> Vec<(String, Value)> {
        let mut out = Vec::new();
        let mut seen = std::collections::HashSet::new();
        let mut frame = self.head.as_deref();
        while let Some(f) = frame {
            // Keys prefixed `__` are carrier-internal (e.g. the deadline
            // slot) and never surface as ordinary event properties.
            if !f.key.starts_with("__") && seen.insert(f.key.clone()) {
                out.push((f.key.clone(), f.value.clone()));
            }
            frame = f.parent.as_deref();
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Attach a deadline: an absolute instant plus the total budget that
    /// was allotted, so the deadline-awareness enricher can compute
    /// both absolute and percentage remaining-time thresholds.
    pub fn push_deadline(&self, at: DateTime<Utc>, total: std::time::Duration) -> Context {
        self.push_property(DEADLINE_KEY, Value::Timestamp(at))
            .push_property(DEADLINE_TOTAL_SECONDS_KEY, Value::Float64(total.as_secs_f64()))
    }

    /// Read back the deadline pushed by `push_deadline`, if any.
    pub fn deadline(&self) -> Option<(DateTime<Utc>, std::time::Duration)> {
        let at = match self.get(DEADLINE_KEY)? {
            Value::Timestamp(t) => *t,
            _ => return None,
        };
        let total = match self.get(DEADLINE_TOTAL_SECONDS_KEY)? {
            Value::Float64(secs) => std::time::Duration::from_secs_f64(*secs),
            _ => return None,
        };
        Some((at, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_context_has_no_properties() {
        let ctx = Context::root();
        assert!(ctx.is_empty());
        assert!(ctx.get("anything").is_none());
    }

    #[test]
    fn push_then_lookup() {
        let ctx = Context::root().push_property("request_id", "abc");
        assert_eq!(ctx.get("request_id"), Some(&Value::from("abc")));
    }

    #[test]
    fn innermost_frame_wins_on_collision() {
        let ctx = Context::root()
            .push_property("k", "outer")
            .push_property("k", "inner");
        assert_eq!(ctx.get("k"), Some(&Value::from("inner")));
    }

    #[test]
    fn pushing_never_mutates_the_parent_carrier() {
        let outer = Context::root().push_property("k", "outer");
        let inner = outer.push_property("k", "inner");
        assert_eq!(outer.get("k"), Some(&Value::from("outer")));
        assert_eq!(inner.get("k"), Some(&Value::from("inner")));
    }

    #[test]
    fn deadline_round_trips() {
        let at = Utc::now();
        let ctx = Context::root().push_deadline(at, std::time::Duration::from_secs(30));
        let (read_at, read_total) = ctx.deadline().unwrap();
        assert_eq!(read_at, at);
        assert_eq!(read_total, std::time::Duration::from_secs(30));
    }

    #[test]
    fn materialize_dedups_keeping_innermost_first() {
        let ctx = Context::root()
            .push_property("a", 1i64)
            .push_property("b", 2i64)
            .push_property("a", 3i64);
        let props = ctx.materialize();
        assert_eq!(props[0], ("a".to_string(), Value::from(3i64)));
        assert!(props.iter().any(|(k, _)| k == "b"));
        assert_eq!(props.len(), 2);
    }
}
