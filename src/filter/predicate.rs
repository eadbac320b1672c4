//! Plain predicate filters: level gate, property matcher, and AND/OR/NOT
//! composites.

use std::sync::Arc;

use crate::event::LogEvent;
use crate::level::{Level, LevelSwitch};
use crate::value::Value;

use super::Filter;

/// Rejects any event below the wrapped minimum level. Used as a filter
/// so it composes with the rest of the chain even though the pipeline
/// also applies a cheaper level gate before building the event at all
/// — this one exists for loggers that want a *second*,
/// filter-chain-local minimum (e.g. a `Sample*` derived logger raising
/// its own floor without touching the shared switch).
pub struct LevelFilter {
    switch: LevelSwitch,
}

impl LevelFilter {
    pub fn new(minimum: Level) -> LevelFilter {
        LevelFilter {
            switch: LevelSwitch::new(minimum),
        }
    }

    pub fn shared(switch: LevelSwitch) -> LevelFilter {
        LevelFilter { switch }
    }
}

impl Filter for LevelFilter {
    fn is_enabled(&self, event: &LogEvent) -> bool {
        event.level >= self.switch.level()
    }
}

/// Rejects events whose property `key` doesn't equal `expected`, or that
/// lack the property entirely.
pub struct PropertyMatcher {
    key: String,
    expected: Value,
}

impl PropertyMatcher {
    pub fn new(key: impl Into<String>, expected: impl Into<Value>) -> PropertyMatcher {
        PropertyMatcher {
            key: key.into(),
            expected: expected.into(),
        }
    }
}

impl Filter for PropertyMatcher {
    fn is_enabled(&self, event: &LogEvent) -> bool {
        event.properties.get(&self.key) == Some(&self.expected)
    }
}

/// All children must accept. Every child still observes the call (their
/// counters advance) even once one has rejected.
pub struct CompositeAnd {
    children: Vec<Arc<dyn Filter>>,
}

impl CompositeAnd {
    pub fn new(children: Vec<Arc<dyn Filter>>) -> CompositeAnd {
        CompositeAnd { children }
    }
}

impl Filter for CompositeAnd {
    fn is_enabled(&self, event: &LogEvent) -> bool {
        let mut all_admit = true;
        for child in &self.children {
            if !child.is_enabled(event) {
                all_admit = false;
            }
        }
        all_admit
    }
}

/// Any child accepting admits the event. Children short-circuit on first
/// accept.
pub struct CompositeOr {
    children: Vec<Arc<dyn Filter>>,
}

impl CompositeOr {
    pub fn new(children: Vec<Arc<dyn Filter>>) -> CompositeOr {
        CompositeOr { children }
    }
}

impl Filter for CompositeOr {
    fn is_enabled(&self, event: &LogEvent) -> bool {
        for child in &self.children {
            if child.is_enabled(event) {
                return true;
            }
        }
        false
    }
}

pub struct CompositeNot {
    child: Arc<dyn Filter>,
}

impl CompositeNot {
    pub fn new(child: Arc<dyn Filter>) -> CompositeNot {
        CompositeNot { child }
    }
}

impl Filter for CompositeNot {
    fn is_enabled(&self, event: &LogEvent) -> bool {
        !self.child.is_enabled(event)
    }
}
