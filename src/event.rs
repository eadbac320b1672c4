//! `LogEvent` construction and the positional argument → property
//! binding rule.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};

use crate::level::Level;
use crate::template::MessageTemplate;
use crate::value::Value;

/// A non-fatal binding anomaly, reported to self-log by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingWarning {
    /// More positional arguments were supplied than the template has
    /// distinct placeholders; the extra ones are still recorded, under
    /// synthetic `__extra_N` names.
    ExcessArguments { count: usize },
    /// Fewer positional arguments were supplied than placeholders; those
    /// placeholders are left unbound and render as `{Name}`.
    MissingArguments { names: Vec<String> },
}

/// An in-flight log event. Properties start with whatever the logger's
/// bound context carried (`ForContext`/`With`/context-stack), then the
/// pipeline binds positional arguments, then runs enrichers. Immutable
/// once it has cleared the filter chain.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub message_template: Arc<MessageTemplate>,
    pub properties: BTreeMap<String, Value>,
}

impl LogEvent {
    pub fn new(level: Level, message_template: Arc<MessageTemplate>) -> LogEvent {
        LogEvent {
            timestamp: Utc::now(),
            level,
            message_template,
            properties: BTreeMap::new(),
        }
    }

    pub fn render_message(&self) -> String {
        self.message_template.render(&self.properties)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Insert `key: value` only if `key` isn't already present. Used by
    /// enrichers whose policy is "do not overwrite".
    pub fn set_property_if_absent(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.properties.entry(key.into()).or_insert_with(|| value.into());
    }
}

/// Bind `args` to `template`'s distinct placeholder names in first-
/// occurrence order. A name appearing twice in
/// the template binds once — the earlier argument wins the position.
/// Excess args become `__extra_0`, `__extra_1`, …; missing placeholders
/// are left out of the map entirely (the renderer emits `{Name}` for
/// those).
pub fn bind_args(
    template: &MessageTemplate,
    args: Vec<Value>,
) -> (BTreeMap<String, Value>, Vec<BindingWarning>) {
    let names = template.property_names();
    let mut props = BTreeMap::new();
    let mut warnings = Vec::new();
    let mut args = args.into_iter();

    for (i, name) in names.iter().enumerate() {
        match args.next() {
            Some(value) => {
                props.insert(name.to_string(), value);
            }
            None => {
                // This name and every later one are unbound.
                let missing: Vec<String> = names[i..].iter().map(|n| n.to_string()).collect();
                warnings.push(BindingWarning::MissingArguments { names: missing });
                return (props, warnings);
            }
        }
    }

    let extras: Vec<Value> = args.collect();
    if !extras.is_empty() {
        warnings.push(BindingWarning::ExcessArguments {
            count: extras.len(),
        });
        for (i, value) in extras.into_iter().enumerate() {
            props.insert(format!("__extra_{i}"), value);
        }
    }

    (props, warnings)
}

pub fn duration_from_std(d: StdDuration) -> Value {
    Value::Duration(d)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(raw: &str) -> MessageTemplate {
        MessageTemplate::parse(raw).0
    }

    #[test]
    fn binds_positional_args_in_template_order() {
        let tmpl = template("User {UserId} bought {Item}");
        let (props, warnings) = bind_args(&tmpl, vec![Value::from(1i64), Value::from("widget")]);
        assert!(warnings.is_empty());
        assert_eq!(props["UserId"], Value::from(1i64));
        assert_eq!(props["Item"], Value::from("widget"));
    }

    #[test]
    fn repeated_name_binds_once_to_earlier_argument() {
        let tmpl = template("{X} and {X} again");
        let (props, warnings) = bind_args(&tmpl, vec![Value::from(1i64)]);
        assert!(warnings.is_empty());
        assert_eq!(props.len(), 1);
        assert_eq!(props["X"], Value::from(1i64));
    }

    #[test]
    fn excess_arguments_become_synthetic_extras() {
        let tmpl = template("{A}");
        let (props, warnings) =
            bind_args(&tmpl, vec![Value::from(1i64), Value::from(2i64), Value::from(3i64)]);
        assert_eq!(props["A"], Value::from(1i64));
        assert_eq!(props["__extra_0"], Value::from(2i64));
        assert_eq!(props["__extra_1"], Value::from(3i64));
        assert_eq!(warnings, vec![BindingWarning::ExcessArguments { count: 2 }]);
    }

    #[test]
    fn missing_arguments_leave_placeholder_unbound() {
        let tmpl = template("{A} {B} {C}");
        let (props, warnings) = bind_args(&tmpl, vec![Value::from(1i64)]);
        assert_eq!(props.len(), 1);
        assert!(!props.contains_key("B"));
        assert!(!props.contains_key("C"));
        match &warnings[0] {
            BindingWarning::MissingArguments { names } => {
                assert_eq!(names, &vec!["B".to_string(), "C".to_string()]);
            }
            _ => panic!("expected MissingArguments"),
        }
    }

    #[test]
    fn missing_placeholder_still_renders_literally() {
        let tmpl = template("Hello {Name}");
        let (props, _) = bind_args(&tmpl, vec![]);
        let event = LogEvent {
            properties: props,
            ..LogEvent::new(Level::Information, Arc::new(tmpl))
        };
        assert_eq!(event.render_message(), "Hello {Name}");
    }
}
