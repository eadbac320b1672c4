//! The path from a log call to a dispatched event: gate on level, resolve
//! (and cache) the template, bind positional arguments into properties,
//! materialize the logger's context-stack properties, run enrichers, run
//! filters, finalize capture-hinted properties, then hand the event to
//! every configured sink.
//!
//! Context-stack materialization always runs, unconditionally, regardless
//! of what enrichers (if any) are configured — a `ForContext`/`With`
//! property must never silently disappear just because a caller forgot to
//! register an enricher for it. Bound positional arguments win on key
//! collision, since they are the explicit, call-site data.
//!
//! Nothing past the level gate can throw back to the caller: parse
//! warnings, binding mismatches and sink panics are all routed to
//! `selflog` instead, so a logging call is never the reason a request
//! fails.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::capture::{clamp, destructure_capturable, destructure_log_value, CaptureOptions, Capturable, LogValue};
use crate::context::Context;
use crate::enrich::EnricherChain;
use crate::event::{BindingWarning, LogEvent};
use crate::filter::FilterChain;
use crate::level::{Level, LevelSwitch};
use crate::selflog;
use crate::sink::Sink;
use crate::template::render;
use crate::template::{MessageTemplate, TemplateCache};
use crate::value::Value;

/// One positional argument to a log call, carrying enough information to
/// pick the right capture dispatch (`LogValue`, `Capturable`, or a plain
/// scalar) without the three capabilities fighting over a single blanket
/// trait impl.
pub enum Arg<'a> {
    Value(Value),
    Capturable(&'a dyn Capturable),
    LogValue(&'a dyn LogValue),
}

impl<'a> Arg<'a> {
    pub fn scalar(value: impl Into<Value>) -> Arg<'static> {
        Arg::Value(value.into())
    }

    pub fn capturable(value: &'a dyn Capturable) -> Arg<'a> {
        Arg::Capturable(value)
    }

    pub fn log_value(value: &'a dyn LogValue) -> Arg<'a> {
        Arg::LogValue(value)
    }

    fn realize(&self, opts: &CaptureOptions) -> Value {
        match self {
            Arg::Value(v) => clamp(v.clone(), opts, 0),
            Arg::Capturable(c) => destructure_capturable(*c, opts, 0),
            Arg::LogValue(lv) => destructure_log_value(*lv, opts, 0),
        }
    }
}

/// Binds `args` to `template`'s distinct placeholder names, in the same
/// first-occurrence order and excess/missing handling as
/// `event::bind_args`, except each argument is realized into its captured
/// `Value` form as it is bound rather than arriving pre-converted.
pub fn bind_and_capture(
    template: &MessageTemplate,
    args: Vec<Arg>,
    opts: &CaptureOptions,
) -> (BTreeMap<String, Value>, Vec<BindingWarning>) {
    let names = template.property_names();
    let mut props = BTreeMap::new();
    let mut warnings = Vec::new();
    let mut args = args.into_iter();

    for (i, name) in names.iter().enumerate() {
        match args.next() {
            Some(arg) => {
                props.insert(name.to_string(), arg.realize(opts));
            }
            None => {
                let missing: Vec<String> = names[i..].iter().map(|n| n.to_string()).collect();
                warnings.push(BindingWarning::MissingArguments { names: missing });
                return (props, warnings);
            }
        }
    }

    let extras: Vec<Value> = args.map(|a| a.realize(opts)).collect();
    if !extras.is_empty() {
        warnings.push(BindingWarning::ExcessArguments { count: extras.len() });
        for (i, value) in extras.into_iter().enumerate() {
            props.insert(format!("__extra_{i}"), value);
        }
    }

    (props, warnings)
}

/// Replaces any property whose token carried the `$` hint with its
/// stringified form. The `@` hint needs no further work here: capturable
/// and `LogValue` arguments are already fully destructured by
/// `bind_and_capture`, and a plain scalar marked `@` has nothing deeper to
/// destructure into.
fn apply_capture_hints(event: &mut LogEvent) {
    let scalar_hinted: Vec<String> = event
        .message_template
        .tokens
        .iter()
        .filter(|t| render::wants_scalar(t) || render::wants_capture(t))
        .filter_map(|t| {
            if render::wants_scalar(t) {
                t.property_name().map(|n| n.to_string())
            } else {
                None
            }
        })
        .collect();

    for name in scalar_hinted {
        if let Some(value) = event.properties.get(&name) {
            let stringified = Value::Opaque(render::stringify(value));
            event.properties.insert(name, stringified);
        }
    }
}

/// The assembled processing path a `Logger` drives on every call: a level
/// switch, the shared template cache, an enricher chain, a filter chain
/// (predicates and samplers alike), capture limits, and the ordered list
/// of sinks an accepted event is dispatched to.
///
/// Cheap to clone: every field is itself an `Arc`, a lock-free handle, or
/// a `Vec` of `Arc`s. `Logger::sample_with` clones a pipeline to graft on
/// one extra filter without disturbing the shared original.
#[derive(Clone)]
pub struct Pipeline {
    pub level_switch: LevelSwitch,
    pub template_cache: Arc<TemplateCache>,
    pub capture_options: CaptureOptions,
    pub enrichers: EnricherChain,
    pub filters: FilterChain,
    pub sinks: Vec<Arc<dyn Sink>>,
}

impl Pipeline {
    /// `true` if `level` currently clears the minimum-level gate; lets
    /// `Logger` skip building an `Arg` vector at all for a disabled level.
    pub fn is_enabled(&self, level: Level) -> bool {
        level >= self.level_switch.level()
    }

    pub fn process(&self, level: Level, ctx: &Context, raw_template: &str, args: Vec<Arg>) {
        if !self.is_enabled(level) {
            return;
        }

        let (template, _from_cache, parse_warnings) = self.template_cache.get_or_parse(raw_template);
        for warning in &parse_warnings {
            selflog::emit("template", &format!("{warning:?}"));
        }

        let (props, bind_warnings) = bind_and_capture(&template, args, &self.capture_options);
        for warning in &bind_warnings {
            selflog::emit("event", &format!("{warning:?}"));
        }

        let mut event = LogEvent::new(level, template);
        event.properties = props;

        for (key, value) in ctx.materialize() {
            event.set_property_if_absent(key, value);
        }

        self.enrichers.run(&mut event, ctx);

        if !self.filters.is_enabled(&event) {
            return;
        }

        apply_capture_hints(&mut event);

        for sink in &self.sinks {
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| sink.emit(&event)));
            if outcome.is_err() {
                selflog::emit("pipeline", "a sink panicked while emitting; isolated from other sinks");
            }
        }
    }
}
