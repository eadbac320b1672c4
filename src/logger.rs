//! The `Logger` facade: the call-site API built on top of `Pipeline`.
//!
//! A `Logger` is a cheap handle (an `Arc<Pipeline>` plus a `Context`).
//! `ForContext`/`With`/`WithContext` and the `Sample*` family all return a
//! new `Logger` rather than mutating the receiver, so a request handler
//! can freely fork loggers per request/operation without loggers
//! stepping on each other's bound state.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::capture::{Capturable, LogValue};
use crate::context::Context;
use crate::filter::LevelFilter;
use crate::level::Level;
use crate::pipeline::{Arg, Pipeline};
use crate::sampling::{Backoff, DurationSampler, EveryN, FirstN, Group, Rate};
use crate::value::Value;

/// A bound logging handle: a shared `Pipeline` plus whatever context-stack
/// frames `ForContext`/`With`/`WithContext` have accumulated.
#[derive(Clone)]
pub struct Logger {
    pipeline: Arc<Pipeline>,
    context: Context,
}

impl Logger {
    pub fn new(pipeline: Arc<Pipeline>) -> Logger {
        Logger {
            pipeline,
            context: Context::root(),
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn is_enabled(&self, level: Level) -> bool {
        self.pipeline.is_enabled(level)
    }

    fn log(&self, level: Level, template: &str, args: Vec<Arg>) {
        self.pipeline.process(level, &self.context, template, args);
    }

    pub fn verbose(&self, template: &str, args: Vec<Arg>) {
        self.log(Level::Verbose, template, args)
    }
    pub fn debug(&self, template: &str, args: Vec<Arg>) {
        self.log(Level::Debug, template, args)
    }
    pub fn information(&self, template: &str, args: Vec<Arg>) {
        self.log(Level::Information, template, args)
    }
    pub fn warning(&self, template: &str, args: Vec<Arg>) {
        self.log(Level::Warning, template, args)
    }
    pub fn error(&self, template: &str, args: Vec<Arg>) {
        self.log(Level::Error, template, args)
    }
    pub fn fatal(&self, template: &str, args: Vec<Arg>) {
        self.log(Level::Fatal, template, args)
    }

    /// Returns a derived logger with one more property on its context
    /// stack. The innermost push wins on key collision; the receiver is
    /// untouched.
    pub fn for_context(&self, key: impl Into<String>, value: impl Into<Value>) -> Logger {
        Logger {
            pipeline: self.pipeline.clone(),
            context: self.context.push_property(key, value),
        }
    }

    /// Alias for `for_context`, matching the common "with a property
    /// bound" naming at call sites.
    pub fn with(&self, key: impl Into<String>, value: impl Into<Value>) -> Logger {
        self.for_context(key, value)
    }

    /// Returns a derived logger that replaces the context stack entirely,
    /// e.g. to hand a request handler a context assembled elsewhere.
    pub fn with_context(&self, context: Context) -> Logger {
        Logger {
            pipeline: self.pipeline.clone(),
            context,
        }
    }

    /// Binds a `SourceContext` property to `T`'s type name, the way a
    /// per-module or per-type logger is usually obtained.
    pub fn for_type<T>(&self) -> Logger {
        self.for_context("SourceContext", std::any::type_name::<T>())
    }

    /// Attaches a deadline the `DeadlineEnricher`, if configured, can read
    /// back via `Context::deadline`.
    pub fn with_deadline(&self, at: DateTime<Utc>, total: Duration) -> Logger {
        Logger {
            pipeline: self.pipeline.clone(),
            context: self.context.push_deadline(at, total),
        }
    }

    /// Returns a derived logger whose filter chain additionally runs
    /// `sampler`. Cloning the pipeline (cheap: every field is an `Arc` or
    /// lock-free handle) keeps the receiver's own filter chain untouched.
    pub fn sample_with(&self, sampler: Arc<dyn crate::filter::Filter>) -> Logger {
        let mut pipeline = (*self.pipeline).clone();
        pipeline.filters = pipeline.filters.with(sampler);
        Logger {
            pipeline: Arc::new(pipeline),
            context: self.context.clone(),
        }
    }

    /// Raises this logger's effective floor without touching the shared
    /// `LevelSwitch` other loggers may be reading.
    pub fn sample_minimum_level(&self, minimum: Level) -> Logger {
        self.sample_with(Arc::new(LevelFilter::new(minimum)))
    }

    pub fn sample_every_n(&self, n: u64) -> Logger {
        self.sample_with(Arc::new(EveryN::new(n)))
    }

    pub fn sample_rate(&self, p: f64) -> Logger {
        self.sample_with(Arc::new(Rate::new(p)))
    }

    pub fn sample_first_n(&self, n: u64) -> Logger {
        self.sample_with(Arc::new(FirstN::new(n)))
    }

    pub fn sample_duration(&self, interval: Duration) -> Logger {
        self.sample_with(Arc::new(DurationSampler::new(interval)))
    }

    pub fn sample_group(&self, n: u64, lru_capacity: usize) -> Logger {
        self.sample_with(Arc::new(Group::new(n, lru_capacity)))
    }

    pub fn sample_backoff(&self, factor: f64, lru_capacity: usize) -> Logger {
        self.sample_with(Arc::new(Backoff::new(factor, lru_capacity)))
    }
}

/// Convenience constructors so call sites write `arg(42)`/`capture(&user)`
/// instead of the fully qualified `Arg::scalar`/`Arg::capturable`.
pub fn arg(value: impl Into<Value>) -> Arg<'static> {
    Arg::scalar(value)
}

pub fn capture(value: &dyn Capturable) -> Arg<'_> {
    Arg::capturable(value)
}

pub fn log_value(value: &dyn LogValue) -> Arg<'_> {
    Arg::log_value(value)
}
