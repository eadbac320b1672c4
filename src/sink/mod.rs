//! Output destinations for completed `LogEvent`s.
//!
//! Concrete transports (console formatting, HTTP, file rolling) are out of
//! scope here; this module provides the wrappers that generalise any
//! downstream `Sink` (async batching, durable on-disk buffering, routing)
//! plus two fixtures, `MemorySink` and `StderrSink`, for dev/test use and as
//! a fallback writer path for when no real transport is configured.

mod async_sink;
mod durable;
mod fixtures;
mod router;

pub use async_sink::{AsyncSink, AsyncSinkConfig, AsyncSinkHandle, AsyncSinkMetrics, OverflowStrategy};
pub use durable::{DurableSink, DurableSinkConfig, DurableSinkMetrics};
pub use fixtures::{MemorySink, StderrSink};
pub use router::{RouteMode, Router};

use crate::errors::Result;
use crate::event::LogEvent;

/// An output destination for log events.
///
/// `emit` is never fallible to the caller: a sink that can fail (I/O, a
/// network call) must swallow its own errors and report them through
/// `selflog` or an `on_error` callback, so the hot path never raises.
pub trait Sink: Send + Sync {
    fn emit(&self, event: &LogEvent);

    /// Flushes and releases any resources. Called at most once per sink
    /// lifetime by the owning `Logger`/`Config`.
    fn close(&self) -> Result<()> {
        Ok(())
    }
}

impl<F: Fn(&LogEvent) + Send + Sync> Sink for F {
    fn emit(&self, event: &LogEvent) {
        self(event)
    }
}
