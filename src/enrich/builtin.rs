//! Built-in enrichers: timestamp (a no-op refresher since `LogEvent::new`
//! already stamps `Utc::now()`, kept for callers that construct an event
//! earlier and enrich later), machine name, and callsite. Context-stack
//! materialization is not an enricher — `Pipeline::process` runs it
//! unconditionally before the enricher chain, since it must never depend
//! on a caller remembering to register it.

use chrono::Utc;

use crate::context::Context;
use crate::event::LogEvent;
use crate::value::Value;

use super::Enricher;

/// Refreshes `timestamp` to the moment enrichment runs. Most pipelines
/// don't need this (the event is already stamped at construction) but
/// it's offered for pipelines that enrich well after construction, e.g.
/// after waiting on a bounded queue.
pub struct TimestampEnricher;

impl Enricher for TimestampEnricher {
    fn enrich(&self, event: &mut LogEvent, _ctx: &Context) {
        event.timestamp = Utc::now();
    }

    fn overwrite(&self) -> bool {
        true
    }
}

/// Adds a `MachineName` property from the process's hostname, falling
/// back to `"unknown"` when the platform can't report one.
pub struct MachineNameEnricher {
    hostname: String,
}

impl MachineNameEnricher {
    pub fn new() -> MachineNameEnricher {
        let hostname = std::env::var("HOSTNAME")
            .or_else(|_| std::env::var("COMPUTERNAME"))
            .unwrap_or_else(|_| "unknown".to_string());
        MachineNameEnricher { hostname }
    }
}

impl Default for MachineNameEnricher {
    fn default() -> Self {
        MachineNameEnricher::new()
    }
}

impl Enricher for MachineNameEnricher {
    fn enrich(&self, event: &mut LogEvent, _ctx: &Context) {
        event.set_property_if_absent("MachineName", Value::from(self.hostname.clone()));
    }
}

/// Adds `SourceFile`/`SourceLine` properties from a callsite captured at
/// the macro/call-site layer above this crate (not in scope here — the
/// core only defines the property shape, callers supply the values).
pub struct CallsiteEnricher {
    pub file: &'static str,
    pub line: u32,
}

impl Enricher for CallsiteEnricher {
    fn enrich(&self, event: &mut LogEvent, _ctx: &Context) {
        event.set_property_if_absent("SourceFile", Value::from(self.file));
        event.set_property_if_absent("SourceLine", Value::from(self.line as i64));
    }
}
