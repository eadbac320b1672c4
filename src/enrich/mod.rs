//! Enricher chain: ambient properties attached to an event before
//! filtering.

pub mod builtin;
pub mod chain;
pub mod deadline;

pub use builtin::{CallsiteEnricher, MachineNameEnricher, TimestampEnricher};
pub use chain::EnricherChain;
pub use deadline::DeadlineEnricher;

use crate::context::Context;
use crate::event::LogEvent;

/// A component that adds properties to an event before filtering. Each
/// enricher declares its own overwrite policy.
pub trait Enricher: Send + Sync {
    /// Mutate `event` in place. `ctx` is the logger's bound context
    /// carrier, supplied so enrichers like the deadline one can inspect
    /// caller-supplied values (a deadline) without the pipeline having to
    /// know about every enricher's specific needs.
    fn enrich(&self, event: &mut LogEvent, ctx: &Context);

    /// `true` if this enricher may replace a property that's already
    /// present; `false` (the default) means it only fills in properties
    /// absent from the event.
    fn overwrite(&self) -> bool {
        false
    }
}

/// Set `key` on `event` respecting `enricher.overwrite()`.
pub fn apply_property(event: &mut LogEvent, enricher: &dyn Enricher, key: impl Into<String>, value: impl Into<crate::value::Value>) {
    if enricher.overwrite() {
        event.set_property(key, value);
    } else {
        event.set_property_if_absent(key, value);
    }
}
