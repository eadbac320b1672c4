//! Filter chain: boolean predicates over events; the first rejecting
//! filter drops the event.

pub mod chain;
pub mod predicate;

pub use chain::FilterChain;
pub use predicate::{CompositeAnd, CompositeNot, CompositeOr, LevelFilter, PropertyMatcher};

use crate::event::LogEvent;

/// A boolean predicate over a fully-bound, enriched event. Sampling
/// filters also implement this trait so they compose uniformly
/// with plain predicates in a `FilterChain`.
pub trait Filter: Send + Sync {
    /// `true` admits the event; `false` drops it. Samplers must update
    /// their counters here even when returning `false` — and even when an
    /// earlier filter in the chain would have rejected the event first,
    /// since the chain short-circuits on the first reject.
    fn is_enabled(&self, event: &LogEvent) -> bool;
}

impl<F: Fn(&LogEvent) -> bool + Send + Sync> Filter for F {
    fn is_enabled(&self, event: &LogEvent) -> bool {
        self(event)
    }
}
