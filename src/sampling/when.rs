use std::sync::atomic::{AtomicU64, Ordering};

use crate::event::LogEvent;
use crate::filter::Filter;

use super::{EveryN, Sampler, SamplerStats};

/// Applies an Every-N rule only while `predicate(event)` is true; when
/// the predicate is false the event passes straight through (counted as
/// sampled, but without consuming the Every-N sequence) — so turning the
/// predicate off doesn't desynchronise the count the next time it turns
/// back on.
pub struct When<P: Fn(&LogEvent) -> bool + Send + Sync> {
    predicate: P,
    inner: EveryN,
    bypassed: AtomicU64,
}

impl<P: Fn(&LogEvent) -> bool + Send + Sync> When<P> {
    pub fn new(predicate: P, n: u64) -> When<P> {
        When {
            predicate,
            inner: EveryN::new(n),
            bypassed: AtomicU64::new(0),
        }
    }
}

impl<P: Fn(&LogEvent) -> bool + Send + Sync> Filter for When<P> {
    fn is_enabled(&self, event: &LogEvent) -> bool {
        if (self.predicate)(event) {
            self.inner.is_enabled(event)
        } else {
            self.bypassed.fetch_add(1, Ordering::Relaxed);
            true
        }
    }
}

impl<P: Fn(&LogEvent) -> bool + Send + Sync> Sampler for When<P> {
    fn stats(&self) -> SamplerStats {
        let inner = self.inner.stats();
        SamplerStats {
            sampled: inner.sampled + self.bypassed.load(Ordering::Relaxed),
            skipped: inner.skipped,
        }
    }

    fn reset(&self) {
        self.inner.reset();
        self.bypassed.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use crate::template::MessageTemplate;
    use std::sync::Arc;

    fn event_at(level: Level) -> LogEvent {
        LogEvent::new(level, Arc::new(MessageTemplate::parse("x").0))
    }

    #[test]
    fn sampling_only_applies_when_predicate_true() {
        let sampler = When::new(|e: &LogEvent| e.level == Level::Information, 2);
        assert!(sampler.is_enabled(&event_at(Level::Information))); // 1st matching: emits
        assert!(!sampler.is_enabled(&event_at(Level::Information))); // 2nd matching: skipped
        assert!(sampler.is_enabled(&event_at(Level::Error))); // non-matching: always passes
        assert!(sampler.is_enabled(&event_at(Level::Information))); // 3rd matching: emits
    }
}
