use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::event::LogEvent;
use crate::level::Level;
use crate::template::MessageTemplate;

use super::{Sampler, SamplerStats};

/// Periodically emits a synthetic `summary` event describing a sampler's
/// `sampled`/`skipped` counts since the last summary.
pub struct SummaryEmitter {
    sampler: Arc<dyn Sampler>,
    interval: Duration,
    last_emitted: Mutex<(Instant, SamplerStats)>,
}

impl SummaryEmitter {
    pub fn new(sampler: Arc<dyn Sampler>, interval: Duration) -> SummaryEmitter {
        SummaryEmitter {
            sampler,
            interval,
            last_emitted: Mutex::new((Instant::now(), SamplerStats::default())),
        }
    }

    /// Returns a summary event if `interval` has elapsed since the last
    /// one, resetting the elapsed-time clock (but not the sampler's own
    /// cumulative counters).
    pub fn maybe_emit(&self) -> Option<LogEvent> {
        let mut last = self.last_emitted.lock();
        if last.0.elapsed() < self.interval {
            return None;
        }
        let current = self.sampler.stats();
        let since_last = SamplerStats {
            sampled: current.sampled.saturating_sub(last.1.sampled),
            skipped: current.skipped.saturating_sub(last.1.skipped),
        };
        *last = (Instant::now(), current);

        let (template, _) = MessageTemplate::parse("sampling summary: {Sampled} sampled, {Skipped} skipped");
        let mut event = LogEvent::new(Level::Information, Arc::new(template));
        event.set_property("Sampled", since_last.sampled as i64);
        event.set_property("Skipped", since_last.skipped as i64);
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;
    use crate::sampling::EveryN;

    #[test]
    fn no_summary_before_interval_elapses() {
        let emitter = SummaryEmitter::new(Arc::new(EveryN::new(2)), Duration::from_secs(60));
        assert!(emitter.maybe_emit().is_none());
    }

    #[test]
    fn summary_reports_deltas_since_last_emission() {
        let sampler = Arc::new(EveryN::new(2));
        let emitter = SummaryEmitter::new(sampler.clone(), Duration::from_millis(1));
        for _ in 0..4 {
            sampler.is_enabled(&dummy_event());
        }
        std::thread::sleep(Duration::from_millis(5));
        let summary = emitter.maybe_emit().expect("interval elapsed");
        assert_eq!(summary.properties["Sampled"], crate::value::Value::from(2i64));
        assert_eq!(summary.properties["Skipped"], crate::value::Value::from(2i64));

        // A second, immediate call should report zero deltas rather than
        // the cumulative totals again.
        for _ in 0..2 {
            sampler.is_enabled(&dummy_event());
        }
        std::thread::sleep(Duration::from_millis(5));
        let second = emitter.maybe_emit().expect("interval elapsed again");
        assert_eq!(second.properties["Sampled"], crate::value::Value::from(1i64));
        assert_eq!(second.properties["Skipped"], crate::value::Value::from(1i64));
    }

    fn dummy_event() -> LogEvent {
        LogEvent::new(Level::Information, Arc::new(MessageTemplate::parse("x").0))
    }
}
