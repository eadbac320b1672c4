use std::sync::atomic::{AtomicU64, Ordering};

use crate::event::LogEvent;
use crate::filter::Filter;

use super::{Sampler, SamplerStats};

/// Emits only the first `n` observed events, then drops indefinitely
/// until `reset()`. `sampled == min(M, N)` over any stream of `M` events.
pub struct FirstN {
    n: u64,
    count: AtomicU64,
    sampled: AtomicU64,
    skipped: AtomicU64,
}

impl FirstN {
    pub fn new(n: u64) -> FirstN {
        FirstN {
            n,
            count: AtomicU64::new(0),
            sampled: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        }
    }
}

impl Filter for FirstN {
    fn is_enabled(&self, _event: &LogEvent) -> bool {
        let position = self.count.fetch_add(1, Ordering::Relaxed);
        let admit = position < self.n;
        if admit {
            self.sampled.fetch_add(1, Ordering::Relaxed);
        } else {
            self.skipped.fetch_add(1, Ordering::Relaxed);
        }
        admit
    }
}

impl Sampler for FirstN {
    fn stats(&self) -> SamplerStats {
        SamplerStats {
            sampled: self.sampled.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
        self.sampled.store(0, Ordering::Relaxed);
        self.skipped.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use crate::template::MessageTemplate;
    use std::sync::Arc;

    fn event() -> LogEvent {
        LogEvent::new(Level::Information, Arc::new(MessageTemplate::parse("x").0))
    }

    #[test]
    fn emits_exactly_first_n_then_drops() {
        let sampler = FirstN::new(3);
        let admitted: Vec<bool> = (0..10).map(|_| sampler.is_enabled(&event())).collect();
        assert_eq!(admitted, vec![true, true, true, false, false, false, false, false, false, false]);
        assert_eq!(sampler.stats(), SamplerStats { sampled: 3, skipped: 7 });
    }

    #[test]
    fn fewer_events_than_n_all_emit() {
        let sampler = FirstN::new(10);
        for _ in 0..4 {
            assert!(sampler.is_enabled(&event()));
        }
        assert_eq!(sampler.stats().sampled, 4);
    }

    #[test]
    fn reset_allows_another_first_n_run() {
        let sampler = FirstN::new(1);
        assert!(sampler.is_enabled(&event()));
        assert!(!sampler.is_enabled(&event()));
        sampler.reset();
        assert!(sampler.is_enabled(&event()));
    }
}
