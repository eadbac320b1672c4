use std::sync::atomic::{AtomicU64, Ordering};

use crate::event::LogEvent;
use crate::filter::Filter;

use super::{Sampler, SamplerStats};

/// Emits the 1st, (N+1)-th, (2N+1)-th, … observed event — i.e. the first
/// event always emits, and thereafter every Nth one. `N == 1` emits every
/// event. `sampled == ceil(M / N)` over any stream of `M` events.
pub struct EveryN {
    n: u64,
    count: AtomicU64,
    sampled: AtomicU64,
    skipped: AtomicU64,
}

impl EveryN {
    pub fn new(n: u64) -> EveryN {
        EveryN {
            n: n.max(1),
            count: AtomicU64::new(0),
            sampled: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        }
    }
}

impl Filter for EveryN {
    fn is_enabled(&self, _event: &LogEvent) -> bool {
        let position = self.count.fetch_add(1, Ordering::Relaxed) + 1;
        let admit = (position - 1) % self.n == 0;
        if admit {
            self.sampled.fetch_add(1, Ordering::Relaxed);
        } else {
            self.skipped.fetch_add(1, Ordering::Relaxed);
        }
        admit
    }
}

impl Sampler for EveryN {
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
