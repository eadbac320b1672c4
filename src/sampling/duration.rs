use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::event::LogEvent;
use crate::filter::Filter;

use super::{Sampler, SamplerStats};

/// Emits at most once per interval `d`; tracks the last-emit instant
/// monotonically so wall-clock adjustments can't cause a double-emit.
pub struct DurationSampler {
    interval: Duration,
    last_emit: Mutex<Option<Instant>>,
    sampled: AtomicU64,
    skipped: AtomicU64,
}

impl DurationSampler {
    pub fn new(interval: Duration) -> DurationSampler {
        DurationSampler {
            interval,
            last_emit: Mutex::new(None),
            sampled: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        }
    }
}

impl Filter for DurationSampler {
    fn is_enabled(&self, _event: &LogEvent) -> bool {
        let now = Instant::now();
        let mut last_emit = self.last_emit.lock();
        let admit = match *last_emit {
            Some(last) => now.duration_since(last) >= self.interval,
            None => true,
        };
        if admit {
            *last_emit = Some(now);
            self.sampled.fetch_add(1, Ordering::Relaxed);
        } else {
            self.skipped.fetch_add(1, Ordering::Relaxed);
        }
        admit
    }
}

impl Sampler for DurationSampler {
    fn stats(&self) -> SamplerStats {
        SamplerStats {
            sampled: self.sampled.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        *self.last_emit.lock() = None;
        self.sampled.store(0, Ordering::Relaxed);
        self.skipped.store(0, Ordering::Relaxed);
    }
}
