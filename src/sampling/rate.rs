use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::event::LogEvent;
use crate::filter::Filter;

use super::{Sampler, SamplerStats};

/// Emits with probability `p`, using a per-filter PRNG seeded from a
/// non-deterministic source so concurrent filters don't contend on a
/// single global RNG.
pub struct Rate {
    p: f64,
    rng: Mutex<SmallRng>,
    sampled: AtomicU64,
    skipped: AtomicU64,
}

impl Rate {
    pub fn new(p: f64) -> Rate {
        Rate {
            p: p.clamp(0.0, 1.0),
            rng: Mutex::new(SmallRng::from_entropy()),
            sampled: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        }
    }
}

impl Filter for Rate {
    fn is_enabled(&self, _event: &LogEvent) -> bool {
        let admit = self.rng.lock().gen::<f64>() < self.p;
        if admit {
            self.sampled.fetch_add(1, Ordering::Relaxed);
        } else {
            self.skipped.fetch_add(1, Ordering::Relaxed);
        }
        admit
    }
}

impl Sampler for Rate {
    fn stats(&self) -> SamplerStats {
        SamplerStats {
            sampled: self.sampled.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
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
    fn rate_zero_never_emits() {
        let sampler = Rate::new(0.0);
        for _ in 0..100 {
            assert!(!sampler.is_enabled(&event()));
        }
    }

    #[test]
    fn rate_one_always_emits() {
        let sampler = Rate::new(1.0);
        for _ in 0..100 {
            assert!(sampler.is_enabled(&event()));
        }
    }

    #[test]
    fn rate_half_is_within_tolerance_over_many_samples() {
        let sampler = Rate::new(0.5);
        let n = 20_000;
        for _ in 0..n {
            sampler.is_enabled(&event());
        }
        let stats = sampler.stats();
        let observed = stats.sampled as f64 / n as f64;
        assert!((observed - 0.5).abs() < 0.05, "observed rate {observed} too far from 0.5");
    }
}
