use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::event::LogEvent;
use crate::filter::Filter;

use super::{Sampler, SamplerStats};

struct Window {
    started_at: Instant,
    count: u64,
    probability: f64,
}

/// Adjusts an emission probability in a feedback loop so the long-run
/// emission rate tracks `target_per_second`, measured over a sliding
/// one-second window.
pub struct Adaptive {
    target_per_second: f64,
    window: Mutex<Window>,
    rng: Mutex<SmallRng>,
    sampled: AtomicU64,
    skipped: AtomicU64,
}

impl Adaptive {
    pub fn new(target_per_second: f64) -> Adaptive {
        Adaptive {
            target_per_second: target_per_second.max(0.0),
            window: Mutex::new(Window {
                started_at: Instant::now(),
                count: 0,
                probability: 1.0,
            }),
            rng: Mutex::new(SmallRng::from_entropy()),
            sampled: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        }
    }

    pub fn current_probability(&self) -> f64 {
        self.window.lock().probability
    }
}

impl Filter for Adaptive {
    fn is_enabled(&self, _event: &LogEvent) -> bool {
        let probability = {
            let mut window = self.window.lock();
            if window.started_at.elapsed() >= Duration::from_secs(1) {
                let observed_rate = window.count as f64 / window.started_at.elapsed().as_secs_f64();
                if observed_rate > 0.0 {
                    let adjustment = self.target_per_second / observed_rate;
                    window.probability = (window.probability * adjustment).clamp(0.0, 1.0);
                }
                window.started_at = Instant::now();
                window.count = 0;
            }
            window.count += 1;
            window.probability
        };

        let admit = self.rng.lock().gen::<f64>() < probability;
        if admit {
            self.sampled.fetch_add(1, Ordering::Relaxed);
        } else {
            self.skipped.fetch_add(1, Ordering::Relaxed);
        }
        admit
    }
}

impl Sampler for Adaptive {
    fn stats(&self) -> SamplerStats {
        SamplerStats {
            sampled: self.sampled.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        let mut window = self.window.lock();
        window.started_at = Instant::now();
        window.count = 0;
        window.probability = 1.0;
        self.sampled.store(0, Ordering::Relaxed);
        self.skipped.store(0, Ordering::Relaxed);
    }
}
