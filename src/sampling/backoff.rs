use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::event::LogEvent;
use crate::filter::Filter;
use crate::util::lru::LruMap;

use super::{Sampler, SamplerStats};

struct KeyState {
    occurrence: u64,
    next_threshold: u64,
}

/// Emits on occurrence numbers that form an exponential sequence
/// `1, ceil(factor), ceil(factor^2), …` per key; state lives in a bounded
/// LRU keyed by `key`. `reset()` restarts the sequence for every key.
pub struct Backoff {
    factor: f64,
    state: Mutex<LruMap<String, KeyState>>,
    sampled: AtomicU64,
    skipped: AtomicU64,
}

impl Backoff {
    pub fn new(factor: f64, lru_capacity: usize) -> Backoff {
        Backoff {
            factor: factor.max(1.0),
            state: Mutex::new(LruMap::new(lru_capacity.max(1))),
            sampled: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        }
    }

    pub fn is_enabled_for_key(&self, key: &str) -> bool {
        let mut state = self.state.lock();
        let key = key.to_string();
        let current = state.get(&key).map(|s| KeyState {
            occurrence: s.occurrence,
            next_threshold: s.next_threshold,
        });
        let mut entry = current.unwrap_or(KeyState {
            occurrence: 0,
            next_threshold: 1,
        });
        entry.occurrence += 1;

        let admit = entry.occurrence == entry.next_threshold;
        if admit {
            let next = (entry.next_threshold as f64 * self.factor).ceil() as u64;
            entry.next_threshold = next.max(entry.next_threshold + 1);
        }
        state.put(key, KeyState {
            occurrence: entry.occurrence,
            next_threshold: entry.next_threshold,
        });

        if admit {
            self.sampled.fetch_add(1, Ordering::Relaxed);
        } else {
            self.skipped.fetch_add(1, Ordering::Relaxed);
        }
        admit
    }
}

impl Filter for Backoff {
    fn is_enabled(&self, event: &LogEvent) -> bool {
        match event.properties.get("GroupKey") {
            Some(crate::value::Value::String(key)) => self.is_enabled_for_key(key),
            _ => true,
        }
    }
}

impl Sampler for Backoff {
    fn stats(&self) -> SamplerStats {
        SamplerStats {
            sampled: self.sampled.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.state.lock().clear();
        self.sampled.store(0, Ordering::Relaxed);
        self.skipped.store(0, Ordering::Relaxed);
    }
}
