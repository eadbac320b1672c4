use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::event::LogEvent;
use crate::filter::Filter;
use crate::util::lru::LruMap;

use super::{Sampler, SamplerStats};

/// Every-N counting shared across all loggers that sample under the same
/// `key`. Per-key counters live in a bounded LRU so an unbounded number of
/// distinct group keys can't grow this filter's memory without limit —
/// the least-recently-seen group's counter is simply evicted and restarts
/// at zero the next time that key reappears.
pub struct Group {
    n: u64,
    counters: Mutex<LruMap<String, u64>>,
    sampled: AtomicU64,
    skipped: AtomicU64,
}

impl Group {
    pub fn new(n: u64, lru_capacity: usize) -> Group {
        Group {
            n: n.max(1),
            counters: Mutex::new(LruMap::new(lru_capacity.max(1))),
            sampled: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        }
    }

    /// Apply the Every-N rule against `key`'s shared counter.
    pub fn is_enabled_for_key(&self, key: &str) -> bool {
        let mut counters = self.counters.lock();
        let position = match counters.get(&key.to_string()) {
            Some(count) => *count + 1,
            None => 1,
        };
        counters.put(key.to_string(), position);
        let admit = (position - 1) % self.n == 0;
        if admit {
            self.sampled.fetch_add(1, Ordering::Relaxed);
        } else {
            self.skipped.fetch_add(1, Ordering::Relaxed);
        }
        admit
    }
}

impl Filter for Group {
    /// Reads the group key from the event's `GroupKey` property (set by
    /// the caller before the filter chain runs, typically via
    /// `ForContext("GroupKey", ...)`); events without one always admit.
    fn is_enabled(&self, event: &LogEvent) -> bool {
        match event.properties.get("GroupKey") {
            Some(crate::value::Value::String(key)) => self.is_enabled_for_key(key),
            _ => true,
        }
    }
}

impl Sampler for Group {
    fn stats(&self) -> SamplerStats {
        SamplerStats {
            sampled: self.sampled.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.counters.lock().clear();
        self.sampled.store(0, Ordering::Relaxed);
        self.skipped.store(0, Ordering::Relaxed);
    }
}
