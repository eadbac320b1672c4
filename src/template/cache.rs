//! Sharded, bounded template cache.
//!
//! Each shard is an independent `util::lru::LruMap` behind its own
//! `parking_lot::Mutex`, one lock per independent piece of state rather
//! than one lock over everything. Shard selection is
//! `util::fnv::shard_index`, so lookups never need to cross shard
//! boundaries.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::errors::{LogCoreError, Result};
use crate::util::fnv::shard_index;
use crate::util::lru::LruMap;

use super::parser::tokenize;
use super::MessageTemplate;

struct Entry {
    template: Arc<MessageTemplate>,
    inserted_at: Instant,
}

struct Shard {
    lru: Mutex<LruMap<String, Entry>>,
}

/// Point-in-time counters for `TemplateCache::stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub size: u64,
    pub capacity: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

/// Sharded LRU cache of parsed `MessageTemplate`s keyed by raw template
/// string. `reconfigure` may be called exactly once, before the first
/// `get_or_parse`; any later call fails loudly rather than silently
/// resizing live shards.
pub struct TemplateCache {
    shards: Vec<Shard>,
    shard_count: usize,
    ttl: Option<Duration>,
    counters: Counters,
    used: std::sync::atomic::AtomicBool,
}

impl TemplateCache {
    /// `capacity` is distributed across `shard_count` shards by
    /// quotient+remainder so the sum of shard capacities equals `capacity`
    /// exactly. `shard_count` must be a power of two.
    pub fn new(capacity: usize, shard_count: usize, ttl: Option<Duration>) -> Self {
        assert!(shard_count.is_power_of_two(), "shard_count must be a power of two");
        let base = capacity / shard_count;
        let remainder = capacity % shard_count;
        let shards = (0..shard_count)
            .map(|i| {
                let cap = base + if i < remainder { 1 } else { 0 };
                Shard {
                    lru: Mutex::new(LruMap::new(cap.max(1))),
                }
            })
            .collect();
        TemplateCache {
            shards,
            shard_count,
            ttl,
            counters: Counters::default(),
            used: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Default sizing: shard count chosen so each shard holds roughly 250
    /// entries.
    pub fn with_capacity(capacity: usize) -> Self {
        let ideal_shards = (capacity / 250).max(1);
        let shard_count = ideal_shards.next_power_of_two();
        TemplateCache::new(capacity, shard_count, None)
    }

    /// Replace this cache's TTL and per-shard capacities before first use.
    /// Returns `LogCoreError::Configuration` if the cache has already
    /// served a `get_or_parse` call.
    pub fn reconfigure(&mut self, capacity: usize, shard_count: usize, ttl: Option<Duration>) -> Result<()> {
        if self.used.load(Ordering::Acquire) {
            return Err(LogCoreError::Configuration(
                "template cache cannot be reconfigured after first use".to_string(),
            ));
        }
        *self = TemplateCache::new(capacity, shard_count, ttl);
        Ok(())
    }

    /// Look up `raw`, parsing and inserting on miss. Parse warnings from a
    /// cold parse are returned alongside the template so the caller can
    /// forward them to self-log.
    pub fn get_or_parse(&self, raw: &str) -> (Arc<MessageTemplate>, bool, Vec<super::parser::ParseWarning>) {
        self.used.store(true, Ordering::Release);
        let idx = shard_index(raw, self.shard_count);
        let shard = &self.shards[idx];

        {
            let mut lru = shard.lru.lock();
            let key = raw.to_string();
            match lru.peek(&key).map(|e| self.expired(e)) {
                Some(false) => {
                    let entry = lru.get(&key).expect("just peeked");
                    self.counters.hits.fetch_add(1, Ordering::Relaxed);
                    return (entry.template.clone(), true, Vec::new());
                }
                Some(true) => {
                    lru.remove(&key);
                    self.counters.expirations.fetch_add(1, Ordering::Relaxed);
                }
                None => {}
            }
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        let (tokens, warnings) = tokenize(raw);
        let template = Arc::new(MessageTemplate {
            raw: raw.to_string(),
            tokens,
        });
        let entry = Entry {
            template: template.clone(),
            inserted_at: Instant::now(),
        };
        let mut lru = shard.lru.lock();
        if lru.put(raw.to_string(), entry).is_some() {
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);
        }
        (template, false, warnings)
    }

    fn expired(&self, entry: &Entry) -> bool {
        match self.ttl {
            Some(ttl) => entry.inserted_at.elapsed() >= ttl,
            None => false,
        }
    }

    /// Drop every entry whose TTL has elapsed. Intended to be driven by a
    /// background sweeper thread on a fixed cadence; also safe to call
    /// inline from tests.
    pub fn sweep_expired(&self) {
        let Some(ttl) = self.ttl else { return };
        for shard in &self.shards {
            let mut lru = shard.lru.lock();
            let expired_keys: Vec<String> = lru
                .iter()
                .filter(|(_, entry)| entry.inserted_at.elapsed() >= ttl)
                .map(|(key, _)| key.clone())
                .collect();
            for key in expired_keys {
                lru.remove(&key);
                self.counters.expirations.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        let size: usize = self.shards.iter().map(|s| s.lru.lock().len()).sum();
        let capacity: usize = self.shards.iter().map(|s| s.lru.lock().capacity()).sum();
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            expirations: self.counters.expirations.load(Ordering::Relaxed),
            size: size as u64,
            capacity: capacity as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_then_hit() {
        let cache = TemplateCache::new(16, 4, None);
        let (t1, hit1, _) = cache.get_or_parse("Hello {Name}");
        assert!(!hit1);
        let (t2, hit2, _) = cache.get_or_parse("Hello {Name}");
        assert!(hit2);
        assert!(Arc::ptr_eq(&t1, &t2));
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn distinct_templates_get_distinct_entries() {
        let cache = TemplateCache::new(16, 4, None);
        let (a, _, _) = cache.get_or_parse("A {X}");
        let (b, _, _) = cache.get_or_parse("B {Y}");
        assert_ne!(a.raw, b.raw);
        assert_eq!(cache.stats().size, 2);
    }

    #[test]
    fn capacity_split_sums_exactly() {
        let cache = TemplateCache::new(17, 4, None);
        let total_capacity: usize = cache.shards.iter().map(|s| s.lru.lock().capacity()).sum();
        assert_eq!(total_capacity, 17);
    }

    #[test]
    fn ttl_expires_on_lazy_access() {
        let cache = TemplateCache::new(4, 1, Some(Duration::from_millis(1)));
        let (_, hit, _) = cache.get_or_parse("Tmpl {X}");
        assert!(!hit);
        std::thread::sleep(Duration::from_millis(5));
        let (_, hit_after_ttl, _) = cache.get_or_parse("Tmpl {X}");
        assert!(!hit_after_ttl, "expired entry must be treated as a miss");
    }

    #[test]
    fn reconfigure_after_use_fails() {
        let mut cache = TemplateCache::new(4, 1, None);
        cache.get_or_parse("warm {X}");
        let result = cache.reconfigure(8, 2, None);
        assert!(result.is_err());
    }

    #[test]
    fn reconfigure_before_use_succeeds() {
        let mut cache = TemplateCache::new(4, 1, None);
        assert!(cache.reconfigure(8, 2, None).is_ok());
        assert_eq!(cache.stats().capacity, 8);
    }

    #[test]
    fn sweep_expired_evicts_without_waiting_for_access() {
        let cache = TemplateCache::new(4, 1, Some(Duration::from_millis(1)));
        cache.get_or_parse("Tmpl {X}");
        std::thread::sleep(Duration::from_millis(5));
        cache.sweep_expired();
        assert_eq!(cache.stats().size, 0);
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn eviction_under_pressure_is_counted() {
        let cache = TemplateCache::new(2, 1, None);
        cache.get_or_parse("{A}");
        cache.get_or_parse("{B}");
        cache.get_or_parse("{C}");
        assert!(cache.stats().evictions >= 1);
    }
}
