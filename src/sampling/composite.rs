use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::event::LogEvent;
use crate::filter::Filter;

use super::{Sampler, SamplerStats};

/// All children must admit. Every child still observes every call — its
/// counters advance even once an earlier child has already rejected.
pub struct SamplerAnd {
    children: Vec<Arc<dyn Sampler>>,
    sampled: AtomicU64,
    skipped: AtomicU64,
}

impl SamplerAnd {
    pub fn new(children: Vec<Arc<dyn Sampler>>) -> SamplerAnd {
        SamplerAnd {
            children,
            sampled: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        }
    }
}

impl Filter for SamplerAnd {
    fn is_enabled(&self, event: &LogEvent) -> bool {
        let mut all_admit = true;
        for child in &self.children {
            if !child.is_enabled(event) {
                all_admit = false;
            }
        }
        if all_admit {
            self.sampled.fetch_add(1, Ordering::Relaxed);
        } else {
            self.skipped.fetch_add(1, Ordering::Relaxed);
        }
        all_admit
    }
}

impl Sampler for SamplerAnd {
    fn stats(&self) -> SamplerStats {
        SamplerStats {
            sampled: self.sampled.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        for child in &self.children {
            child.reset();
        }
        self.sampled.store(0, Ordering::Relaxed);
        self.skipped.store(0, Ordering::Relaxed);
    }
}

/// Any child admitting admits the event. Children short-circuit on first
/// accept — later children in the list do not observe
/// that call.
pub struct SamplerOr {
    children: Vec<Arc<dyn Sampler>>,
    sampled: AtomicU64,
    skipped: AtomicU64,
}

impl SamplerOr {
    pub fn new(children: Vec<Arc<dyn Sampler>>) -> SamplerOr {
        SamplerOr {
            children,
            sampled: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        }
    }
}

impl Filter for SamplerOr {
    fn is_enabled(&self, event: &LogEvent) -> bool {
        let mut admit = false;
        for child in &self.children {
            if child.is_enabled(event) {
                admit = true;
                break;
            }
        }
        if admit {
            self.sampled.fetch_add(1, Ordering::Relaxed);
        } else {
            self.skipped.fetch_add(1, Ordering::Relaxed);
        }
        admit
    }
}

impl Sampler for SamplerOr {
    fn stats(&self) -> SamplerStats {
        SamplerStats {
            sampled: self.sampled.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        for child in &self.children {
            child.reset();
        }
        self.sampled.store(0, Ordering::Relaxed);
        self.skipped.store(0, Ordering::Relaxed);
    }
}
