//! Context deadline awareness: when the caller's context carries a
//! deadline, inject remaining-time properties and optionally elevate
//! Info to Warning as the deadline approaches or is exceeded.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::context::Context;
use crate::event::LogEvent;
use crate::level::Level;
use crate::util::lru::LruMap;
use crate::value::Value;

/// Receives the event and the remaining duration (negative-as-zero if
/// already exceeded) in place of the default elevate-to-Warning handling.
pub trait DeadlineHandler: Send + Sync {
    fn handle(&self, event: &mut LogEvent, remaining: Duration, exceeded: bool);
}

struct DefaultHandler {
    elevate: bool,
}

impl DeadlineHandler for DefaultHandler {
    fn handle(&self, event: &mut LogEvent, _remaining: Duration, _exceeded: bool) {
        if self.elevate && event.level == Level::Information {
            event.level = Level::Warning;
        }
    }
}

/// Point-in-time counters exposed by `DeadlineEnricher::stats`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeadlineStats {
    pub cache_size: usize,
    pub first_warning_count: u64,
    pub ttl: Option<Duration>,
}

struct Dedup {
    seen_at: std::time::Instant,
}

/// Tracks "first warning per context identity" so a long-running
/// operation approaching its deadline doesn't re-warn on every single log
/// call. Identity is whatever string the caller associates with the
/// context (e.g. a request id materialised into the context stack).
pub struct DeadlineEnricher {
    warning_threshold_fraction: f64,
    warning_threshold_absolute: Option<Duration>,
    handler: Arc<dyn DeadlineHandler>,
    dedup: Mutex<LruMap<String, Dedup>>,
    ttl: Duration,
    first_warning_count: std::sync::atomic::AtomicU64,
}

impl DeadlineEnricher {
    pub fn new(warning_threshold_fraction: f64, dedup_capacity: usize, dedup_ttl: Duration) -> DeadlineEnricher {
        DeadlineEnricher {
            warning_threshold_fraction,
            warning_threshold_absolute: None,
            handler: Arc::new(DefaultHandler { elevate: true }),
            dedup: Mutex::new(LruMap::new(dedup_capacity.max(1))),
            ttl: dedup_ttl,
            first_warning_count: std::sync::atomic::AtomicU64::new(0),
        }
    }

    pub fn with_absolute_threshold(mut self, threshold: Duration) -> DeadlineEnricher {
        self.warning_threshold_absolute = Some(threshold);
        self
    }

    pub fn with_handler(mut self, handler: Arc<dyn DeadlineHandler>) -> DeadlineEnricher {
        self.handler = handler;
        self
    }

    pub fn stats(&self) -> DeadlineStats {
        DeadlineStats {
            cache_size: self.dedup.lock().len(),
            first_warning_count: self.first_warning_count.load(std::sync::atomic::Ordering::Relaxed),
            ttl: Some(self.ttl),
        }
    }

    fn is_first_warning(&self, identity: &str) -> bool {
        let mut dedup = self.dedup.lock();
        if let Some(entry) = dedup.get(&identity.to_string()) {
            if entry.seen_at.elapsed() < self.ttl {
                return false;
            }
        }
        dedup.put(
            identity.to_string(),
            Dedup {
                seen_at: std::time::Instant::now(),
            },
        );
        true
    }
}

impl super::Enricher for DeadlineEnricher {
    fn enrich(&self, event: &mut LogEvent, ctx: &Context) {
        let Some((at, total)) = ctx.deadline() else {
            return;
        };
        let now = chrono::Utc::now();
        let remaining_signed = at.signed_duration_since(now);
        let exceeded = remaining_signed.num_milliseconds() <= 0;
        let remaining = if exceeded {
            Duration::ZERO
        } else {
            Duration::from_millis(remaining_signed.num_milliseconds() as u64)
        };

        let fraction_breached = if total.as_secs_f64() > 0.0 {
            remaining.as_secs_f64() / total.as_secs_f64() <= self.warning_threshold_fraction
        } else {
            false
        };
        let absolute_breached = self
            .warning_threshold_absolute
            .map(|threshold| remaining <= threshold)
            .unwrap_or(false);

        if !exceeded && !fraction_breached && !absolute_breached {
            return;
        }

        event.set_property_if_absent("deadline.remaining", Value::Duration(remaining));
        event.set_property_if_absent("deadline.total", Value::Duration(total));
        if exceeded {
            event.set_property("deadline.exceeded", Value::Bool(true));
        }

        let identity = format!("{at:?}");
        if self.is_first_warning(&identity) {
            self.first_warning_count.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            self.handler.handle(event, remaining, exceeded);
        }
    }
}
