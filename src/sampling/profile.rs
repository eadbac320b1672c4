//! Named sampling profiles, combining sampling choices with level/predicate
//! filters behind a memorable name.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::filter::{Filter, LevelFilter};
use crate::level::Level;

use super::{DurationSampler, EveryN, Rate};

/// A sampling profile is just a named `Filter`; built-ins compose an
/// appropriate sampler with a level or predicate gate.
pub fn high_traffic_api() -> Arc<dyn Filter> {
    Arc::new(EveryN::new(10))
}

pub fn background_worker() -> Arc<dyn Filter> {
    Arc::new(DurationSampler::new(Duration::from_secs(5)))
}

/// Critical alerts always emit (Warning and above), sampling only in
/// spirit — Errors and Fatals are never dropped.
pub fn critical_alerts() -> Arc<dyn Filter> {
    Arc::new(LevelFilter::new(Level::Warning))
}

pub fn health_checks() -> Arc<dyn Filter> {
    Arc::new(EveryN::new(100))
}

pub fn production_errors() -> Arc<dyn Filter> {
    Arc::new(Rate::new(0.1))
}

/// A registry of named profiles, seeded with the built-ins above.
/// `register` is only accepted before the registry's first `get()` call
/// (matching the one-shot-configuration pattern used by the template
/// cache's `reconfigure` and the crate's other process-wide singletons).
pub struct ProfileRegistry {
    profiles: RwLock<HashMap<String, Arc<dyn Filter>>>,
    used: AtomicBool,
}

impl ProfileRegistry {
    pub fn with_builtins() -> ProfileRegistry {
        let mut profiles: HashMap<String, Arc<dyn Filter>> = HashMap::new();
        profiles.insert("HighTrafficAPI".to_string(), high_traffic_api());
        profiles.insert("BackgroundWorker".to_string(), background_worker());
        profiles.insert("CriticalAlerts".to_string(), critical_alerts());
        profiles.insert("HealthChecks".to_string(), health_checks());
        profiles.insert("ProductionErrors".to_string(), production_errors());
        ProfileRegistry {
            profiles: RwLock::new(profiles),
            used: AtomicBool::new(false),
        }
    }

    /// Register (or overwrite) a user-provided profile. Returns `false`
    /// without registering if the registry has already served a `get()`.
    pub fn register(&self, name: impl Into<String>, filter: Arc<dyn Filter>) -> bool {
        if self.used.load(Ordering::Acquire) {
            return false;
        }
        self.profiles.write().insert(name.into(), filter);
        true
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Filter>> {
        self.used.store(true, Ordering::Release);
        self.profiles.read().get(name).cloned()
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        ProfileRegistry::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_profiles_are_resolvable() {
        let registry = ProfileRegistry::with_builtins();
        for name in ["HighTrafficAPI", "BackgroundWorker", "CriticalAlerts", "HealthChecks", "ProductionErrors"] {
            assert!(registry.get(name).is_some(), "missing profile {name}");
        }
    }

    #[test]
    fn unknown_profile_is_none() {
        let registry = ProfileRegistry::with_builtins();
        assert!(registry.get("DoesNotExist").is_none());
    }

    #[test]
    fn register_before_first_use_succeeds() {
        let registry = ProfileRegistry::with_builtins();
        assert!(registry.register("Custom", Arc::new(EveryN::new(5))));
        assert!(registry.get("Custom").is_some());
    }

    #[test]
    fn register_after_first_use_is_rejected() {
        let registry = ProfileRegistry::with_builtins();
        registry.get("HighTrafficAPI");
        assert!(!registry.register("TooLate", Arc::new(EveryN::new(5))));
    }
}
