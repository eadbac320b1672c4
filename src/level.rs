//! Log levels and the shared, atomically swappable level switch.

use std::sync::Arc;

use arc_swap::ArcSwap;

/// Total ordering `Verbose < Debug < Information < Warning < Error < Fatal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Level {
    Verbose = 0,
    Debug = 1,
    Information = 2,
    Warning = 3,
    Error = 4,
    Fatal = 5,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Verbose => "VERBOSE",
            Level::Debug => "DEBUG",
            Level::Information => "INFORMATION",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
        }
    }

    /// Case-insensitive parse accepting common aliases (`info`, `warn`, ...).
    pub fn parse(name: &str) -> Option<Level> {
        match name.to_ascii_lowercase().as_str() {
            "verbose" | "trace" => Some(Level::Verbose),
            "debug" => Some(Level::Debug),
            "information" | "info" => Some(Level::Information),
            "warning" | "warn" => Some(Level::Warning),
            "error" => Some(Level::Error),
            "fatal" | "critical" => Some(Level::Fatal),
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

use std::fmt;

/// Shared, atomically swappable minimum-level gate.
///
/// Readers take a single lock-free load (`ArcSwap::load`); `set` performs
/// one atomic pointer swap. Multiple `Logger`s may share one `LevelSwitch`
/// by cloning it (it is cheap: one `Arc` clone).
#[derive(Clone)]
pub struct LevelSwitch {
    inner: Arc<ArcSwap<Level>>,
}

impl LevelSwitch {
    pub fn new(initial: Level) -> Self {
        LevelSwitch {
            inner: Arc::new(ArcSwap::from_pointee(initial)),
        }
    }

    /// Current minimum level.
    pub fn level(&self) -> Level {
        **self.inner.load()
    }

    /// Swap the minimum level; visible to every logger sharing this switch
    /// on their next call.
    pub fn set(&self, level: Level) {
        self.inner.store(Arc::new(level));
    }

    // Fluent per-level shorthand: each returns `self` so callers can
    // chain construction, e.g. `LevelSwitch::new(Level::Information).warning()`.
    pub fn verbose(self) -> Self {
        self.set(Level::Verbose);
        self
    }
    pub fn debug(self) -> Self {
        self.set(Level::Debug);
        self
    }
    pub fn information(self) -> Self {
        self.set(Level::Information);
        self
    }
    pub fn warning(self) -> Self {
        self.set(Level::Warning);
        self
    }
    pub fn error(self) -> Self {
        self.set(Level::Error);
        self
    }
    pub fn fatal(self) -> Self {
        self.set(Level::Fatal);
        self
    }
}

impl Default for LevelSwitch {
    fn default() -> Self {
        LevelSwitch::new(Level::Information)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_ordering() {
        assert!(Level::Verbose < Level::Debug);
        assert!(Level::Debug < Level::Information);
        assert!(Level::Information < Level::Warning);
        assert!(Level::Warning < Level::Error);
        assert!(Level::Error < Level::Fatal);
    }

    #[test]
    fn parse_aliases() {
        assert_eq!(Level::parse("info"), Some(Level::Information));
        assert_eq!(Level::parse("WARN"), Some(Level::Warning));
        assert_eq!(Level::parse("critical"), Some(Level::Fatal));
        assert_eq!(Level::parse("nope"), None);
    }

    #[test]
    fn switch_set_is_visible_to_clones() {
        let switch = LevelSwitch::new(Level::Information);
        let clone = switch.clone();
        switch.set(Level::Error);
        assert_eq!(clone.level(), Level::Error);
    }
}
