//! Opt-in diagnostic stream for internal anomalies (parse problems, sink
//! errors, sampling/cache decisions). Never writes to application sinks.
//! Disabled by default, built as a lazily-initialised singleton guarded by
//! a single lock, the same shape used for the other process-wide state in
//! this crate (the template cache, sampling profile registry).

use once_cell::sync::Lazy;
use parking_lot::RwLock;

type Writer = Box<dyn Fn(&str) + Send + Sync>;

struct SelfLogState {
    writer: Option<Writer>,
}

static STATE: Lazy<RwLock<SelfLogState>> = Lazy::new(|| RwLock::new(SelfLogState { writer: None }));

/// Installs a writer that receives every subsequent self-log line.
pub fn enable(writer: impl Fn(&str) + Send + Sync + 'static) {
    STATE.write().writer = Some(Box::new(writer));
}

/// Installs a writer that prints each line to stderr, prefixed.
pub fn enable_stderr() {
    enable(|line| eprintln!("[selflog] {line}"));
}

pub fn disable() {
    STATE.write().writer = None;
}

pub fn is_enabled() -> bool {
    STATE.read().writer.is_some()
}

/// Emits `{subsystem}: {message}` to the installed writer, if any. A no-op
/// (beyond the read lock) when self-log is disabled.
pub fn emit(subsystem: &str, message: &str) {
    let state = STATE.read();
    if let Some(writer) = state.writer.as_ref() {
        writer(&format!("{subsystem}: {message}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    // Self-log is a process-wide singleton so tests run serially against
    // a lock to avoid clobbering each other's writer.
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn disabled_by_default_is_a_silent_noop() {
        let _guard = TEST_LOCK.lock().unwrap();
        disable();
        assert!(!is_enabled());
        emit("cache", "this goes nowhere");
    }

    #[test]
    fn enabled_writer_receives_tagged_lines() {
        let _guard = TEST_LOCK.lock().unwrap();
        let captured = Arc::new(Mutex::new(Vec::new()));
        let sink = captured.clone();
        enable(move |line| sink.lock().unwrap().push(line.to_string()));
        emit("template", "parse failed: unterminated placeholder");
        assert_eq!(
            captured.lock().unwrap()[0],
            "template: parse failed: unterminated placeholder"
        );
        disable();
    }
}
