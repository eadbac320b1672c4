//! Dev/test fixture sinks. Not a transport in their own right — `MemorySink`
//! is for assertions in tests, `StderrSink` for quick manual inspection.

use parking_lot::Mutex;

use crate::event::LogEvent;

use super::Sink;

/// Collects every emitted event in memory, in arrival order. Used by tests
/// that want to assert on exactly what a pipeline produced.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<LogEvent>>,
}

impl MemorySink {
    pub fn new() -> MemorySink {
        MemorySink {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Sink for MemorySink {
    fn emit(&self, event: &LogEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Writes `level: rendered message` lines to stderr. A minimal console
/// fixture, not a substitute for a real formatted transport.
pub struct StderrSink;

impl StderrSink {
    pub fn new() -> StderrSink {
        StderrSink
    }
}

impl Default for StderrSink {
    fn default() -> Self {
        StderrSink::new()
    }
}

impl Sink for StderrSink {
    fn emit(&self, event: &LogEvent) {
        eprintln!("{}: {}", event.level, event.render_message());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use crate::template::MessageTemplate;
    use std::sync::Arc;

    #[test]
    fn memory_sink_records_events_in_order() {
        let sink = MemorySink::new();
        let (tmpl, _) = MessageTemplate::parse("hello {Name}");
        let tmpl = Arc::new(tmpl);
        let mut a = LogEvent::new(Level::Information, tmpl.clone());
        a.set_property("Name", "a");
        let mut b = LogEvent::new(Level::Information, tmpl);
        b.set_property("Name", "b");
        sink.emit(&a);
        sink.emit(&b);
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.events()[0].render_message(), "hello a");
        assert_eq!(sink.events()[1].render_message(), "hello b");
    }

    #[test]
    fn memory_sink_clear_empties_it() {
        let sink = MemorySink::new();
        let (tmpl, _) = MessageTemplate::parse("x");
        sink.emit(&LogEvent::new(Level::Information, Arc::new(tmpl)));
        sink.clear();
        assert!(sink.is_empty());
    }
}
