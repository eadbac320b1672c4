//! Predicate-routed dispatch to child sinks.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::event::LogEvent;
use crate::selflog;

use super::Sink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteMode {
    /// Dispatch to the first route whose predicate matches, or the
    /// default sink if none match.
    FirstMatch,
    /// Dispatch to every matching route, in configured order; if none
    /// match, dispatch to the default sink.
    AllMatch,
}

struct Route {
    name: String,
    predicate: Box<dyn Fn(&LogEvent) -> bool + Send + Sync>,
    sink: Arc<dyn Sink>,
}

/// An ordered list of predicate-guarded sinks plus an optional default.
/// Route membership is mutable at runtime (`add_route`/`remove_route`)
/// behind a single `RwLock`, safe against concurrent `emit`.
pub struct Router {
    mode: RouteMode,
    routes: RwLock<Vec<Route>>,
    default: Option<Arc<dyn Sink>>,
}

impl Router {
    pub fn new(mode: RouteMode) -> Router {
        Router {
            mode,
            routes: RwLock::new(Vec::new()),
            default: None,
        }
    }

    pub fn with_default(mut self, sink: Arc<dyn Sink>) -> Router {
        self.default = Some(sink);
        self
    }

    pub fn add_route(
        &self,
        name: impl Into<String>,
        predicate: impl Fn(&LogEvent) -> bool + Send + Sync + 'static,
        sink: Arc<dyn Sink>,
    ) {
        self.routes.write().push(Route {
            name: name.into(),
            predicate: Box::new(predicate),
            sink,
        });
    }

    /// Removes the named route. Returns `false` if no route had that name.
    pub fn remove_route(&self, name: &str) -> bool {
        let mut routes = self.routes.write();
        let before = routes.len();
        routes.retain(|r| r.name != name);
        routes.len() != before
    }

    pub fn route_names(&self) -> Vec<String> {
        self.routes.read().iter().map(|r| r.name.clone()).collect()
    }

    fn dispatch_to(&self, sink: &Arc<dyn Sink>, event: &LogEvent) {
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| sink.emit(event)));
        if outcome.is_err() {
            selflog::emit("router", "a route's sink panicked while emitting; isolated from other routes");
        }
    }
}

impl Sink for Router {
    fn emit(&self, event: &LogEvent) {
        let routes = self.routes.read();
        match self.mode {
            RouteMode::FirstMatch => {
                if let Some(route) = routes.iter().find(|r| (r.predicate)(event)) {
                    self.dispatch_to(&route.sink, event);
                    return;
                }
            }
            RouteMode::AllMatch => {
                let mut matched = false;
                for route in routes.iter() {
                    if (route.predicate)(event) {
                        matched = true;
                        self.dispatch_to(&route.sink, event);
                    }
                }
                if matched {
                    return;
                }
            }
        }
        if let Some(default) = &self.default {
            self.dispatch_to(default, event);
        }
    }

    fn close(&self) -> crate::errors::Result<()> {
        let mut first_err = None;
        for route in self.routes.read().iter() {
            if let Err(err) = route.sink.close() {
                selflog::emit("router", &format!("route {} failed to close: {err}", route.name));
                first_err.get_or_insert(err);
            }
        }
        if let Some(default) = &self.default {
            if let Err(err) = default.close() {
                selflog::emit("router", &format!("default sink failed to close: {err}"));
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use crate::sink::MemorySink;
    use crate::template::MessageTemplate;

    fn event_at(level: Level) -> LogEvent {
        LogEvent::new(level, Arc::new(MessageTemplate::parse("x").0))
    }

    #[test]
    fn first_match_routes_to_first_matching_predicate_only() {
        let errors = Arc::new(MemorySink::new());
        let warnings = Arc::new(MemorySink::new());
        let router = Router::new(RouteMode::FirstMatch);
        router.add_route("errors", |e: &LogEvent| e.level >= Level::Error, errors.clone());
        router.add_route("warnings", |e: &LogEvent| e.level >= Level::Warning, warnings.clone());

        router.emit(&event_at(Level::Error));
        router.emit(&event_at(Level::Warning));

        assert_eq!(errors.len(), 1);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn all_match_dispatches_to_every_matching_route_in_order() {
        let a = Arc::new(MemorySink::new());
        let b = Arc::new(MemorySink::new());
        let router = Router::new(RouteMode::AllMatch);
        router.add_route("a", |_: &LogEvent| true, a.clone());
        router.add_route("b", |e: &LogEvent| e.level >= Level::Warning, b.clone());

        router.emit(&event_at(Level::Warning));

        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn unmatched_event_falls_back_to_default() {
        let default = Arc::new(MemorySink::new());
        let router = Router::new(RouteMode::FirstMatch).with_default(default.clone());
        router.add_route("errors", |e: &LogEvent| e.level >= Level::Error, Arc::new(MemorySink::new()));

        router.emit(&event_at(Level::Information));

        assert_eq!(default.len(), 1);
    }

    #[test]
    fn remove_route_stops_further_dispatch() {
        let sink = Arc::new(MemorySink::new());
        let router = Router::new(RouteMode::FirstMatch);
        router.add_route("all", |_: &LogEvent| true, sink.clone());
        assert!(router.remove_route("all"));
        assert!(!router.remove_route("all"));
        router.emit(&event_at(Level::Information));
        assert!(sink.is_empty());
    }
}
