//! One-shot assembly of a `Logger` from its constituent parts: minimum
//! level, enrichers, filters, capture limits, template cache sizing, and
//! sinks. Mirrors the fluent `Configure()...CreateLogger()` shape callers
//! of a Serilog-like API expect, built as a consuming builder so a half
//! configured `ConfigBuilder` can't be reused by accident.

use std::sync::Arc;
use std::time::Duration;

use crate::capture::CaptureOptions;
use crate::enrich::Enricher;
use crate::errors::{LogCoreError, Result};
use crate::filter::Filter;
use crate::level::{Level, LevelSwitch};
use crate::logger::Logger;
use crate::pipeline::Pipeline;
use crate::sink::Sink;
use crate::template::TemplateCache;

/// Entry point: `configure().minimum_level(Level::Debug).write_to(sink).build()`.
pub fn configure() -> ConfigBuilder {
    ConfigBuilder::new()
}

/// Default template cache capacity when the caller never calls
/// `cache_options`; sized for a single long-lived process logging many
/// distinct templates rather than one handling thousands of ad hoc ones.
const DEFAULT_CACHE_CAPACITY: usize = 10_000;

pub struct ConfigBuilder {
    minimum_level: Level,
    level_switch: Option<LevelSwitch>,
    enrichers: crate::enrich::EnricherChain,
    filters: crate::filter::FilterChain,
    capture_options: CaptureOptions,
    sinks: Vec<Arc<dyn Sink>>,
    cache_capacity: usize,
    cache_shard_count: usize,
    cache_ttl: Option<Duration>,
}

impl ConfigBuilder {
    pub fn new() -> ConfigBuilder {
        ConfigBuilder {
            minimum_level: Level::Information,
            level_switch: None,
            enrichers: crate::enrich::EnricherChain::new(),
            filters: crate::filter::FilterChain::new(),
            capture_options: CaptureOptions::default(),
            sinks: Vec::new(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_shard_count: 16,
            cache_ttl: None,
        }
    }

    /// Sets the initial minimum level. Ignored once `level_switch` has
    /// been called with a caller-supplied, possibly already-shared switch.
    pub fn minimum_level(mut self, level: Level) -> ConfigBuilder {
        self.minimum_level = level;
        self
    }

    /// Supplies a `LevelSwitch` the caller already holds a handle to, so
    /// the level can be changed at runtime from outside the logger.
    pub fn level_switch(mut self, switch: LevelSwitch) -> ConfigBuilder {
        self.level_switch = Some(switch);
        self
    }

    pub fn enrich_with(mut self, enricher: Arc<dyn Enricher>) -> ConfigBuilder {
        self.enrichers.push(enricher);
        self
    }

    pub fn filter_with(mut self, filter: Arc<dyn Filter>) -> ConfigBuilder {
        self.filters.push(filter);
        self
    }

    pub fn capture_options(mut self, options: CaptureOptions) -> ConfigBuilder {
        self.capture_options = options;
        self
    }

    /// Adds one sink. Call this more than once to fan out to several
    /// sinks directly, or pass a single `Router`/`AsyncSink`/`DurableSink`
    /// wrapper to compose more elaborate delivery behaviour.
    pub fn write_to(mut self, sink: Arc<dyn Sink>) -> ConfigBuilder {
        self.sinks.push(sink);
        self
    }

    /// Overrides the template cache's sizing. `shard_count` must be a
    /// power of two (`TemplateCache::new`'s own requirement).
    pub fn cache_options(mut self, capacity: usize, shard_count: usize, ttl: Option<Duration>) -> ConfigBuilder {
        self.cache_capacity = capacity;
        self.cache_shard_count = shard_count;
        self.cache_ttl = ttl;
        self
    }

    /// Assembles the configured `Pipeline` and hands back the root
    /// `Logger`. Fails if no sink was ever registered — a logger with
    /// nowhere to write is almost certainly a missing `write_to` call,
    /// not an intentional no-op configuration.
    pub fn build(self) -> Result<Logger> {
        if self.sinks.is_empty() {
            return Err(LogCoreError::Configuration(
                "no sinks configured; call write_to at least once".to_string(),
            ));
        }

        let level_switch = self.level_switch.unwrap_or_else(|| LevelSwitch::new(self.minimum_level));
        let template_cache = Arc::new(TemplateCache::new(self.cache_capacity, self.cache_shard_count, self.cache_ttl));

        let pipeline = Pipeline {
            level_switch,
            template_cache,
            capture_options: self.capture_options,
            enrichers: self.enrichers,
            filters: self.filters,
            sinks: self.sinks,
        };

        Ok(Logger::new(Arc::new(pipeline)))
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        ConfigBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;

    #[test]
    fn build_without_a_sink_is_a_configuration_error() {
        let result = configure().build();
        assert!(matches!(result, Err(LogCoreError::Configuration(_))));
    }

    #[test]
    fn build_with_a_sink_produces_a_working_logger() {
        let sink = Arc::new(MemorySink::new());
        let logger = configure()
            .minimum_level(Level::Verbose)
            .write_to(sink.clone())
            .build()
            .unwrap();
        logger.information("hello {Name}", vec![crate::pipeline::Arg::scalar("world")]);
        assert_eq!(sink.events()[0].render_message(), "hello world");
    }

    #[test]
    fn minimum_level_gates_out_lower_severity_calls() {
        let sink = Arc::new(MemorySink::new());
        let logger = configure()
            .minimum_level(Level::Warning)
            .write_to(sink.clone())
            .build()
            .unwrap();
        logger.information("dropped", vec![]);
        logger.error("kept", vec![]);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn a_caller_supplied_level_switch_is_shared_with_the_logger() {
        let switch = LevelSwitch::new(Level::Error);
        let sink = Arc::new(MemorySink::new());
        let logger = configure()
            .level_switch(switch.clone())
            .write_to(sink.clone())
            .build()
            .unwrap();
        logger.information("still gated", vec![]);
        assert!(sink.is_empty());
        switch.set(Level::Verbose);
        logger.information("now admitted", vec![]);
        assert_eq!(sink.len(), 1);
    }
}
