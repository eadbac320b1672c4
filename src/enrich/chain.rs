use std::sync::Arc;

use crate::context::Context;
use crate::event::LogEvent;

use super::Enricher;

/// Runs enrichers in declared order. Order matters: an
/// earlier enricher with `overwrite() == true` can still be overridden by
/// a later one with `overwrite() == true`, since each enricher only ever
/// sees the event as the previous one left it.
#[derive(Clone, Default)]
pub struct EnricherChain {
    enrichers: Vec<Arc<dyn Enricher>>,
}

impl EnricherChain {
    pub fn new() -> EnricherChain {
        EnricherChain {
            enrichers: Vec::new(),
        }
    }

    pub fn push(&mut self, enricher: Arc<dyn Enricher>) {
        self.enrichers.push(enricher);
    }

    pub fn with(mut self, enricher: Arc<dyn Enricher>) -> EnricherChain {
        self.push(enricher);
        self
    }

    pub fn run(&self, event: &mut LogEvent, ctx: &Context) {
        for enricher in &self.enrichers {
            enricher.enrich(event, ctx);
        }
    }

    pub fn len(&self) -> usize {
        self.enrichers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enrichers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use crate::template::MessageTemplate;
    use crate::value::Value;
    use std::sync::Arc as StdArc;

    struct AddsFoo;
    impl Enricher for AddsFoo {
        fn enrich(&self, event: &mut LogEvent, _ctx: &Context) {
            event.set_property_if_absent("foo", Value::from("bar"));
        }
    }

    struct OverwritesFoo;
    impl Enricher for OverwritesFoo {
        fn enrich(&self, event: &mut LogEvent, _ctx: &Context) {
            super::super::apply_property(event, self, "foo", "overwritten");
        }
        fn overwrite(&self) -> bool {
            true
        }
    }

    fn event() -> LogEvent {
        LogEvent::new(Level::Information, StdArc::new(MessageTemplate::parse("x").0))
    }

    #[test]
    fn runs_in_declared_order() {
        let chain = EnricherChain::new().with(Arc::new(AddsFoo)).with(Arc::new(OverwritesFoo));
        let mut event = event();
        chain.run(&mut event, &Context::root());
        assert_eq!(event.properties["foo"], Value::from("overwritten"));
    }

    #[test]
    fn non_overwrite_enricher_respects_existing_property() {
        let mut event = event();
        event.set_property("foo", "preset");
        let chain = EnricherChain::new().with(Arc::new(AddsFoo));
        chain.run(&mut event, &Context::root());
        assert_eq!(event.properties["foo"], Value::from("preset"));
    }
}
