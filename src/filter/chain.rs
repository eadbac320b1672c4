use std::sync::Arc;

use crate::event::LogEvent;

use super::Filter;

/// An ordered sequence of filters. `is_enabled` short-circuits on the
/// first rejecting filter — later filters in the chain never see a
/// rejected event, matching the sampling-counter semantics documented
/// on `Filter::is_enabled`.
#[derive(Clone, Default)]
pub struct FilterChain {
    filters: Vec<Arc<dyn Filter>>,
}

impl FilterChain {
    pub fn new() -> FilterChain {
        FilterChain { filters: Vec::new() }
    }

    pub fn push(&mut self, filter: Arc<dyn Filter>) {
        self.filters.push(filter);
    }

    pub fn with(mut self, filter: Arc<dyn Filter>) -> FilterChain {
        self.push(filter);
        self
    }

    pub fn is_enabled(&self, event: &LogEvent) -> bool {
        for filter in &self.filters {
            if !filter.is_enabled(event) {
                return false;
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}
