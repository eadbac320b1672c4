//! Sampling filters: counter/rate/duration/first-N/group/when/backoff/
//! adaptive, each with per-filter state and `sampled`/`skipped` counters,
//! plus composition and a named-profile registry.

pub mod adaptive;
pub mod backoff;
pub mod composite;
pub mod duration;
pub mod every_n;
pub mod first_n;
pub mod group;
pub mod profile;
pub mod rate;
pub mod summary;
pub mod when;

pub use adaptive::Adaptive;
pub use backoff::Backoff;
pub use composite::{SamplerAnd, SamplerOr};
pub use duration::DurationSampler;
pub use every_n::EveryN;
pub use first_n::FirstN;
pub use group::Group;
pub use rate::Rate;
pub use when::When;

use crate::filter::Filter;

/// Point-in-time counters every sampler exposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplerStats {
    pub sampled: u64,
    pub skipped: u64,
}

impl SamplerStats {
    pub fn total(&self) -> u64 {
        self.sampled + self.skipped
    }
}

/// A `Filter` that also tracks how many events it admitted vs dropped,
/// and can restart its internal sequence on `reset()`.
pub trait Sampler: Filter {
    fn stats(&self) -> SamplerStats;
    fn reset(&self);
}
