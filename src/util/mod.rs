//! Small shared data structures used by more than one subsystem:
//! an FNV-1a hash with an avalanche finalizer (template cache sharding)
//! and a generic bounded LRU map (template cache, sampling group/backoff
//! state, deadline dedup cache).

pub mod fnv;
pub mod lru;
