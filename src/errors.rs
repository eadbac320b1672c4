//! Error kinds surfaced by the explicitly-synchronous parts of the pipeline.
//!
//! The hot log call path never raises to the caller (see `pipeline` and
//! `logger`): parse problems, binding mismatches and sink failures are
//! reported through `selflog` instead. Only configuration-time APIs
//! (`ConfigBuilder::build`, `Sink::close`, cache `reconfigure`) return
//! `Result<_, LogCoreError>`.

use std::fmt;

/// Every fallible, explicitly-synchronous operation in the crate returns
/// one of these kinds.
#[derive(Debug)]
pub enum LogCoreError {
    /// A template failed to parse in strict mode.
    Parse(String),
    /// Positional arguments could not be bound to a template's placeholders.
    Binding(String),
    /// A sink's `emit` or `close` failed.
    Sink(String),
    /// A cache was reconfigured after its first use.
    Cache(String),
    /// The durable sink's on-disk buffer failed (I/O, corrupt segment, ...).
    Durable(String),
    /// An async sink's bounded queue was full under a blocking strategy
    /// and the caller's wait was cancelled.
    Overflow(String),
    /// A `ConfigBuilder` was misused (e.g. built twice, no sinks configured).
    Configuration(String),
}

impl fmt::Display for LogCoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogCoreError::Parse(msg) => write!(f, "template parse error: {msg}"),
            LogCoreError::Binding(msg) => write!(f, "argument binding error: {msg}"),
            LogCoreError::Sink(msg) => write!(f, "sink error: {msg}"),
            LogCoreError::Cache(msg) => write!(f, "cache error: {msg}"),
            LogCoreError::Durable(msg) => write!(f, "durable sink error: {msg}"),
            LogCoreError::Overflow(msg) => write!(f, "overflow error: {msg}"),
            LogCoreError::Configuration(msg) => write!(f, "configuration error: {msg}"),
        }
    }
}

impl std::error::Error for LogCoreError {}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LogCoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let err = LogCoreError::Cache("reconfigure after first use".into());
        let msg = err.to_string();
        assert!(msg.contains("cache error"));
        assert!(msg.contains("reconfigure after first use"));
    }

    #[test]
    fn is_std_error() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&LogCoreError::Parse("x".into()));
    }
}
