//! Exercises the public API as an application would: assemble a logger
//! through `configure()`, derive scoped loggers, and check what actually
//! reaches the sinks.

use std::sync::Arc;
use std::time::Duration;

use mtlog_core::capture_arg;
use mtlog_core::config::configure;
use mtlog_core::enrich::TimestampEnricher;
use mtlog_core::filter::{CompositeNot, PropertyMatcher};
use mtlog_core::pipeline::Arg;
use mtlog_core::sampling::Group;
use mtlog_core::sink::{AsyncSink, AsyncSinkConfig, MemorySink, RouteMode, Router};
use mtlog_core::value::Value;
use mtlog_core::{arg, Level};

#[test]
fn a_built_logger_renders_bound_arguments_and_runs_enrichers() {
    let sink = Arc::new(MemorySink::new());
    let logger = configure()
        .minimum_level(Level::Debug)
        .enrich_with(Arc::new(TimestampEnricher))
        .write_to(sink.clone())
        .build()
        .unwrap();

    let request_logger = logger.for_context("RequestId", "r-1");
    let before = chrono::Utc::now();
    request_logger.information("User {UserId} signed in", vec![arg(42i64)]);

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].render_message(), "User 42 signed in");
    assert_eq!(events[0].properties["RequestId"], Value::from("r-1"));
    assert!(events[0].timestamp >= before);
}

#[test]
fn context_stack_properties_reach_the_event_with_no_enricher_configured() {
    let sink = Arc::new(MemorySink::new());
    let logger = configure().write_to(sink.clone()).build().unwrap();

    let scoped = logger.for_context("Tenant", "acme");
    scoped.information("no enrichers registered", vec![]);

    assert_eq!(sink.events()[0].properties["Tenant"], Value::from("acme"));
}

#[test]
fn group_sampling_keys_off_a_forcontext_grouped_property_with_no_enricher_configured() {
    let sink = Arc::new(MemorySink::new());
    let group = Arc::new(Group::new(2, 16));
    let logger = configure()
        .write_to(sink.clone())
        .filter_with(group.clone())
        .build()
        .unwrap();

    let a = logger.for_context("GroupKey", "disk-full");
    let b = logger.for_context("GroupKey", "db-timeout");

    a.warning("a: 1st", vec![]);
    b.warning("b: 1st", vec![]);
    a.warning("a: 2nd, skipped", vec![]);
    a.warning("a: 3rd, emits", vec![]);

    assert_eq!(sink.len(), 3);
    assert_eq!(sink.events()[0].render_message(), "a: 1st");
    assert_eq!(sink.events()[1].render_message(), "b: 1st");
    assert_eq!(sink.events()[2].render_message(), "a: 3rd, emits");
}

#[test]
fn derived_loggers_never_leak_context_or_sampling_to_the_base() {
    let sink = Arc::new(MemorySink::new());
    let logger = configure().write_to(sink.clone()).build().unwrap();

    let scoped = logger.for_context("Tenant", "acme").sample_first_n(1);
    scoped.information("a", vec![]);
    scoped.information("b", vec![]);
    logger.information("unscoped", vec![]);

    assert_eq!(sink.len(), 2);
    assert!(!sink.events()[1].properties.contains_key("Tenant"));
}

#[test]
fn a_property_filter_drops_events_before_they_reach_any_sink() {
    let sink = Arc::new(MemorySink::new());
    let logger = configure()
        .write_to(sink.clone())
        .filter_with(Arc::new(CompositeNot::new(Arc::new(PropertyMatcher::new("Suppress", true)))))
        .build()
        .unwrap();

    logger.information("kept {Suppress}", vec![arg(false)]);
    logger.information("dropped {Suppress}", vec![arg(true)]);

    assert_eq!(sink.len(), 1);
    assert_eq!(sink.events()[0].render_message(), "kept false");
}

#[test]
fn minimum_level_can_be_raised_on_a_derived_logger_without_touching_the_switch() {
    let sink = Arc::new(MemorySink::new());
    let logger = configure()
        .minimum_level(Level::Verbose)
        .write_to(sink.clone())
        .build()
        .unwrap();

    let quiet = logger.sample_minimum_level(Level::Error);
    quiet.information("swallowed", vec![]);
    logger.information("still admitted at Verbose", vec![]);

    assert_eq!(sink.len(), 1);
}

#[test]
fn router_sends_events_to_the_matching_route_and_falls_back_to_default() {
    let errors = Arc::new(MemorySink::new());
    let everything_else = Arc::new(MemorySink::new());
    let router = Arc::new(Router::new(RouteMode::FirstMatch).with_default(everything_else.clone()));
    router.add_route("errors", |e| e.level >= Level::Error, errors.clone());

    let logger = configure().minimum_level(Level::Debug).write_to(router).build().unwrap();

    logger.information("just chatting", vec![]);
    logger.error("disk is on fire", vec![]);

    assert_eq!(everything_else.len(), 1);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors.events()[0].render_message(), "disk is on fire");
}

#[test]
fn an_async_sink_eventually_delivers_to_its_downstream_on_close() {
    let downstream = Arc::new(MemorySink::new());
    let async_sink = Arc::new(AsyncSink::new(
        downstream.clone(),
        AsyncSinkConfig {
            batch_size: 1000,
            flush_interval: Duration::from_secs(60),
            ..Default::default()
        },
    ));

    let logger = configure().write_to(async_sink.clone()).build().unwrap();
    for i in 0..10 {
        logger.information("tick {N}", vec![arg(i as i64)]);
    }

    async_sink.close().unwrap();
    assert_eq!(downstream.len(), 10);
}

#[test]
fn capturable_arguments_destructure_into_nested_properties() {
    struct User {
        id: i64,
        name: &'static str,
    }
    impl mtlog_core::capture::Capturable for User {
        fn type_tag(&self) -> &str {
            "User"
        }
        fn fields(&self) -> Vec<(String, mtlog_core::capture::FieldValue)> {
            vec![
                ("id".to_string(), mtlog_core::capture::FieldValue::Scalar(Value::from(self.id))),
                ("name".to_string(), mtlog_core::capture::FieldValue::Scalar(Value::from(self.name))),
            ]
        }
    }

    let sink = Arc::new(MemorySink::new());
    let logger = configure().write_to(sink.clone()).build().unwrap();
    let user = User { id: 7, name: "ada" };
    logger.information("login by {@User}", vec![capture_arg(&user)]);

    match &sink.events()[0].properties["User"] {
        Value::Capture(type_tag, fields) => {
            assert_eq!(type_tag, "User");
            assert_eq!(fields["id"], Value::from(7i64));
        }
        other => panic!("expected Capture, got {other:?}"),
    }
}

#[test]
fn excess_positional_arguments_are_reported_and_kept_rather_than_silently_dropped() {
    let sink = Arc::new(MemorySink::new());
    let logger = configure().write_to(sink.clone()).build().unwrap();

    logger.information("no placeholders here", vec![Arg::scalar(1i64), Arg::scalar(2i64)]);

    let event = &sink.events()[0];
    assert_eq!(event.properties["__extra_0"], Value::from(1i64));
    assert_eq!(event.properties["__extra_1"], Value::from(2i64));
}

#[test]
fn building_without_a_sink_fails_fast() {
    let result = configure().build();
    assert!(result.is_err());
}
