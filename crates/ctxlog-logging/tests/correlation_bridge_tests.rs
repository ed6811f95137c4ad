#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Barrier};

use ctxlog_core_types::schema::{DEFAULT_CORRELATION_ID, FIELD_CORRELATION_ID};
use ctxlog_logging::logging_facility::CaptureAppender;
use ctxlog_logging::{CorrelationCell, CorrelationContextBridge, Enricher, LogEvent, Pipeline};
use proptest::prelude::*;
use tracing::Level;

fn emit(bridge: &CorrelationContextBridge) -> LogEvent {
    let mut event = LogEvent::new(Level::INFO, "tests", "emit");
    bridge.enrich(&mut event);
    event
}

#[test]
fn any_bound_string_is_written_verbatim() {
    let bridge = CorrelationContextBridge::new(CorrelationCell);
    proptest!(|(s in ".*")| {
        let event = CorrelationCell::scope(s.clone(), || emit(&bridge));
        prop_assert_eq!(event.metadata_value(FIELD_CORRELATION_ID), Some(s.as_str()));
    });
}

#[test]
fn test_unset_context_writes_default_not_null() {
    CorrelationCell::clear();
    let bridge = CorrelationContextBridge::new(CorrelationCell);

    let event = emit(&bridge);

    let value = event
        .metadata_value(FIELD_CORRELATION_ID)
        .expect("correlation-id must always be present");
    assert_eq!(value, DEFAULT_CORRELATION_ID);
    assert_ne!(value, "null");
}

#[test]
fn test_two_events_with_unchanged_context_are_identical() {
    let bridge = CorrelationContextBridge::new(CorrelationCell);

    let (first, second) = CorrelationCell::scope("stable-id", || (emit(&bridge), emit(&bridge)));

    assert_eq!(first.metadata, second.metadata);
}

#[test]
fn test_scope_exit_restores_previous_id() {
    CorrelationCell::clear();
    let bridge = CorrelationContextBridge::new(CorrelationCell);

    CorrelationCell::scope("outer", || {
        CorrelationCell::scope("inner", || {
            assert_eq!(emit(&bridge).metadata_value(FIELD_CORRELATION_ID), Some("inner"));
        });
        assert_eq!(emit(&bridge).metadata_value(FIELD_CORRELATION_ID), Some("outer"));
    });
    assert_eq!(emit(&bridge).metadata_value(FIELD_CORRELATION_ID), Some(""));
}

#[test]
fn test_concurrent_threads_never_see_each_others_id() {
    let (appender, capture) = CaptureAppender::new();
    let pipeline = Arc::new(
        Pipeline::builder()
            .enricher(CorrelationContextBridge::new(CorrelationCell))
            .appender(appender)
            .build(),
    );
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = ["thread-a", "thread-b"]
        .into_iter()
        .map(|id| {
            let pipeline = pipeline.clone();
            let barrier = barrier.clone();
            std::thread::spawn(move || {
                CorrelationCell::scope(id, || {
                    // Both ids are bound before either event is emitted
                    barrier.wait();
                    pipeline.dispatch(LogEvent::new(Level::INFO, "tests", id));
                });
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let events = capture.events();
    assert_eq!(events.len(), 2);
    for captured in events {
        assert_eq!(captured.correlation_id(), Some(captured.event.message.as_str()));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_task_scoped_id_follows_task_across_threads() {
    let bridge = Arc::new(CorrelationContextBridge::new(CorrelationCell));

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let bridge = bridge.clone();
            tokio::spawn(CorrelationCell::scope_async(format!("task-{}", i), async move {
                tokio::task::yield_now().await;
                let event = emit(&bridge);
                (i, event)
            }))
        })
        .collect();

    for task in tasks {
        let (i, event) = task.await.unwrap();
        let expected = format!("task-{}", i);
        assert_eq!(
            event.metadata_value(FIELD_CORRELATION_ID),
            Some(expected.as_str())
        );
    }
}
