//! Test capture mode for deterministic logging assertions
//!
//! This module provides an appender that records enriched events in memory,
//! together with the shared logging context visible when each was appended.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, OnceLock};

use ctxlog_core_types::schema::FIELD_CORRELATION_ID;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::correlation::{CorrelationCell, CorrelationContextBridge};
use crate::event::LogEvent;
use crate::extra_fields::{ExtraFieldsBridge, ExtraFieldsCell};
use crate::logging_facility::layer::EnrichmentLayer;
use crate::mdc::SharedLoggingContext;
use crate::pipeline::{Appender, Pipeline};

/// A captured log event and the MDC at append time
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub event: LogEvent,
    pub mdc: BTreeMap<String, String>,
}

impl CapturedEvent {
    pub fn correlation_id(&self) -> Option<&str> {
        self.event.metadata_value(FIELD_CORRELATION_ID)
    }

    pub fn mdc_value(&self, key: &str) -> Option<&str> {
        self.mdc.get(key).map(String::as_str)
    }
}

/// Appender collecting events for assertions
pub struct CaptureAppender {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CaptureAppender {
    pub fn new() -> (Self, TestCapture) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let appender = Self {
            events: events.clone(),
        };
        let capture = TestCapture { events };
        (appender, capture)
    }
}

impl Appender for CaptureAppender {
    fn append(&self, event: &LogEvent) {
        let captured = CapturedEvent {
            event: event.clone(),
            mdc: SharedLoggingContext::snapshot(),
        };

        self.events
            .lock()
            .map(|mut events| events.push(captured))
            .ok();
    }
}

/// Handle for accessing captured events in tests
#[derive(Clone)]
pub struct TestCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl TestCapture {
    /// Get all captured events
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Events whose message equals `message`
    pub fn with_message(&self, message: &str) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.event.message == message)
            .collect()
    }

    /// Assert that an event with the given message was captured
    ///
    /// # Panics
    ///
    /// Panics if the event is not found
    pub fn assert_event_exists(&self, message: &str) {
        let events = self.events();
        let found = events.iter().any(|e| e.event.message == message);
        assert!(
            found,
            "Expected event message={} not found in {} captured events",
            message,
            events.len()
        );
    }

    /// Clear all captured events
    pub fn clear(&self) {
        self.events.lock().map(|mut e| e.clear()).ok();
    }

    /// Count events matching a predicate
    pub fn count_events<F>(&self, predicate: F) -> usize
    where
        F: Fn(&CapturedEvent) -> bool,
    {
        self.events().iter().filter(|e| predicate(e)).count()
    }
}

static GLOBAL_CAPTURE: OnceLock<TestCapture> = OnceLock::new();

/// Initialize test capture mode
///
/// Installs a global subscriber whose pipeline enriches with both bridges
/// (reading [`CorrelationCell`] and [`ExtraFieldsCell`] directly, without
/// the process-wide setup) and records into a shared capture. Returns the
/// shared capture; tests should filter by a unique message. Never panics,
/// even when the process already has a global subscriber.
///
/// # Example
///
/// ```
/// use ctxlog_logging::logging_facility::test_capture::init_test_capture;
/// use ctxlog_logging::CorrelationCell;
///
/// let capture = init_test_capture();
/// CorrelationCell::scope("doc-1", || tracing::info!("doc example event"));
/// capture.assert_event_exists("doc example event");
/// ```
pub fn init_test_capture() -> TestCapture {
    GLOBAL_CAPTURE
        .get_or_init(|| {
            let (appender, capture) = CaptureAppender::new();
            let pipeline = Pipeline::builder()
                .enricher(CorrelationContextBridge::new(CorrelationCell))
                .enricher(ExtraFieldsBridge::new(ExtraFieldsCell))
                .appender(appender)
                .build();
            // If another global subscriber is already installed it keeps
            // receiving events and the capture stays empty.
            let _ = tracing_subscriber::registry()
                .with(EnrichmentLayer::new(pipeline))
                .try_init();
            capture
        })
        .clone()
}
