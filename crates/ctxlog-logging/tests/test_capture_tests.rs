#![allow(clippy::unwrap_used, clippy::expect_used)]

// Runs in its own test binary: the global subscriber is installed first by
// the test itself.

use ctxlog_logging::logging_facility::init_test_capture;
use tracing_subscriber::util::SubscriberInitExt;

#[test]
fn test_capture_init_tolerates_existing_global_subscriber() {
    tracing_subscriber::registry().try_init().unwrap();

    let capture = init_test_capture();
    tracing::info!("test_capture_existing_subscriber_unique_1");

    // The host subscriber won, so nothing reaches the capture
    assert_eq!(
        capture.count_events(|e| e.event.message == "test_capture_existing_subscriber_unique_1"),
        0
    );
    // Repeated calls hand back the same capture without panicking
    init_test_capture().clear();
}
