//! ctxlog logging - contextual enrichment of log events
//!
//! This crate injects ambient context into every emitted log event before
//! any output appender sees it:
//!
//! - **Correlation id**: [`CorrelationContextBridge`] writes the current
//!   correlation id into the event metadata under `correlation-id`
//! - **Extra fields**: [`ExtraFieldsBridge`] copies the current extra-field
//!   mapping into the thread's [`SharedLoggingContext`] (MDC)
//! - **Pipeline**: [`Pipeline`] runs enrichers strictly before appenders
//! - **Facility**: a `tracing` layer plus `init(profile, pipeline)` wiring,
//!   with console output through `tracing_subscriber::fmt`
//!
//! # Usage
//!
//! ```no_run
//! use ctxlog_logging::{
//!     correlation, extra_fields, CorrelationCell, ExtraFieldsCell, LoggingConfig,
//! };
//!
//! // Bind the context sources once at startup
//! correlation::setup(CorrelationCell).unwrap();
//! extra_fields::setup(ExtraFieldsCell).unwrap();
//! ctxlog_logging::logging_facility::init_from_config(&LoggingConfig::default()).unwrap();
//!
//! CorrelationCell::scope("req-1", || {
//!     tracing::info!("handling request");
//! });
//! ```

pub mod config;
pub mod correlation;
pub mod event;
pub mod extra_fields;
pub mod format;
pub mod logging_facility;
pub mod mdc;
pub mod pipeline;

pub use config::{AppenderKind, EnricherKind, LoggingConfig};
pub use correlation::{
    current_correlation_id, CorrelationCell, CorrelationContextBridge, CorrelationSource,
};
pub use event::LogEvent;
pub use extra_fields::{ExtraFieldsBridge, ExtraFieldsCell, ExtraFieldsSource};
pub use format::{output_layer, ContextFormat, Format};
pub use logging_facility::{init, Profile};
pub use mdc::SharedLoggingContext;
pub use pipeline::{Appender, Enricher, Pipeline, PipelineBuilder, ShareMode};

pub use ctxlog_core_types::{CorrelationId, ExtraFields, FieldKey, FieldValue};
pub use ctxlog_errors::{CtxLogError, ErrorKind, Result};

#[doc(hidden)]
pub mod __private {
    pub use ctxlog_core_types::{ExtraFields, FieldKey, FieldValue};

    /// Serialize a macro argument into a field value; unserializable values
    /// become null and are therefore skipped by the bridge.
    pub fn to_field_value<T: serde::Serialize + ?Sized>(value: &T) -> FieldValue {
        serde_json::to_value(value).unwrap_or(FieldValue::Null)
    }
}
