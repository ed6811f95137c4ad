//! Structured logging facility for ctxlog
//!
//! This module wires the enrichment pipeline into `tracing`:
//! - Single initialization point via `init(profile, pipeline)` or
//!   `init_from_config(config)`
//! - `EnrichmentLayer`, which enriches every `tracing` event before the
//!   pipeline's appenders see it
//! - `extra_fields!` for building extra-field mappings
//! - Test capture mode for deterministic assertions
//!
//! # Usage
//!
//! ```rust
//! use ctxlog_logging::logging_facility::{init, Profile};
//! use ctxlog_logging::{CorrelationCell, CorrelationContextBridge, Pipeline};
//!
//! let pipeline = Pipeline::builder()
//!     .enricher(CorrelationContextBridge::new(CorrelationCell))
//!     .build();
//!
//! // Initialize once at application startup
//! init(Profile::Development, pipeline);
//! ```

pub mod init;
pub mod layer;
pub mod macros;
pub mod test_capture;

pub use init::{init, init_from_config, Profile};
pub use layer::EnrichmentLayer;
pub use test_capture::{init_test_capture, CaptureAppender, CapturedEvent, TestCapture};
