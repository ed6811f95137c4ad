//! Canonical schema constants for enriched log events
//!
//! These constants ensure the bridges and appenders agree on key names.

// Metadata written by the correlation bridge
pub const FIELD_CORRELATION_ID: &str = "correlation-id";

// Written by the correlation bridge when no correlation id is bound
pub const DEFAULT_CORRELATION_ID: &str = "";

// Keys used when an event is rendered as a JSON line
pub const FIELD_TIMESTAMP: &str = "timestamp";
pub const FIELD_LEVEL: &str = "level";
pub const FIELD_TARGET: &str = "target";
pub const FIELD_MESSAGE: &str = "message";
pub const FIELD_FIELDS: &str = "fields";
pub const FIELD_METADATA: &str = "metadata";
pub const FIELD_MDC: &str = "mdc";

// Enricher names accepted in configuration
pub const ENRICHER_CORRELATION_ID: &str = "correlation-id";
pub const ENRICHER_EXTRA_FIELDS: &str = "extra-fields";
