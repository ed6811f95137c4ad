//! One emitted log record as seen by enrichers and appenders

use std::collections::BTreeMap;
use tracing::field::{Field, Visit};
use tracing::Level;

/// A log event flowing through the enrichment pipeline
///
/// `metadata` is the per-event map bridges augment in place; `fields` holds
/// the structured fields the call site recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub fields: BTreeMap<String, String>,
    pub metadata: BTreeMap<String, String>,
}

impl LogEvent {
    pub fn new(level: Level, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            target: target.into(),
            message: message.into(),
            fields: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Add a call-site field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Insert or overwrite a metadata entry
    pub fn insert_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Build an event from a `tracing` event, splitting off the `message` field
    pub fn from_tracing(event: &tracing::Event<'_>) -> Self {
        let metadata = event.metadata();
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let message = visitor.fields.remove("message").unwrap_or_default();
        Self {
            level: *metadata.level(),
            target: metadata.target().to_string(),
            message,
            fields: visitor.fields,
            metadata: BTreeMap::new(),
        }
    }
}

#[derive(Default)]
struct FieldVisitor {
    fields: BTreeMap<String, String>,
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.fields
            .insert(field.name().to_string(), format!("{:?}", value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.fields
            .insert(field.name().to_string(), value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields
            .insert(field.name().to_string(), value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields
            .insert(field.name().to_string(), value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields
            .insert(field.name().to_string(), value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_event_has_empty_metadata() {
        let event = LogEvent::new(Level::INFO, "app", "hello").with_field("k", "v");
        assert!(event.metadata.is_empty());
        assert_eq!(event.fields.get("k"), Some(&"v".to_string()));
    }

    #[test]
    fn test_insert_metadata_overwrites() {
        let mut event = LogEvent::new(Level::DEBUG, "app", "x");
        event.insert_metadata("correlation-id", "a");
        event.insert_metadata("correlation-id", "b");
        assert_eq!(event.metadata_value("correlation-id"), Some("b"));
        assert_eq!(event.metadata.len(), 1);
    }
}
