//! Correlation identifier carried by every log event of one unit of work
//!
//! The identifier is an opaque string. The empty string is the documented
//! default for "no correlation id bound", so an event never carries a
//! missing or `null` correlation field.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier attached to all log events produced while handling one
/// logical unit of work
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Wrap an existing identifier (e.g. one received in a request header)
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh identifier using UUIDv7
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the default (unset) identifier
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CorrelationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CorrelationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_unique_and_non_empty() {
        let id1 = CorrelationId::generate();
        let id2 = CorrelationId::generate();

        assert_ne!(id1, id2);
        assert!(!id1.is_empty());
        assert!(!id2.is_empty());
    }

    #[test]
    fn test_default_is_empty_string() {
        let id = CorrelationId::default();
        assert_eq!(id.as_str(), "");
        assert!(id.is_empty());
    }

    #[test]
    fn test_display_matches_as_str() {
        let id = CorrelationId::new("req-42");
        assert_eq!(format!("{}", id), "req-42");
        assert_eq!(id.clone().into_string(), id.as_str());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = CorrelationId::new("abc");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"abc\"");
        let back: CorrelationId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
