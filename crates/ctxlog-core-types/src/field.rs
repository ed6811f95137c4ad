//! Extra-field keys and values
//!
//! Keys may carry a namespace (`app.http/user`) or keyword-style prefix
//! (`:user`). Only the bare name ever reaches the shared logging context;
//! [`field_name`] is the single place that conversion happens.

use std::collections::BTreeMap;
use std::fmt;

/// Value of an extra field. `Null` means "absent" and is never written.
pub type FieldValue = serde_json::Value;

/// Mapping of extra fields bound around a unit of work
pub type ExtraFields = BTreeMap<FieldKey, FieldValue>;

/// Key of an extra field
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldKey {
    /// A plain name, used verbatim
    Name(String),
    /// A namespace-qualified name; the namespace is dropped at the boundary
    Qualified { namespace: String, name: String },
}

impl FieldKey {
    /// Build a plain key
    pub fn name(name: impl Into<String>) -> Self {
        FieldKey::Name(name.into())
    }

    /// Build a namespace-qualified key
    pub fn qualified(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        FieldKey::Qualified {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Parse keyword-style text.
    ///
    /// A leading `:` is stripped, and text before the first `/` becomes the
    /// namespace. A lone `/` is a name, not a separator.
    ///
    /// ```
    /// use ctxlog_core_types::{field_name, FieldKey};
    ///
    /// assert_eq!(field_name(&FieldKey::parse(":user")), "user");
    /// assert_eq!(field_name(&FieldKey::parse(":app.http/user")), "user");
    /// assert_eq!(field_name(&FieldKey::parse("tenant")), "tenant");
    /// ```
    pub fn parse(text: &str) -> Self {
        let text = text.strip_prefix(':').unwrap_or(text);
        match text.split_once('/') {
            Some((namespace, name)) if !namespace.is_empty() && !name.is_empty() => {
                FieldKey::qualified(namespace, name)
            }
            _ => FieldKey::name(text),
        }
    }
}

impl From<&str> for FieldKey {
    fn from(s: &str) -> Self {
        FieldKey::Name(s.to_string())
    }
}

impl From<String> for FieldKey {
    fn from(s: String) -> Self {
        FieldKey::Name(s)
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKey::Name(name) => write!(f, "{}", name),
            FieldKey::Qualified { namespace, name } => write!(f, "{}/{}", namespace, name),
        }
    }
}

/// Bare name of a key as it appears in the shared logging context
pub fn field_name(key: &FieldKey) -> &str {
    match key {
        FieldKey::Name(name) => name,
        FieldKey::Qualified { name, .. } => name,
    }
}

/// Natural string form of a value, or `None` for null.
///
/// Strings are written without JSON quoting; everything else uses its JSON
/// text.
pub fn field_value_string(value: &FieldValue) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
