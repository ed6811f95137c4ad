//! Extra-field macros

/// Build an [`ExtraFields`](ctxlog_core_types::ExtraFields) mapping
///
/// Keys are anything convertible into a `FieldKey`; values are anything
/// `serde::Serialize`. `None` values serialize to null and are skipped by
/// the bridge.
///
/// # Example
///
/// ```
/// use ctxlog_logging::{extra_fields, ExtraFieldsCell};
///
/// let fields = extra_fields! { "user" => "alice", "attempt" => 3, "note" => None::<String> };
/// assert_eq!(fields.len(), 3);
///
/// ExtraFieldsCell::with_fields(fields, || {
///     tracing::info!("inside unit of work");
/// });
/// ```
#[macro_export]
macro_rules! extra_fields {
    () => {
        $crate::__private::ExtraFields::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut fields = $crate::__private::ExtraFields::new();
        $(
            fields.insert(
                $crate::__private::FieldKey::from($key),
                $crate::__private::to_field_value(&$value),
            );
        )+
        fields
    }};
}

#[cfg(test)]
mod tests {
    use crate::FieldKey;
    use serde_json::json;

    #[test]
    fn test_empty_macro() {
        let fields = extra_fields!();
        assert!(fields.is_empty());
    }

    #[test]
    fn test_macro_converts_keys_and_values() {
        let fields = extra_fields! {
            "user" => "alice",
            FieldKey::qualified("app", "attempt") => 2,
            String::from("flag") => true,
        };

        assert_eq!(fields.get(&FieldKey::from("user")), Some(&json!("alice")));
        assert_eq!(
            fields.get(&FieldKey::qualified("app", "attempt")),
            Some(&json!(2))
        );
        assert_eq!(fields.get(&FieldKey::from("flag")), Some(&json!(true)));
    }

    #[test]
    fn test_none_becomes_null() {
        let fields = extra_fields! { "gone" => None::<u32> };
        assert_eq!(fields.get(&FieldKey::from("gone")), Some(&json!(null)));
    }
}
