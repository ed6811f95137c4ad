//! Core types shared across ctxlog facilities
//!
//! This crate provides foundational types used by both error handling
//! and the logging bridges:
//!
//! - **Correlation types**: CorrelationId
//! - **Field types**: FieldKey, FieldValue, ExtraFields and the key/value
//!   stringification used at the logging boundary
//! - **Schema constants**: Canonical field keys

pub mod correlation;
pub mod field;
pub mod schema;

pub use correlation::CorrelationId;
pub use field::{field_name, field_value_string, ExtraFields, FieldKey, FieldValue};
