//! sbar-types: Shared field types for the sbar status line.
//!
//! This crate contains the closed universe of [`Field`] identifiers, the
//! composite-to-sub-field table, and the [`FieldSet`] bitmask with its
//! textual wire form. It has no knowledge of templates or providers, making
//! it suitable for any process that only sends notifications.

pub mod field;
pub mod field_set;
pub mod markers;

// Re-export commonly used types at the crate root for convenience
pub use field::{Field, FieldKind, FieldMetadata, UnknownField, FIELD_COUNT};
pub use field_set::{FieldSet, FieldSetParseError};
pub use markers::{ERROR_MARKER, NULL_MARKER, STANDBY_MARKER};
