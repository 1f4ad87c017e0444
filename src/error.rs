//! Error types for store operations.

use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors surfaced at the dynamic boundaries of the store.
///
/// Statically typed states cannot produce these: a `Patch` is either a
/// partial or a function by construction. They only arise when a `Record`
/// is built from untyped JSON.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A JSON patch was not an object.
    #[error("patch must be a JSON object, found {found}")]
    InvalidPatch {
        /// JSON kind that was supplied instead.
        found: &'static str,
    },

    /// A JSON initial state was not an object.
    #[error("state must be a JSON object, found {found}")]
    InvalidState {
        /// JSON kind that was supplied instead.
        found: &'static str,
    },
}

/// Name of the JSON kind, for error messages.
pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
