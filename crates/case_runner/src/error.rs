//! CaseError - Errors raised while building or loading case tables
//!
//! The runner itself never produces these: a failing test body's error is
//! handed back to the caller untouched.

use thiserror::Error;

/// Errors that can occur when constructing, loading or decoding cases
#[derive(Debug, Error)]
pub enum CaseError {
    /// A case table entry is not a mapping
    #[error("case {index} is not a mapping (found {found})")]
    NotAMapping { index: usize, found: &'static str },

    /// The top level of a case table is not an array
    #[error("{origin} is not a table of cases (found {found})")]
    NotATable { origin: String, found: &'static str },

    /// A well-known field holds a value of the wrong shape
    #[error("case {index}: `{field}` must be {expected}, found {found}")]
    InvalidField {
        index: usize,
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    /// IO error reading a case table
    #[error("IO error reading {path}: {error}")]
    Io { path: String, error: String },

    /// JSON parsing error
    #[error("Invalid JSON in {origin}: {error}")]
    InvalidJson { origin: String, error: String },

    /// YAML parsing error
    #[error("Invalid YAML in {origin}: {error}")]
    InvalidYaml { origin: String, error: String },

    /// File extension is not one of json, yaml or yml
    #[error("Unsupported case table format: {path}")]
    UnsupportedFormat { path: String },

    /// Setup or expected data did not match the requested type
    #[error("Failed to decode `{field}`: {error}")]
    Decode { field: &'static str, error: String },
}

/// Result type for case operations
pub type CaseResult<T> = Result<T, CaseError>;

/// Short JSON type name used in error messages.
pub(crate) fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "mapping",
    }
}
