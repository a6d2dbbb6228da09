//! ---
//! sig_section: "02-envelope-protocol"
//! sig_subsection: "module"
//! sig_type: "source"
//! sig_scope: "code"
//! sig_description: "Error taxonomy shared by envelopes, registries and the aggregator."
//! sig_version: "v0.0.0-prealpha"
//! sig_owner: "tbd"
//! ---
use crate::schema_version::SchemaVersion;

/// Shared result type for envelope operations.
pub type Result<T> = std::result::Result<T, SignalError>;

/// Failures raised while building, serializing or reconstructing signals.
///
/// Every variant is returned synchronously at the point of violation. Nothing
/// in this crate retries or swallows them.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// A type tag was empty or lacked the `:` namespace separator.
    #[error("malformed type tag '{tag}': expected '<namespace>:<name>'")]
    MalformedTypeTag { tag: String },
    /// A mandatory JSON field was absent.
    #[error("required field '{field}' is missing from the JSON of '{type_tag}'")]
    MissingRequiredField { field: String, type_tag: String },
    /// A JSON field was present but held a value of the wrong shape.
    #[error("field '{field}' of '{type_tag}' is invalid: expected {expected}")]
    InvalidFieldValue {
        field: String,
        type_tag: String,
        expected: &'static str,
    },
    /// The embedded `type` differs from the expected tag.
    #[error("type mismatch: expected '{expected}' but JSON declares '{actual}'")]
    TypeMismatch { expected: String, actual: String },
    /// No parse strategy is registered for the tag.
    #[error("no parse strategy registered for type '{tag}'")]
    UnknownType { tag: String },
    /// A signal was asked to operate outside its supported schema versions.
    #[error("'{type_tag}' does not support schema version {version}")]
    UnsupportedSchemaVersion {
        type_tag: String,
        version: SchemaVersion,
    },
    /// The operation is never valid for this signal kind.
    #[error("'{type_tag}' does not support {operation}")]
    UnsupportedMutation {
        type_tag: String,
        operation: &'static str,
    },
    /// The same tag was registered twice while building a registry.
    #[error("type '{tag}' is already registered")]
    DuplicateRegistration { tag: String },
    /// Raw input was valid JSON but not a JSON object.
    #[error("expected a JSON object, found {found}")]
    NotAnObject { found: &'static str },
    /// Wrapper for JSON syntax problems.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SignalError {
    /// Short, stable label used for metric dimensions and structured logs.
    pub fn reason(&self) -> &'static str {
        match self {
            SignalError::MalformedTypeTag { .. } => "malformed_type_tag",
            SignalError::MissingRequiredField { .. } => "missing_required_field",
            SignalError::InvalidFieldValue { .. } => "invalid_field_value",
            SignalError::TypeMismatch { .. } => "type_mismatch",
            SignalError::UnknownType { .. } => "unknown_type",
            SignalError::UnsupportedSchemaVersion { .. } => "unsupported_schema_version",
            SignalError::UnsupportedMutation { .. } => "unsupported_mutation",
            SignalError::DuplicateRegistration { .. } => "duplicate_registration",
            SignalError::NotAnObject { .. } => "not_an_object",
            SignalError::Json(_) => "json",
        }
    }
}

/// Names the JSON kind of a value for diagnostics.
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
