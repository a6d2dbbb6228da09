//! ---
//! sig_section: "02-envelope-protocol"
//! sig_subsection: "module"
//! sig_type: "source"
//! sig_scope: "code"
//! sig_description: "Field definitions and the version-gated visibility engine."
//! sig_version: "v0.0.0-prealpha"
//! sig_owner: "tbd"
//! ---
//! A payload field is emitted when the requested schema version is one of the
//! versions it is declared for and every caller predicate accepts it. The same
//! engine backs command and response serialization.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{json_kind, Result, SignalError};
use crate::schema_version::SchemaVersion;

/// JSON object form of a serialized signal.
pub type JsonObject = serde_json::Map<String, Value>;

/// Classification attached to each field definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldMarker {
    /// Ordinary payload field.
    Regular,
    /// Field omitted by the default predicate.
    Hidden,
    /// Bookkeeping field such as an embedded schema version.
    Special,
}

/// A named payload field and the schema versions it appears in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDefinition {
    key: &'static str,
    versions: &'static [SchemaVersion],
    marker: FieldMarker,
}

impl FieldDefinition {
    pub const fn new(
        key: &'static str,
        versions: &'static [SchemaVersion],
        marker: FieldMarker,
    ) -> Self {
        Self {
            key,
            versions,
            marker,
        }
    }

    /// Regular field present in the given versions.
    pub const fn regular(key: &'static str, versions: &'static [SchemaVersion]) -> Self {
        Self::new(key, versions, FieldMarker::Regular)
    }

    /// Hidden field present in the given versions.
    pub const fn hidden(key: &'static str, versions: &'static [SchemaVersion]) -> Self {
        Self::new(key, versions, FieldMarker::Hidden)
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn versions(&self) -> &'static [SchemaVersion] {
        self.versions
    }

    pub fn marker(&self) -> FieldMarker {
        self.marker
    }

    pub fn is_marked(&self, marker: FieldMarker) -> bool {
        self.marker == marker
    }

    pub fn is_valid_in(&self, version: SchemaVersion) -> bool {
        self.versions.contains(&version)
    }

    /// Visibility decision: declared for `version` and accepted by `predicate`.
    pub fn is_included(&self, version: SchemaVersion, predicate: &FieldPredicate) -> bool {
        self.is_valid_in(version) && predicate.test(self)
    }
}

/// Composable boolean filter over field definitions.
///
/// Predicates combine with logical AND, so the order of composition never
/// changes the outcome.
#[derive(Clone)]
pub struct FieldPredicate {
    test: Arc<dyn Fn(&FieldDefinition) -> bool + Send + Sync>,
    label: Arc<str>,
}

impl FieldPredicate {
    pub fn new<F>(label: impl Into<Arc<str>>, test: F) -> Self
    where
        F: Fn(&FieldDefinition) -> bool + Send + Sync + 'static,
    {
        Self {
            test: Arc::new(test),
            label: label.into(),
        }
    }

    /// Accept every field.
    pub fn all() -> Self {
        Self::new("all", |_| true)
    }

    /// Accept every field that is not marked hidden. Default for `to_json`.
    pub fn not_hidden() -> Self {
        Self::new("not-hidden", |field| !field.is_marked(FieldMarker::Hidden))
    }

    /// Accept regular fields only.
    pub fn regular() -> Self {
        Self::new("regular", |field| field.is_marked(FieldMarker::Regular))
    }

    pub fn test(&self, field: &FieldDefinition) -> bool {
        (self.test)(field)
    }

    /// Logical AND of `self` and `other`.
    pub fn and(&self, other: &FieldPredicate) -> Self {
        let left = Arc::clone(&self.test);
        let right = Arc::clone(&other.test);
        Self {
            test: Arc::new(move |field| left(field) && right(field)),
            label: format!("{}+{}", self.label, other.label).into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Default for FieldPredicate {
    fn default() -> Self {
        Self::not_hidden()
    }
}

impl fmt::Debug for FieldPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FieldPredicate").field(&self.label).finish()
    }
}

/// Builds the JSON object of one signal, applying the visibility engine to
/// every declared field.
pub struct JsonObjectWriter<'p> {
    object: JsonObject,
    version: SchemaVersion,
    predicate: &'p FieldPredicate,
}

impl<'p> JsonObjectWriter<'p> {
    pub fn new(version: SchemaVersion, predicate: &'p FieldPredicate) -> Self {
        Self {
            object: JsonObject::new(),
            version,
            predicate,
        }
    }

    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    pub fn predicate(&self) -> &'p FieldPredicate {
        self.predicate
    }

    /// Write `value` under `field` if the field is visible.
    pub fn set(&mut self, field: &FieldDefinition, value: impl Into<Value>) -> &mut Self {
        if field.is_included(self.version, self.predicate) {
            self.object.insert(field.key().to_owned(), value.into());
        }
        self
    }

    /// Like [`set`](Self::set), skipping `None`.
    pub fn set_optional<V: Into<Value>>(
        &mut self,
        field: &FieldDefinition,
        value: Option<V>,
    ) -> &mut Self {
        if let Some(value) = value {
            self.set(field, value);
        }
        self
    }

    /// Write a value that bypasses the visibility engine.
    pub(crate) fn set_always(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.object.insert(key.to_owned(), value.into());
        self
    }

    pub fn build(self) -> JsonObject {
        self.object
    }
}

/// Typed accessors over a raw JSON object, reporting failures against the
/// signal type being reconstructed.
#[derive(Debug, Clone, Copy)]
pub struct FieldReader<'a> {
    raw: &'a JsonObject,
    type_tag: &'a str,
}

impl<'a> FieldReader<'a> {
    pub fn new(raw: &'a JsonObject, type_tag: &'a str) -> Self {
        Self { raw, type_tag }
    }

    pub fn raw(&self) -> &'a JsonObject {
        self.raw
    }

    fn missing(&self, field: &FieldDefinition) -> SignalError {
        SignalError::MissingRequiredField {
            field: field.key().to_owned(),
            type_tag: self.type_tag.to_owned(),
        }
    }

    fn invalid(&self, field: &FieldDefinition, expected: &'static str) -> SignalError {
        SignalError::InvalidFieldValue {
            field: field.key().to_owned(),
            type_tag: self.type_tag.to_owned(),
            expected,
        }
    }

    /// Any JSON value; absent is an error.
    pub fn value(&self, field: &FieldDefinition) -> Result<Value> {
        self.raw
            .get(field.key())
            .cloned()
            .ok_or_else(|| self.missing(field))
    }

    pub fn optional_value(&self, field: &FieldDefinition) -> Option<Value> {
        self.raw.get(field.key()).cloned()
    }

    pub fn string(&self, field: &FieldDefinition) -> Result<String> {
        self.optional_string(field)?
            .ok_or_else(|| self.missing(field))
    }

    pub fn optional_string(&self, field: &FieldDefinition) -> Result<Option<String>> {
        match self.raw.get(field.key()) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(self.invalid(field, "string")),
        }
    }

    pub fn i64(&self, field: &FieldDefinition) -> Result<i64> {
        self.optional_i64(field)?.ok_or_else(|| self.missing(field))
    }

    pub fn optional_i64(&self, field: &FieldDefinition) -> Result<Option<i64>> {
        match self.raw.get(field.key()) {
            None => Ok(None),
            Some(value) => value
                .as_i64()
                .map(Some)
                .ok_or_else(|| self.invalid(field, "integer")),
        }
    }

    pub fn object(&self, field: &FieldDefinition) -> Result<&'a JsonObject> {
        match self.raw.get(field.key()) {
            None => Err(self.missing(field)),
            Some(Value::Object(object)) => Ok(object),
            Some(other) => {
                tracing::debug!(field = field.key(), found = json_kind(other), "expected object");
                Err(self.invalid(field, "object"))
            }
        }
    }

    pub fn array(&self, field: &FieldDefinition) -> Result<&'a Vec<Value>> {
        match self.raw.get(field.key()) {
            None => Err(self.missing(field)),
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err(self.invalid(field, "array")),
        }
    }
}
