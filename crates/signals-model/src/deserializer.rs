//! ---
//! sig_section: "02-envelope-protocol"
//! sig_subsection: "module"
//! sig_type: "source"
//! sig_scope: "code"
//! sig_description: "Exact type-tag validation ahead of payload extraction."
//! sig_version: "v0.0.0-prealpha"
//! sig_owner: "tbd"
//! ---
use tracing::debug;

use crate::error::{Result, SignalError};
use crate::field::{FieldReader, JsonObject};
use crate::signal::{json_fields, validate_type_tag};

/// Checks the `type` embedded in raw JSON against an expected tag before any
/// payload field is read.
///
/// Every concrete signal parses through one of these so the exact-match check
/// lives in a single place while field extraction stays with the signal:
///
/// ```ignore
/// TypeValidatingDeserializer::new(MODIFY_ATTRIBUTE, raw)?
///     .deserialize(|| Ok(ModifyAttribute { /* read fields */ }))
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TypeValidatingDeserializer<'a> {
    expected: &'a str,
    raw: &'a JsonObject,
}

impl<'a> TypeValidatingDeserializer<'a> {
    /// Fails with [`SignalError::MalformedTypeTag`] when `expected` is blank or
    /// lacks a namespace separator, before `raw` is inspected.
    pub fn new(expected: &'a str, raw: &'a JsonObject) -> Result<Self> {
        validate_type_tag(expected)?;
        Ok(Self { expected, raw })
    }

    pub fn expected_type(&self) -> &'a str {
        self.expected
    }

    /// Field reader reporting errors against the expected type.
    pub fn reader(&self) -> FieldReader<'a> {
        FieldReader::new(self.raw, self.expected)
    }

    /// Run `construct` once the embedded type matches exactly. The closure is
    /// never invoked on a missing or mismatched type.
    pub fn deserialize<T, F>(self, construct: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let actual = self.reader().string(&json_fields::TYPE)?;
        if actual != self.expected {
            debug!(
                expected = self.expected,
                actual = %actual,
                "rejecting signal with mismatched type"
            );
            return Err(SignalError::TypeMismatch {
                expected: self.expected.to_owned(),
                actual,
            });
        }
        construct()
    }
}
