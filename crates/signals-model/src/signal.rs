//! ---
//! sig_section: "02-envelope-protocol"
//! sig_subsection: "module"
//! sig_type: "source"
//! sig_scope: "code"
//! sig_description: "Envelope contract shared by commands and command responses."
//! sig_version: "v0.0.0-prealpha"
//! sig_owner: "tbd"
//! ---
use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::Display;

use crate::error::{Result, SignalError};
use crate::field::{FieldPredicate, JsonObject, JsonObjectWriter};
use crate::headers::Headers;
use crate::schema_version::SchemaVersion;

/// Separator between the namespace and the name of a type tag.
pub const TYPE_SEPARATOR: char = ':';

/// Envelope-level JSON fields written for every signal.
pub mod json_fields {
    use crate::field::FieldDefinition;
    use crate::schema_version::SchemaVersion;

    /// Type tag of the signal.
    pub const TYPE: FieldDefinition = FieldDefinition::regular("type", SchemaVersion::ALL);
    /// Status code of a command response.
    pub const STATUS: FieldDefinition = FieldDefinition::regular("status", SchemaVersion::ALL);
}

/// Check that `tag` is non-blank and carries a namespace separator.
pub fn validate_type_tag(tag: &str) -> Result<()> {
    if tag.trim().is_empty() || !tag.contains(TYPE_SEPARATOR) {
        return Err(SignalError::MalformedTypeTag {
            tag: tag.to_owned(),
        });
    }
    Ok(())
}

/// Short name of a type tag: everything after the first `:`, or the whole tag
/// when no separator is present.
pub fn name_of(type_tag: &str) -> &str {
    type_tag
        .split_once(TYPE_SEPARATOR)
        .map(|(_, name)| name)
        .unwrap_or(type_tag)
}

/// Intent of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Query,
    Modify,
    Delete,
}

/// Behaviour common to every typed, header-carrying message.
pub trait Signal: fmt::Debug + Send + Sync + 'static {
    /// Namespaced type tag, e.g. `things.commands:modifyAttribute`.
    fn type_tag(&self) -> &str;

    fn name(&self) -> &str {
        name_of(self.type_tag())
    }

    fn headers(&self) -> &Headers;

    /// Schema versions this signal may be serialized or parsed in.
    fn supported_schema_versions(&self) -> &'static [SchemaVersion] {
        SchemaVersion::ALL
    }

    fn implements_schema_version(&self, version: SchemaVersion) -> bool {
        self.supported_schema_versions().contains(&version)
    }

    /// Fail with [`SignalError::UnsupportedSchemaVersion`] outside the supported set.
    fn ensure_schema_version(&self, version: SchemaVersion) -> Result<()> {
        if self.implements_schema_version(version) {
            Ok(())
        } else {
            Err(SignalError::UnsupportedSchemaVersion {
                type_tag: self.type_tag().to_owned(),
                version,
            })
        }
    }

    /// Version picked by `to_json` when the caller does not choose one.
    fn default_schema_version(&self) -> SchemaVersion {
        self.headers()
            .schema_version()
            .unwrap_or(SchemaVersion::LATEST)
    }

    /// Write the payload fields, in declaration order, through `writer`.
    fn append_payload(&self, writer: &mut JsonObjectWriter<'_>) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}

/// A request addressed to a service.
pub trait Command: Signal {
    fn category(&self) -> Category;

    /// Serialize at the header-negotiated version, omitting hidden fields.
    fn to_json(&self) -> Result<JsonObject> {
        self.to_json_with(self.default_schema_version(), &FieldPredicate::default())
    }

    fn to_json_with(
        &self,
        version: SchemaVersion,
        predicate: &FieldPredicate,
    ) -> Result<JsonObject> {
        write_signal(self, None, version, predicate)
    }
}

/// A reply to a [`Command`], carrying an HTTP-shaped status code.
pub trait CommandResponse: Signal {
    fn status_code(&self) -> u16;

    /// Serialize at the header-negotiated version, omitting hidden fields.
    fn to_json(&self) -> Result<JsonObject> {
        self.to_json_with(self.default_schema_version(), &FieldPredicate::default())
    }

    fn to_json_with(
        &self,
        version: SchemaVersion,
        predicate: &FieldPredicate,
    ) -> Result<JsonObject> {
        write_signal(self, Some(self.status_code()), version, predicate)
    }
}

/// Copy-on-write header replacement returning the same concrete kind.
pub trait WithHeaders: Sized {
    fn with_headers(&self, headers: Headers) -> Self;
}

/// Responses whose payload is a single entity value.
pub trait WithEntity: Sized {
    /// Entity as it would be serialized in `version`.
    fn entity(&self, version: SchemaVersion) -> Result<Value>;

    /// New response carrying `entity` instead of the current one.
    fn set_entity(&self, entity: Value) -> Result<Self>;
}

fn write_signal<S>(
    signal: &S,
    status: Option<u16>,
    version: SchemaVersion,
    predicate: &FieldPredicate,
) -> Result<JsonObject>
where
    S: Signal + ?Sized,
{
    signal.ensure_schema_version(version)?;
    let mut writer = JsonObjectWriter::new(version, predicate);
    writer.set_always(json_fields::TYPE.key(), signal.type_tag());
    if let Some(status) = status {
        writer.set_always(json_fields::STATUS.key(), status);
    }
    signal.append_payload(&mut writer)?;
    tracing::trace!(
        type_tag = signal.type_tag(),
        version = %version,
        predicate = predicate.label(),
        "signal serialized"
    );
    Ok(writer.build())
}
