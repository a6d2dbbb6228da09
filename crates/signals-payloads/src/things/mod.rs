//! ---
//! sig_section: "03-payload-schemas"
//! sig_subsection: "module"
//! sig_type: "source"
//! sig_scope: "code"
//! sig_description: "Thing commands and responses."
//! sig_version: "v0.0.0-prealpha"
//! sig_owner: "tbd"
//! ---
//! Commands addressing things and their attributes, and the matching responses.

pub mod commands;
pub mod responses;

pub use commands::{
    CreateThing, DeleteAttribute, ModifyAttribute, ModifyPolicyId, RetrieveAttribute,
    ThingAuthorization,
};
pub use responses::{
    CreateThingResponse, DeleteAttributeResponse, ModifyAttributeResponse,
    ModifyPolicyIdResponse, RetrieveAttributeResponse,
};

/// Payload fields shared by thing signals.
pub mod fields {
    use signals_model::{FieldDefinition, FieldMarker, SchemaVersion};

    pub const THING_ID: FieldDefinition = FieldDefinition::regular("thingId", SchemaVersion::ALL);
    pub const ATTRIBUTE: FieldDefinition =
        FieldDefinition::regular("attribute", SchemaVersion::ALL);
    pub const VALUE: FieldDefinition = FieldDefinition::regular("value", SchemaVersion::ALL);
    pub const ATTRIBUTES: FieldDefinition =
        FieldDefinition::regular("attributes", SchemaVersion::ALL);
    pub const THING: FieldDefinition = FieldDefinition::regular("thing", SchemaVersion::ALL);
    /// Access control list; replaced by policies in V2.
    pub const ACL: FieldDefinition = FieldDefinition::regular("acl", &[SchemaVersion::V1]);
    pub const POLICY_ID: FieldDefinition =
        FieldDefinition::regular("policyId", &[SchemaVersion::V2]);
    /// Embedded schema version of a thing document.
    pub const SCHEMA_VERSION: FieldDefinition =
        FieldDefinition::new("__schemaVersion", SchemaVersion::ALL, FieldMarker::Hidden);
}

/// Normalise an attribute path to JSON-pointer form with a leading `/`.
pub(crate) fn attribute_pointer(path: impl Into<String>) -> String {
    let path = path.into();
    if path.starts_with('/') {
        path
    } else {
        format!("/{}", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_paths_are_pointers() {
        assert_eq!(attribute_pointer("location/lat"), "/location/lat");
        assert_eq!(attribute_pointer("/serial"), "/serial");
    }
}
