//! ---
//! sig_section: "03-payload-schemas"
//! sig_subsection: "module"
//! sig_type: "source"
//! sig_scope: "code"
//! sig_description: "Commands creating and mutating things."
//! sig_version: "v0.0.0-prealpha"
//! sig_owner: "tbd"
//! ---
use serde_json::Value;
use signals_model::{
    Category, Command, Headers, JsonObject, JsonObjectWriter, Result,
    SchemaVersion, Signal, SignalError, TypeValidatingDeserializer, WithEntity,
};

use super::attribute_pointer;
use super::fields::{ACL, ATTRIBUTE, ATTRIBUTES, POLICY_ID, SCHEMA_VERSION, THING_ID, VALUE};

/// How a new thing is authorised. ACLs only exist in V1, policies only in V2.
#[derive(Debug, Clone, PartialEq)]
pub enum ThingAuthorization {
    Acl(Value),
    Policy(String),
}

/// Create a thing, optionally with initial attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateThing {
    thing_id: String,
    authorization: Option<ThingAuthorization>,
    attributes: Option<JsonObject>,
    headers: Headers,
}

impl CreateThing {
    pub const TYPE: &'static str = "things.commands:createThing";

    pub fn new(
        thing_id: impl Into<String>,
        authorization: Option<ThingAuthorization>,
        attributes: Option<JsonObject>,
        headers: Headers,
    ) -> Self {
        Self {
            thing_id: thing_id.into(),
            authorization,
            attributes,
            headers,
        }
    }

    pub fn thing_id(&self) -> &str {
        &self.thing_id
    }

    pub fn authorization(&self) -> Option<&ThingAuthorization> {
        self.authorization.as_ref()
    }

    pub fn attributes(&self) -> Option<&JsonObject> {
        self.attributes.as_ref()
    }

    pub fn from_json(raw: &JsonObject, headers: &Headers) -> Result<Self> {
        let deserializer = TypeValidatingDeserializer::new(Self::TYPE, raw)?;
        let reader = deserializer.reader();
        deserializer.deserialize(|| {
            let thing_id = reader.string(&THING_ID)?;
            let acl = reader.optional_value(&ACL);
            let policy_id = reader.optional_string(&POLICY_ID)?;
            let authorization = match (acl, policy_id) {
                (Some(_), Some(_)) => {
                    return Err(SignalError::InvalidFieldValue {
                        field: ACL.key().to_owned(),
                        type_tag: Self::TYPE.to_owned(),
                        expected: "absent when policyId is set",
                    })
                }
                (Some(acl), None) => Some(ThingAuthorization::Acl(acl)),
                (None, Some(policy_id)) => Some(ThingAuthorization::Policy(policy_id)),
                (None, None) => None,
            };
            let attributes = if raw.contains_key(ATTRIBUTES.key()) {
                Some(reader.object(&ATTRIBUTES)?.clone())
            } else {
                None
            };
            Ok(Self::new(thing_id, authorization, attributes, headers.clone()))
        })
    }
}

impl Signal for CreateThing {
    crate::signal_basics!(Self::TYPE);

    fn supported_schema_versions(&self) -> &'static [SchemaVersion] {
        match self.authorization {
            Some(ThingAuthorization::Acl(_)) => &[SchemaVersion::V1],
            Some(ThingAuthorization::Policy(_)) => &[SchemaVersion::V2],
            None => SchemaVersion::ALL,
        }
    }

    fn append_payload(&self, writer: &mut JsonObjectWriter<'_>) -> Result<()> {
        let version = writer.version().to_int();
        writer
            .set(&THING_ID, self.thing_id.as_str())
            .set(&SCHEMA_VERSION, version);
        match &self.authorization {
            Some(ThingAuthorization::Acl(acl)) => {
                writer.set(&ACL, acl.clone());
            }
            Some(ThingAuthorization::Policy(policy_id)) => {
                writer.set(&POLICY_ID, policy_id.as_str());
            }
            None => {}
        }
        writer.set_optional(&ATTRIBUTES, self.attributes.clone());
        Ok(())
    }
}

impl Command for CreateThing {
    fn category(&self) -> Category {
        Category::Modify
    }
}

crate::with_headers!(CreateThing);

/// Create or overwrite one attribute of a thing.
#[derive(Debug, Clone, PartialEq)]
pub struct ModifyAttribute {
    thing_id: String,
    attribute: String,
    value: Value,
    headers: Headers,
}

impl ModifyAttribute {
    pub const TYPE: &'static str = "things.commands:modifyAttribute";

    pub fn new(
        thing_id: impl Into<String>,
        attribute: impl Into<String>,
        value: Value,
        headers: Headers,
    ) -> Self {
        Self {
            thing_id: thing_id.into(),
            attribute: attribute_pointer(attribute),
            value,
            headers,
        }
    }

    pub fn thing_id(&self) -> &str {
        &self.thing_id
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn from_json(raw: &JsonObject, headers: &Headers) -> Result<Self> {
        let deserializer = TypeValidatingDeserializer::new(Self::TYPE, raw)?;
        let reader = deserializer.reader();
        deserializer.deserialize(|| {
            Ok(Self::new(
                reader.string(&THING_ID)?,
                reader.string(&ATTRIBUTE)?,
                reader.value(&VALUE)?,
                headers.clone(),
            ))
        })
    }
}

impl Signal for ModifyAttribute {
    crate::signal_basics!(Self::TYPE);

    fn append_payload(&self, writer: &mut JsonObjectWriter<'_>) -> Result<()> {
        writer
            .set(&THING_ID, self.thing_id.as_str())
            .set(&ATTRIBUTE, self.attribute.as_str())
            .set(&VALUE, self.value.clone());
        Ok(())
    }
}

impl Command for ModifyAttribute {
    fn category(&self) -> Category {
        Category::Modify
    }
}

crate::with_headers!(ModifyAttribute);

impl WithEntity for ModifyAttribute {
    fn entity(&self, _version: SchemaVersion) -> Result<Value> {
        Ok(self.value.clone())
    }

    fn set_entity(&self, entity: Value) -> Result<Self> {
        Ok(Self {
            value: entity,
            ..self.clone()
        })
    }
}

/// Read one attribute of a thing.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrieveAttribute {
    thing_id: String,
    attribute: String,
    headers: Headers,
}

impl RetrieveAttribute {
    pub const TYPE: &'static str = "things.commands:retrieveAttribute";

    pub fn new(
        thing_id: impl Into<String>,
        attribute: impl Into<String>,
        headers: Headers,
    ) -> Self {
        Self {
            thing_id: thing_id.into(),
            attribute: attribute_pointer(attribute),
            headers,
        }
    }

    pub fn thing_id(&self) -> &str {
        &self.thing_id
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn from_json(raw: &JsonObject, headers: &Headers) -> Result<Self> {
        attribute_command(Self::TYPE, raw, headers, |thing_id, attribute, headers| {
            Self::new(thing_id, attribute, headers)
        })
    }
}

impl Signal for RetrieveAttribute {
    crate::signal_basics!(Self::TYPE);

    fn append_payload(&self, writer: &mut JsonObjectWriter<'_>) -> Result<()> {
        writer
            .set(&THING_ID, self.thing_id.as_str())
            .set(&ATTRIBUTE, self.attribute.as_str());
        Ok(())
    }
}

impl Command for RetrieveAttribute {
    fn category(&self) -> Category {
        Category::Query
    }
}

crate::with_headers!(RetrieveAttribute);

/// Remove one attribute of a thing.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteAttribute {
    thing_id: String,
    attribute: String,
    headers: Headers,
}

impl DeleteAttribute {
    pub const TYPE: &'static str = "things.commands:deleteAttribute";

    pub fn new(
        thing_id: impl Into<String>,
        attribute: impl Into<String>,
        headers: Headers,
    ) -> Self {
        Self {
            thing_id: thing_id.into(),
            attribute: attribute_pointer(attribute),
            headers,
        }
    }

    pub fn thing_id(&self) -> &str {
        &self.thing_id
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn from_json(raw: &JsonObject, headers: &Headers) -> Result<Self> {
        attribute_command(Self::TYPE, raw, headers, |thing_id, attribute, headers| {
            Self::new(thing_id, attribute, headers)
        })
    }
}

impl Signal for DeleteAttribute {
    crate::signal_basics!(Self::TYPE);

    fn append_payload(&self, writer: &mut JsonObjectWriter<'_>) -> Result<()> {
        writer
            .set(&THING_ID, self.thing_id.as_str())
            .set(&ATTRIBUTE, self.attribute.as_str());
        Ok(())
    }
}

impl Command for DeleteAttribute {
    fn category(&self) -> Category {
        Category::Delete
    }
}

crate::with_headers!(DeleteAttribute);

/// Point a thing at a different policy. Policies do not exist in V1.
#[derive(Debug, Clone, PartialEq)]
pub struct ModifyPolicyId {
    thing_id: String,
    policy_id: String,
    headers: Headers,
}

impl ModifyPolicyId {
    pub const TYPE: &'static str = "things.commands:modifyPolicyId";

    pub fn new(
        thing_id: impl Into<String>,
        policy_id: impl Into<String>,
        headers: Headers,
    ) -> Self {
        Self {
            thing_id: thing_id.into(),
            policy_id: policy_id.into(),
            headers,
        }
    }

    pub fn thing_id(&self) -> &str {
        &self.thing_id
    }

    pub fn policy_id(&self) -> &str {
        &self.policy_id
    }

    pub fn from_json(raw: &JsonObject, headers: &Headers) -> Result<Self> {
        let deserializer = TypeValidatingDeserializer::new(Self::TYPE, raw)?;
        let reader = deserializer.reader();
        deserializer.deserialize(|| {
            Ok(Self::new(
                reader.string(&THING_ID)?,
                reader.string(&POLICY_ID)?,
                headers.clone(),
            ))
        })
    }
}

impl Signal for ModifyPolicyId {
    crate::signal_basics!(Self::TYPE);

    fn supported_schema_versions(&self) -> &'static [SchemaVersion] {
        &[SchemaVersion::V2]
    }

    fn append_payload(&self, writer: &mut JsonObjectWriter<'_>) -> Result<()> {
        writer
            .set(&THING_ID, self.thing_id.as_str())
            .set(&POLICY_ID, self.policy_id.as_str());
        Ok(())
    }
}

impl Command for ModifyPolicyId {
    fn category(&self) -> Category {
        Category::Modify
    }
}

crate::with_headers!(ModifyPolicyId);

impl WithEntity for ModifyPolicyId {
    fn entity(&self, _version: SchemaVersion) -> Result<Value> {
        Ok(Value::from(self.policy_id.as_str()))
    }

    fn set_entity(&self, entity: Value) -> Result<Self> {
        match entity {
            Value::String(policy_id) => Ok(Self {
                policy_id,
                ..self.clone()
            }),
            _ => Err(SignalError::InvalidFieldValue {
                field: POLICY_ID.key().to_owned(),
                type_tag: Self::TYPE.to_owned(),
                expected: "string",
            }),
        }
    }
}

/// Shared reader for commands carrying only `thingId` and `attribute`.
fn attribute_command<T>(
    type_tag: &'static str,
    raw: &JsonObject,
    headers: &Headers,
    construct: fn(String, String, Headers) -> T,
) -> Result<T> {
    let deserializer = TypeValidatingDeserializer::new(type_tag, raw)?;
    let reader = deserializer.reader();
    deserializer.deserialize(|| {
        Ok(construct(
            reader.string(&THING_ID)?,
            reader.string(&ATTRIBUTE)?,
            headers.clone(),
        ))
    })
}
