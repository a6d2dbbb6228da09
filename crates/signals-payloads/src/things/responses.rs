//! ---
//! sig_section: "03-payload-schemas"
//! sig_subsection: "module"
//! sig_type: "source"
//! sig_scope: "code"
//! sig_description: "Responses to thing commands."
//! sig_version: "v0.0.0-prealpha"
//! sig_owner: "tbd"
//! ---
use serde_json::Value;
use signals_model::{
    CommandResponse, Headers, JsonObject, JsonObjectWriter, Result, SchemaVersion, Signal,
    SignalError, TypeValidatingDeserializer, WithEntity,
};

use super::attribute_pointer;
use super::fields::{ATTRIBUTE, POLICY_ID, THING, THING_ID, VALUE};

const CREATED: u16 = 201;
const OK: u16 = 200;
const NO_CONTENT: u16 = 204;

/// Reply to `createThing`, echoing the stored thing document.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateThingResponse {
    thing_id: String,
    thing: JsonObject,
    headers: Headers,
}

impl CreateThingResponse {
    pub const TYPE: &'static str = "things.responses:createThing";

    pub fn new(thing_id: impl Into<String>, thing: JsonObject, headers: Headers) -> Self {
        Self {
            thing_id: thing_id.into(),
            thing,
            headers,
        }
    }

    pub fn thing_id(&self) -> &str {
        &self.thing_id
    }

    pub fn thing(&self) -> &JsonObject {
        &self.thing
    }

    pub fn from_json(raw: &JsonObject, headers: &Headers) -> Result<Self> {
        let deserializer = TypeValidatingDeserializer::new(Self::TYPE, raw)?;
        let reader = deserializer.reader();
        deserializer.deserialize(|| {
            Ok(Self::new(
                reader.string(&THING_ID)?,
                reader.object(&THING)?.clone(),
                headers.clone(),
            ))
        })
    }
}

impl Signal for CreateThingResponse {
    crate::signal_basics!(Self::TYPE);

    fn append_payload(&self, writer: &mut JsonObjectWriter<'_>) -> Result<()> {
        writer
            .set(&THING_ID, self.thing_id.as_str())
            .set(&THING, self.thing.clone());
        Ok(())
    }
}

impl CommandResponse for CreateThingResponse {
    fn status_code(&self) -> u16 {
        CREATED
    }
}

crate::with_headers!(CreateThingResponse);

impl WithEntity for CreateThingResponse {
    fn entity(&self, _version: SchemaVersion) -> Result<Value> {
        Ok(Value::Object(self.thing.clone()))
    }

    fn set_entity(&self, entity: Value) -> Result<Self> {
        match entity {
            Value::Object(thing) => Ok(Self {
                thing,
                ..self.clone()
            }),
            _ => Err(SignalError::InvalidFieldValue {
                field: THING.key().to_owned(),
                type_tag: Self::TYPE.to_owned(),
                expected: "object",
            }),
        }
    }
}

/// Reply to `modifyAttribute`: `201` with the new value when the attribute
/// was created, `204` when an existing one was overwritten.
#[derive(Debug, Clone, PartialEq)]
pub struct ModifyAttributeResponse {
    thing_id: String,
    attribute: String,
    created: Option<Value>,
    headers: Headers,
}

impl ModifyAttributeResponse {
    pub const TYPE: &'static str = "things.responses:modifyAttribute";

    pub fn created(
        thing_id: impl Into<String>,
        attribute: impl Into<String>,
        value: Value,
        headers: Headers,
    ) -> Self {
        Self {
            thing_id: thing_id.into(),
            attribute: attribute_pointer(attribute),
            created: Some(value),
            headers,
        }
    }

    pub fn modified(
        thing_id: impl Into<String>,
        attribute: impl Into<String>,
        headers: Headers,
    ) -> Self {
        Self {
            thing_id: thing_id.into(),
            attribute: attribute_pointer(attribute),
            created: None,
            headers,
        }
    }

    pub fn thing_id(&self) -> &str {
        &self.thing_id
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Value of a newly created attribute.
    pub fn value(&self) -> Option<&Value> {
        self.created.as_ref()
    }

    pub fn from_json(raw: &JsonObject, headers: &Headers) -> Result<Self> {
        let deserializer = TypeValidatingDeserializer::new(Self::TYPE, raw)?;
        let reader = deserializer.reader();
        deserializer.deserialize(|| {
            let thing_id = reader.string(&THING_ID)?;
            let attribute = reader.string(&ATTRIBUTE)?;
            Ok(match reader.optional_value(&VALUE) {
                Some(value) => Self::created(thing_id, attribute, value, headers.clone()),
                None => Self::modified(thing_id, attribute, headers.clone()),
            })
        })
    }
}

impl Signal for ModifyAttributeResponse {
    crate::signal_basics!(Self::TYPE);

    fn append_payload(&self, writer: &mut JsonObjectWriter<'_>) -> Result<()> {
        writer
            .set(&THING_ID, self.thing_id.as_str())
            .set(&ATTRIBUTE, self.attribute.as_str())
            .set_optional(&VALUE, self.created.clone());
        Ok(())
    }
}

impl CommandResponse for ModifyAttributeResponse {
    fn status_code(&self) -> u16 {
        if self.created.is_some() {
            CREATED
        } else {
            NO_CONTENT
        }
    }
}

crate::with_headers!(ModifyAttributeResponse);

/// Reply to `retrieveAttribute`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrieveAttributeResponse {
    thing_id: String,
    attribute: String,
    value: Value,
    headers: Headers,
}

impl RetrieveAttributeResponse {
    pub const TYPE: &'static str = "things.responses:retrieveAttribute";

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

impl Signal for RetrieveAttributeResponse {
    crate::signal_basics!(Self::TYPE);

    fn append_payload(&self, writer: &mut JsonObjectWriter<'_>) -> Result<()> {
        writer
            .set(&THING_ID, self.thing_id.as_str())
            .set(&ATTRIBUTE, self.attribute.as_str())
            .set(&VALUE, self.value.clone());
        Ok(())
    }
}

impl CommandResponse for RetrieveAttributeResponse {
    fn status_code(&self) -> u16 {
        OK
    }
}

crate::with_headers!(RetrieveAttributeResponse);

impl WithEntity for RetrieveAttributeResponse {
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

/// Reply to `deleteAttribute`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteAttributeResponse {
    thing_id: String,
    attribute: String,
    headers: Headers,
}

impl DeleteAttributeResponse {
    pub const TYPE: &'static str = "things.responses:deleteAttribute";

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
        let deserializer = TypeValidatingDeserializer::new(Self::TYPE, raw)?;
        let reader = deserializer.reader();
        deserializer.deserialize(|| {
            Ok(Self::new(
                reader.string(&THING_ID)?,
                reader.string(&ATTRIBUTE)?,
                headers.clone(),
            ))
        })
    }
}

impl Signal for DeleteAttributeResponse {
    crate::signal_basics!(Self::TYPE);

    fn append_payload(&self, writer: &mut JsonObjectWriter<'_>) -> Result<()> {
        writer
            .set(&THING_ID, self.thing_id.as_str())
            .set(&ATTRIBUTE, self.attribute.as_str());
        Ok(())
    }
}

impl CommandResponse for DeleteAttributeResponse {
    fn status_code(&self) -> u16 {
        NO_CONTENT
    }
}

crate::with_headers!(DeleteAttributeResponse);

/// Reply to `modifyPolicyId`; V2 only.
#[derive(Debug, Clone, PartialEq)]
pub struct ModifyPolicyIdResponse {
    thing_id: String,
    created: Option<String>,
    headers: Headers,
}

impl ModifyPolicyIdResponse {
    pub const TYPE: &'static str = "things.responses:modifyPolicyId";

    pub fn created(
        thing_id: impl Into<String>,
        policy_id: impl Into<String>,
        headers: Headers,
    ) -> Self {
        Self {
            thing_id: thing_id.into(),
            created: Some(policy_id.into()),
            headers,
        }
    }

    pub fn modified(thing_id: impl Into<String>, headers: Headers) -> Self {
        Self {
            thing_id: thing_id.into(),
            created: None,
            headers,
        }
    }

    pub fn thing_id(&self) -> &str {
        &self.thing_id
    }

    pub fn policy_id(&self) -> Option<&str> {
        self.created.as_deref()
    }

    pub fn from_json(raw: &JsonObject, headers: &Headers) -> Result<Self> {
        let deserializer = TypeValidatingDeserializer::new(Self::TYPE, raw)?;
        let reader = deserializer.reader();
        deserializer.deserialize(|| {
            let thing_id = reader.string(&THING_ID)?;
            Ok(match reader.optional_string(&POLICY_ID)? {
                Some(policy_id) => Self::created(thing_id, policy_id, headers.clone()),
                None => Self::modified(thing_id, headers.clone()),
            })
        })
    }
}

impl Signal for ModifyPolicyIdResponse {
    crate::signal_basics!(Self::TYPE);

    fn supported_schema_versions(&self) -> &'static [SchemaVersion] {
        &[SchemaVersion::V2]
    }

    fn append_payload(&self, writer: &mut JsonObjectWriter<'_>) -> Result<()> {
        writer
            .set(&THING_ID, self.thing_id.as_str())
            .set_optional(&POLICY_ID, self.created.as_deref());
        Ok(())
    }
}

impl CommandResponse for ModifyPolicyIdResponse {
    fn status_code(&self) -> u16 {
        if self.created.is_some() {
            CREATED
        } else {
            NO_CONTENT
        }
    }
}

crate::with_headers!(ModifyPolicyIdResponse);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use signals_model::{FieldPredicate, WithHeaders};

    #[test]
    fn modify_attribute_status_follows_outcome() {
        let created = ModifyAttributeResponse::created("x:y", "a", json!(1), Headers::empty());
        let modified = ModifyAttributeResponse::modified("x:y", "a", Headers::empty());
        assert_eq!(created.status_code(), 201);
        assert_eq!(modified.status_code(), 204);

        let json = modified.to_json().expect("json");
        assert_eq!(
            Value::Object(json.clone()),
            json!({
                "type": "things.responses:modifyAttribute",
                "status": 204,
                "thingId": "x:y",
                "attribute": "/a"
            })
        );
        let parsed = ModifyAttributeResponse::from_json(&json, &Headers::empty()).expect("parse");
        assert_eq!(parsed, modified);
    }

    #[test]
    fn create_thing_response_entity_must_be_an_object() {
        let mut thing = JsonObject::new();
        thing.insert("thingId".into(), json!("x:y"));
        let response = CreateThingResponse::new("x:y", thing, Headers::empty());
        assert_eq!(response.status_code(), 201);
        assert_eq!(
            response.entity(SchemaVersion::V1).expect("entity"),
            json!({"thingId": "x:y"})
        );
        assert!(matches!(
            response.set_entity(json!([1, 2])),
            Err(SignalError::InvalidFieldValue { .. })
        ));
        let replaced = response.set_entity(json!({"thingId": "x:z"})).expect("object");
        assert_eq!(replaced.thing().get("thingId"), Some(&json!("x:z")));
    }

    #[test]
    fn retrieve_attribute_response_keeps_null_values() {
        let response =
            RetrieveAttributeResponse::new("x:y", "/gone", Value::Null, Headers::empty());
        let json = response
            .to_json_with(SchemaVersion::V1, &FieldPredicate::all())
            .expect("json");
        assert_eq!(json.get("value"), Some(&Value::Null));
        let parsed = RetrieveAttributeResponse::from_json(&json, &Headers::empty()).expect("parse");
        assert_eq!(parsed.value(), &Value::Null);
    }

    #[test]
    fn modify_policy_id_response_is_v2_only() {
        let headers = Headers::builder().schema_version(SchemaVersion::V1).build();
        let response = ModifyPolicyIdResponse::created("x:y", "x:p", headers);
        assert!(matches!(
            response.to_json(),
            Err(SignalError::UnsupportedSchemaVersion { .. })
        ));
        let v2 = response.with_headers(Headers::empty());
        let json = v2.to_json().expect("v2");
        assert_eq!(json.get("status"), Some(&json!(201)));
        assert_eq!(json.get("policyId"), Some(&json!("x:p")));
    }

    #[test]
    fn delete_attribute_response_has_no_content() {
        let response = DeleteAttributeResponse::new("x:y", "a/b", Headers::empty());
        assert_eq!(response.status_code(), 204);
        assert_eq!(response.attribute(), "/a/b");
        assert_eq!(response.name(), "deleteAttribute");
    }
}
