//! ---
//! sig_section: "02-envelope-protocol"
//! sig_subsection: "module"
//! sig_type: "source"
//! sig_scope: "code"
//! sig_description: "Composite response nesting replies by service name and instance."
//! sig_version: "v0.0.0-prealpha"
//! sig_owner: "tbd"
//! ---
//! Replies collected from several service instances are folded into one
//! response whose `responses` object is keyed first by service name and then
//! by instance:
//!
//! ```text
//! {"A": {"0": R1, "1": R2}, "empty": {"-1": R3}}
//! ```
//!
//! Entries keep their insertion order. Two entries that map to the same
//! `(service, instance)` key are both retained, but when flattened to JSON the
//! later entry overwrites the earlier one.

use std::any::Any;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::deserializer::TypeValidatingDeserializer;
use crate::error::{Result, SignalError};
use crate::field::{FieldDefinition, FieldPredicate, JsonObject, JsonObjectWriter};
use crate::headers::Headers;
use crate::registry::{ResponseRegistry, TypeRegistryBuilder};
use crate::schema_version::SchemaVersion;
use crate::signal::{
    json_fields, validate_type_tag, CommandResponse, Signal, WithEntity, WithHeaders,
};

/// Type tag of the composite response.
pub const AGGREGATED_RESPONSE_TYPE: &str = "devops.responses:aggregatedResponse";
/// Outer key used for entries without a service name.
pub const EMPTY_SERVICE_KEY: &str = "empty";
/// Inner key used for entries without an instance.
pub const EMPTY_INSTANCE_KEY: &str = "-1";

pub mod fields {
    use crate::field::FieldDefinition;
    use crate::schema_version::SchemaVersion;

    pub const RESPONSES_TYPE: FieldDefinition =
        FieldDefinition::regular("responsesType", SchemaVersion::ALL);
    pub const RESPONSES: FieldDefinition =
        FieldDefinition::regular("responses", SchemaVersion::ALL);
}

/// One collected reply and the instance it came from.
#[derive(Debug, Clone)]
pub struct AggregateEntry {
    service_name: Option<String>,
    instance: Option<i32>,
    response: Arc<dyn CommandResponse>,
}

impl AggregateEntry {
    pub fn new(
        service_name: Option<String>,
        instance: Option<i32>,
        response: Arc<dyn CommandResponse>,
    ) -> Self {
        Self {
            service_name,
            instance,
            response,
        }
    }

    pub fn service_name(&self) -> Option<&str> {
        self.service_name.as_deref()
    }

    pub fn instance(&self) -> Option<i32> {
        self.instance
    }

    pub fn response(&self) -> &Arc<dyn CommandResponse> {
        &self.response
    }

    /// Outer JSON key: the service name or `"empty"`.
    pub fn service_key(&self) -> &str {
        self.service_name.as_deref().unwrap_or(EMPTY_SERVICE_KEY)
    }

    /// Inner JSON key: the instance or `"-1"`.
    pub fn instance_key(&self) -> String {
        self.instance
            .map(|instance| instance.to_string())
            .unwrap_or_else(|| EMPTY_INSTANCE_KEY.to_owned())
    }
}

/// Composite response over replies of a single `responses_type`.
#[derive(Debug, Clone)]
pub struct AggregatedResponse {
    responses_type: String,
    entries: Arc<[AggregateEntry]>,
    status: u16,
    headers: Headers,
}

impl AggregatedResponse {
    /// Freeze `entries` into a composite. Status defaults to 200.
    pub fn new(
        entries: impl IntoIterator<Item = AggregateEntry>,
        responses_type: impl Into<String>,
        headers: Headers,
    ) -> Result<Self> {
        let responses_type = responses_type.into();
        validate_type_tag(&responses_type)?;
        let entries: Arc<[AggregateEntry]> = entries.into_iter().collect();
        debug!(
            responses_type = %responses_type,
            entries = entries.len(),
            "aggregated response built"
        );
        Ok(Self {
            responses_type,
            entries,
            status: 200,
            headers,
        })
    }

    pub fn with_status_code(&self, status: u16) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    pub fn responses_type(&self) -> &str {
        &self.responses_type
    }

    pub fn entries(&self) -> &[AggregateEntry] {
        &self.entries
    }

    /// Nested `{service: {instance: json}}` object; later key collisions win.
    pub fn responses_json(
        &self,
        version: SchemaVersion,
        predicate: &FieldPredicate,
    ) -> Result<JsonObject> {
        let mut services = JsonObject::new();
        for entry in self.entries.iter() {
            let inner = entry.response.to_json_with(version, predicate)?;
            let instances = services
                .entry(entry.service_key().to_owned())
                .or_insert_with(|| Value::Object(JsonObject::new()));
            if let Value::Object(instances) = instances {
                instances.insert(entry.instance_key(), Value::Object(inner));
            }
        }
        Ok(services)
    }

    /// Rebuild a composite, parsing every leaf as `responsesType` through
    /// `registry`.
    pub fn from_json(
        raw: &JsonObject,
        headers: &Headers,
        registry: &ResponseRegistry,
    ) -> Result<Self> {
        let deserializer = TypeValidatingDeserializer::new(AGGREGATED_RESPONSE_TYPE, raw)?;
        deserializer.deserialize(|| {
            let reader = deserializer.reader();
            let responses_type = reader.string(&fields::RESPONSES_TYPE)?;
            let status = reader.i64(&json_fields::STATUS)?;
            let status = u16::try_from(status)
                .map_err(|_| invalid(&json_fields::STATUS, "status code"))?;

            let mut entries = Vec::new();
            for (service_key, instances) in reader.object(&fields::RESPONSES)? {
                let instances = instances
                    .as_object()
                    .ok_or_else(|| invalid(&fields::RESPONSES, "object of instances"))?;
                for (instance_key, leaf) in instances {
                    let leaf = leaf
                        .as_object()
                        .ok_or_else(|| invalid(&fields::RESPONSES, "response object"))?;
                    let response = registry.parse_nested(&responses_type, leaf, headers)?;
                    entries.push(AggregateEntry::new(
                        service_from_key(service_key),
                        instance_from_key(instance_key)?,
                        response,
                    ));
                }
            }

            Ok(Self::new(entries, responses_type, headers.clone())?.with_status_code(status))
        })
    }
}

fn invalid(field: &FieldDefinition, expected: &'static str) -> SignalError {
    SignalError::InvalidFieldValue {
        field: field.key().to_owned(),
        type_tag: AGGREGATED_RESPONSE_TYPE.to_owned(),
        expected,
    }
}

fn service_from_key(key: &str) -> Option<String> {
    (key != EMPTY_SERVICE_KEY).then(|| key.to_owned())
}

fn instance_from_key(key: &str) -> Result<Option<i32>> {
    if key == EMPTY_INSTANCE_KEY {
        return Ok(None);
    }
    key.parse::<i32>()
        .map(Some)
        .map_err(|_| invalid(&fields::RESPONSES, "integer instance key"))
}

impl Signal for AggregatedResponse {
    fn type_tag(&self) -> &str {
        AGGREGATED_RESPONSE_TYPE
    }

    fn headers(&self) -> &Headers {
        &self.headers
    }

    fn append_payload(&self, writer: &mut JsonObjectWriter<'_>) -> Result<()> {
        let responses = self.responses_json(writer.version(), writer.predicate())?;
        writer
            .set(&fields::RESPONSES_TYPE, self.responses_type.as_str())
            .set(&fields::RESPONSES, responses);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl CommandResponse for AggregatedResponse {
    fn status_code(&self) -> u16 {
        self.status
    }
}

impl WithHeaders for AggregatedResponse {
    fn with_headers(&self, headers: Headers) -> Self {
        Self {
            headers,
            ..self.clone()
        }
    }
}

impl WithEntity for AggregatedResponse {
    /// The entity of a composite is its nested responses object.
    fn entity(&self, version: SchemaVersion) -> Result<Value> {
        self.responses_json(version, &FieldPredicate::default())
            .map(Value::Object)
    }

    fn set_entity(&self, _entity: Value) -> Result<Self> {
        Err(SignalError::UnsupportedMutation {
            type_tag: AGGREGATED_RESPONSE_TYPE.to_owned(),
            operation: "set_entity",
        })
    }
}

impl TypeRegistryBuilder<Arc<dyn CommandResponse>> {
    /// Register the composite response, parsing its leaves through the
    /// registry being built.
    pub fn register_aggregated(self) -> Result<Self> {
        self.register_nested(AGGREGATED_RESPONSE_TYPE, |raw, headers, registry| {
            let aggregated = AggregatedResponse::from_json(raw, headers, registry)?;
            Ok(Arc::new(aggregated) as Arc<dyn CommandResponse>)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeRegistry;
    use serde_json::json;

    const GAUGE: &str = "test.responses:gauge";
    const VALUE: FieldDefinition = FieldDefinition::regular("value", SchemaVersion::ALL);

    #[derive(Debug)]
    struct Probe {
        value: i64,
        headers: Headers,
    }

    impl Signal for Probe {
        fn type_tag(&self) -> &str {
            GAUGE
        }
        fn headers(&self) -> &Headers {
            &self.headers
        }
        fn append_payload(&self, writer: &mut JsonObjectWriter<'_>) -> Result<()> {
            writer.set(&VALUE, self.value);
            Ok(())
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    impl CommandResponse for Probe {
        fn status_code(&self) -> u16 {
            200
        }
    }

    fn gauge(value: i64) -> Arc<dyn CommandResponse> {
        Arc::new(Probe {
            value,
            headers: Headers::empty(),
        })
    }

    fn entry(service: Option<&str>, instance: Option<i32>, value: i64) -> AggregateEntry {
        AggregateEntry::new(service.map(str::to_owned), instance, gauge(value))
    }

    fn registry() -> ResponseRegistry {
        TypeRegistry::builder("responses")
            .register(GAUGE, |raw, headers| {
                let deserializer = TypeValidatingDeserializer::new(GAUGE, raw)?;
                deserializer.deserialize(|| {
                    Ok(Arc::new(Probe {
                        value: deserializer.reader().i64(&VALUE)?,
                        headers: headers.clone(),
                    }) as Arc<dyn CommandResponse>)
                })
            })
            .and_then(|builder| builder.register_aggregated())
            .expect("registrations")
            .build()
    }

    fn leaf(value: i64) -> Value {
        json!({"type": GAUGE, "status": 200, "value": value})
    }

    #[test]
    fn nests_by_service_and_instance_with_fallback_keys() {
        let aggregated = AggregatedResponse::new(
            vec![
                entry(Some("A"), Some(0), 1),
                entry(Some("A"), Some(1), 2),
                entry(None, None, 3),
            ],
            GAUGE,
            Headers::empty(),
        )
        .expect("aggregate");
        let json = aggregated.to_json().expect("serialize");
        assert_eq!(
            Value::Object(json),
            json!({
                "type": AGGREGATED_RESPONSE_TYPE,
                "status": 200,
                "responsesType": GAUGE,
                "responses": {
                    "A": {"0": leaf(1), "1": leaf(2)},
                    "empty": {"-1": leaf(3)}
                }
            })
        );
    }

    #[test]
    fn colliding_keys_keep_the_last_entry() {
        let aggregated = AggregatedResponse::new(
            vec![entry(Some("A"), Some(0), 1), entry(Some("A"), Some(0), 2)],
            GAUGE,
            Headers::empty(),
        )
        .expect("aggregate");
        assert_eq!(aggregated.entries().len(), 2);
        let responses = aggregated
            .responses_json(SchemaVersion::V2, &FieldPredicate::all())
            .expect("serialize");
        assert_eq!(Value::Object(responses), json!({"A": {"0": leaf(2)}}));
    }

    #[test]
    fn round_trips_through_the_registry() {
        let aggregated = AggregatedResponse::new(
            vec![entry(Some("gateway"), Some(3), 7), entry(None, None, 8)],
            GAUGE,
            Headers::empty(),
        )
        .expect("aggregate")
        .with_status_code(207);
        let json = aggregated.to_json().expect("serialize");

        let parsed = registry().parse(&json, &Headers::empty()).expect("parse");
        assert_eq!(parsed.status_code(), 207);
        let back = parsed
            .as_any()
            .downcast_ref::<AggregatedResponse>()
            .expect("aggregated");
        assert_eq!(back.responses_type(), GAUGE);
        assert_eq!(back.entries()[0].service_name(), Some("gateway"));
        assert_eq!(back.entries()[0].instance(), Some(3));
        assert_eq!(back.entries()[1].service_name(), None);
        assert_eq!(back.entries()[1].instance(), None);
        assert_eq!(parsed.to_json().expect("serialize"), json);
    }

    #[test]
    fn non_numeric_instance_key_is_invalid() {
        let raw = json!({
            "type": AGGREGATED_RESPONSE_TYPE,
            "status": 200,
            "responsesType": GAUGE,
            "responses": {"A": {"zero": leaf(1)}}
        });
        let err = registry()
            .parse(raw.as_object().expect("object"), &Headers::empty())
            .unwrap_err();
        assert!(matches!(err, SignalError::InvalidFieldValue { .. }));
    }

    #[test]
    fn unregistered_responses_type_is_unknown() {
        let raw = json!({
            "type": AGGREGATED_RESPONSE_TYPE,
            "status": 200,
            "responsesType": "test.responses:other",
            "responses": {"A": {"0": {"type": "test.responses:other", "status": 200}}}
        });
        let err = registry()
            .parse(raw.as_object().expect("object"), &Headers::empty())
            .unwrap_err();
        assert!(matches!(err, SignalError::UnknownType { .. }));
    }

    #[test]
    fn set_entity_is_unsupported() {
        let aggregated =
            AggregatedResponse::new(Vec::new(), GAUGE, Headers::empty()).expect("aggregate");
        let err = aggregated.set_entity(json!({"x": 1})).unwrap_err();
        assert!(matches!(err, SignalError::UnsupportedMutation { operation: "set_entity", .. }));
        assert_eq!(
            aggregated.entity(SchemaVersion::V2).expect("entity"),
            json!({})
        );
    }

    #[test]
    fn with_headers_returns_a_new_value() {
        let original =
            AggregatedResponse::new(vec![entry(Some("A"), Some(0), 1)], GAUGE, Headers::empty())
                .expect("aggregate");
        let headers = Headers::builder().correlation_id("c-9").build();
        let updated = original.with_headers(headers.clone());
        assert_eq!(original.headers(), &Headers::empty());
        assert_eq!(updated.headers(), &headers);
        assert!(Arc::ptr_eq(&original.entries, &updated.entries));
    }

    #[test]
    fn malformed_responses_type_is_rejected() {
        assert!(matches!(
            AggregatedResponse::new(Vec::new(), "gauge", Headers::empty()),
            Err(SignalError::MalformedTypeTag { .. })
        ));
    }
}
