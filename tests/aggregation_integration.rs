//! ---
//! sig_section: "05-testing-qa"
//! sig_subsection: "integration-tests"
//! sig_type: "source"
//! sig_scope: "code"
//! sig_description: "Aggregated response nesting, collisions and registry round trips."
//! sig_version: "v0.0.0-prealpha"
//! sig_owner: "tbd"
//! ---
use std::sync::Arc;

use serde_json::{json, Value};
use signals_model::{
    AggregateEntry, AggregatedResponse, CommandResponse, FieldPredicate, Headers, SchemaVersion,
    Signal, SignalError, WithEntity, WithHeaders,
};
use signals_payloads::devops::LoggerConfig;
use signals_payloads::things::DeleteAttributeResponse;
use signals_payloads::{RetrieveLoggerConfigResponse, SignalRegistries};

fn logger_reply(
    service: Option<&str>,
    instance: Option<i32>,
    level: &str,
) -> RetrieveLoggerConfigResponse {
    RetrieveLoggerConfigResponse::new(
        service.map(str::to_owned),
        instance,
        vec![LoggerConfig::new("root", level)],
        Headers::empty(),
    )
}

fn leaf(reply: &RetrieveLoggerConfigResponse) -> Value {
    Value::Object(
        reply
            .to_json_with(SchemaVersion::V2, &FieldPredicate::default())
            .expect("leaf json"),
    )
}

#[test]
fn responses_nest_by_service_then_instance() {
    let r1 = logger_reply(Some("A"), Some(0), "INFO");
    let r2 = logger_reply(Some("A"), Some(1), "DEBUG");
    let r3 = logger_reply(None, None, "WARN");
    let aggregated = AggregatedResponse::new(
        [r1.clone().into_entry(), r2.clone().into_entry(), r3.clone().into_entry()],
        RetrieveLoggerConfigResponse::TYPE,
        Headers::empty(),
    )
    .expect("aggregate");

    let json = aggregated.to_json().expect("json");
    assert_eq!(
        json.keys().collect::<Vec<_>>(),
        vec!["type", "status", "responsesType", "responses"]
    );
    assert_eq!(
        json.get("responses"),
        Some(&json!({
            "A": {"0": leaf(&r1), "1": leaf(&r2)},
            "empty": {"-1": leaf(&r3)}
        }))
    );
}

#[test]
fn colliding_origins_keep_the_last_reply() {
    let first = logger_reply(Some("A"), Some(0), "INFO");
    let second = logger_reply(Some("A"), Some(0), "TRACE");
    let aggregated = AggregatedResponse::new(
        [first.into_entry(), second.clone().into_entry()],
        RetrieveLoggerConfigResponse::TYPE,
        Headers::empty(),
    )
    .expect("aggregate");
    assert_eq!(aggregated.entries().len(), 2);
    let responses = aggregated
        .responses_json(SchemaVersion::V2, &FieldPredicate::default())
        .expect("responses");
    assert_eq!(Value::Object(responses), json!({"A": {"0": leaf(&second)}}));
}

#[test]
fn aggregated_responses_round_trip_through_the_registry() {
    let registries = SignalRegistries::build().expect("registries");
    let aggregated = AggregatedResponse::new(
        [
            logger_reply(Some("gateway"), Some(0), "INFO").into_entry(),
            logger_reply(Some("gateway"), None, "WARN").into_entry(),
        ],
        RetrieveLoggerConfigResponse::TYPE,
        Headers::empty(),
    )
    .expect("aggregate")
    .with_status_code(207);

    let json = aggregated.to_json().expect("json");
    let parsed = registries
        .responses
        .parse(&json, &Headers::empty())
        .expect("parse");
    assert_eq!(parsed.status_code(), 207);
    let concrete = parsed
        .as_any()
        .downcast_ref::<AggregatedResponse>()
        .expect("aggregate");
    assert_eq!(concrete.entries().len(), 2);
    let instances: Vec<Option<i32>> = concrete
        .entries()
        .iter()
        .map(AggregateEntry::instance)
        .collect();
    assert_eq!(instances, vec![Some(0), None]);
    let inner = concrete.entries()[0]
        .response()
        .as_any()
        .downcast_ref::<RetrieveLoggerConfigResponse>()
        .expect("logger reply");
    assert_eq!(inner.logger_configs(), &[LoggerConfig::new("root", "INFO")]);
}

#[test]
fn unknown_inner_types_fail_the_whole_aggregate() {
    let registries = SignalRegistries::build().expect("registries");
    let raw = json!({
        "type": "devops.responses:aggregatedResponse",
        "status": 200,
        "responsesType": "devops.responses:unknown",
        "responses": {"A": {"0": {"type": "devops.responses:unknown", "status": 200}}}
    });
    let err = registries
        .responses
        .parse_str(&raw.to_string(), &Headers::empty())
        .unwrap_err();
    assert!(matches!(err, SignalError::UnknownType { .. }));
}

#[test]
fn entity_is_the_nested_object_and_cannot_be_replaced() {
    let reply = DeleteAttributeResponse::new("x:y", "a", Headers::empty());
    let aggregated = AggregatedResponse::new(
        [AggregateEntry::new(Some("things".into()), Some(2), Arc::new(reply.clone()))],
        DeleteAttributeResponse::TYPE,
        Headers::empty(),
    )
    .expect("aggregate");

    let entity = aggregated.entity(SchemaVersion::V2).expect("entity");
    assert_eq!(
        entity["things"]["2"],
        Value::Object(reply.to_json().expect("reply json"))
    );
    assert!(matches!(
        aggregated.set_entity(json!({})),
        Err(SignalError::UnsupportedMutation { .. })
    ));

    let retagged = aggregated.with_headers(Headers::builder().correlation_id("agg-1").build());
    assert_eq!(retagged.headers().correlation_id(), Some("agg-1"));
    assert!(aggregated.headers().is_empty());
    assert_eq!(retagged.entries().len(), aggregated.entries().len());
}
