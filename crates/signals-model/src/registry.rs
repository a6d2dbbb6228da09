//! ---
//! sig_section: "02-envelope-protocol"
//! sig_subsection: "module"
//! sig_type: "source"
//! sig_scope: "code"
//! sig_description: "Immutable type-tag registries reconstructing signals from JSON."
//! sig_version: "v0.0.0-prealpha"
//! sig_owner: "tbd"
//! ---
//! A registry is assembled once through [`TypeRegistryBuilder`] and frozen by
//! [`TypeRegistryBuilder::build`]. The frozen value has no mutating methods, so
//! it can be wrapped in an `Arc` and shared with any number of receiver threads.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{json_kind, Result, SignalError};
use crate::field::{FieldReader, JsonObject};
use crate::headers::Headers;
use crate::metrics::SignalMetrics;
use crate::schema_version::SchemaVersion;
use crate::signal::{json_fields, validate_type_tag, Command, CommandResponse};

/// Function reconstructing one signal type. It receives the registry it is
/// registered in so nested payloads can be parsed recursively.
pub type ParseStrategy<T> =
    Arc<dyn Fn(&JsonObject, &Headers, &TypeRegistry<T>) -> Result<T> + Send + Sync>;

/// Registry of command parse strategies.
pub type CommandRegistry = TypeRegistry<Box<dyn Command>>;
/// Registry of command response parse strategies.
pub type ResponseRegistry = TypeRegistry<Arc<dyn CommandResponse>>;

/// Output kinds a registry can produce.
pub trait RegisteredSignal: Send + Sync + 'static {
    fn registered_type(&self) -> &str;
    fn supports_schema_version(&self, version: SchemaVersion) -> bool;
}

impl RegisteredSignal for Box<dyn Command> {
    fn registered_type(&self) -> &str {
        self.type_tag()
    }

    fn supports_schema_version(&self, version: SchemaVersion) -> bool {
        self.implements_schema_version(version)
    }
}

impl RegisteredSignal for Arc<dyn CommandResponse> {
    fn registered_type(&self) -> &str {
        self.type_tag()
    }

    fn supports_schema_version(&self, version: SchemaVersion) -> bool {
        self.implements_schema_version(version)
    }
}

/// Strategy extracting the type tag from raw JSON.
#[derive(Clone)]
pub struct TypeResolver {
    label: &'static str,
    resolve: Arc<dyn Fn(&JsonObject) -> Result<String> + Send + Sync>,
}

impl TypeResolver {
    pub fn new<F>(label: &'static str, resolve: F) -> Self
    where
        F: Fn(&JsonObject) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            label,
            resolve: Arc::new(resolve),
        }
    }

    /// Read the tag from the envelope `type` field.
    pub fn type_field() -> Self {
        Self::new("type-field", |raw| {
            FieldReader::new(raw, "<unresolved>").string(&json_fields::TYPE)
        })
    }

    pub fn resolve(&self, raw: &JsonObject) -> Result<String> {
        (self.resolve)(raw)
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl Default for TypeResolver {
    fn default() -> Self {
        Self::type_field()
    }
}

impl fmt::Debug for TypeResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeResolver").field(&self.label).finish()
    }
}

/// Frozen mapping from type tag to parse strategy.
pub struct TypeRegistry<T> {
    kind: &'static str,
    strategies: HashMap<String, ParseStrategy<T>>,
    resolver: TypeResolver,
    metrics: Option<SignalMetrics>,
}

impl<T: RegisteredSignal> TypeRegistry<T> {
    /// Start building a registry. `kind` labels logs and metrics.
    pub fn builder(kind: &'static str) -> TypeRegistryBuilder<T> {
        TypeRegistryBuilder {
            kind,
            strategies: HashMap::new(),
            resolver: TypeResolver::default(),
            metrics: None,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn contains(&self, type_tag: &str) -> bool {
        self.strategies.contains_key(type_tag)
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Registered tags in lexical order.
    pub fn type_tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.strategies.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    pub fn resolve_type_tag(&self, raw: &JsonObject) -> Result<String> {
        self.resolver.resolve(raw)
    }

    /// Reconstruct a signal from raw JSON using the tag it declares.
    pub fn parse(&self, raw: &JsonObject, headers: &Headers) -> Result<T> {
        let outcome = self
            .resolve_type_tag(raw)
            .and_then(|tag| self.parse_registered(&tag, raw, headers));
        self.observe(outcome)
    }

    /// Reconstruct a signal of a tag already known to the caller.
    pub fn parse_as(&self, type_tag: &str, raw: &JsonObject, headers: &Headers) -> Result<T> {
        let outcome = self.parse_registered(type_tag, raw, headers);
        self.observe(outcome)
    }

    /// Parse JSON text and reconstruct the signal it describes.
    pub fn parse_str(&self, json: &str, headers: &Headers) -> Result<T> {
        let outcome = serde_json::from_str::<Value>(json)
            .map_err(SignalError::from)
            .and_then(|value| match value {
                Value::Object(raw) => Ok(raw),
                other => Err(SignalError::NotAnObject {
                    found: json_kind(&other),
                }),
            });
        match outcome {
            Ok(raw) => self.parse(&raw, headers),
            Err(err) => self.observe(Err(err)),
        }
    }

    /// Reconstruct a payload nested inside another signal. Outcomes are left
    /// for the outermost parse to count, so one wire message counts once.
    pub(crate) fn parse_nested(
        &self,
        type_tag: &str,
        raw: &JsonObject,
        headers: &Headers,
    ) -> Result<T> {
        self.parse_registered(type_tag, raw, headers)
    }

    fn parse_registered(&self, type_tag: &str, raw: &JsonObject, headers: &Headers) -> Result<T> {
        let strategy = self
            .strategies
            .get(type_tag)
            .ok_or_else(|| SignalError::UnknownType {
                tag: type_tag.to_owned(),
            })?;
        let parsed = strategy(raw, headers, self)?;
        if let Some(version) = headers.schema_version() {
            if !parsed.supports_schema_version(version) {
                return Err(SignalError::UnsupportedSchemaVersion {
                    type_tag: type_tag.to_owned(),
                    version,
                });
            }
        }
        debug!(registry = self.kind, type_tag, "signal parsed");
        Ok(parsed)
    }

    fn observe(&self, outcome: Result<T>) -> Result<T> {
        match &outcome {
            Ok(_) => {
                if let Some(metrics) = &self.metrics {
                    metrics.observe_parsed(self.kind);
                }
            }
            Err(err) => {
                warn!(registry = self.kind, reason = err.reason(), error = %err, "signal rejected");
                if let Some(metrics) = &self.metrics {
                    metrics.observe_rejected(self.kind, err.reason());
                }
            }
        }
        outcome
    }
}

impl<T> fmt::Debug for TypeRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<&String> = self.strategies.keys().collect();
        tags.sort_unstable();
        f.debug_struct("TypeRegistry")
            .field("kind", &self.kind)
            .field("resolver", &self.resolver)
            .field("types", &tags)
            .finish()
    }
}

/// Mutable assembly phase of a [`TypeRegistry`].
pub struct TypeRegistryBuilder<T> {
    kind: &'static str,
    strategies: HashMap<String, ParseStrategy<T>>,
    resolver: TypeResolver,
    metrics: Option<SignalMetrics>,
}

impl<T: RegisteredSignal> TypeRegistryBuilder<T> {
    /// Register a strategy that only needs the raw JSON and headers.
    pub fn register<F>(self, type_tag: &str, strategy: F) -> Result<Self>
    where
        F: Fn(&JsonObject, &Headers) -> Result<T> + Send + Sync + 'static,
    {
        self.register_nested(type_tag, move |raw, headers, _registry| {
            strategy(raw, headers)
        })
    }

    /// Register a strategy that parses nested signals through the registry.
    pub fn register_nested<F>(mut self, type_tag: &str, strategy: F) -> Result<Self>
    where
        F: Fn(&JsonObject, &Headers, &TypeRegistry<T>) -> Result<T> + Send + Sync + 'static,
    {
        validate_type_tag(type_tag)?;
        if self.strategies.contains_key(type_tag) {
            return Err(SignalError::DuplicateRegistration {
                tag: type_tag.to_owned(),
            });
        }
        self.strategies.insert(type_tag.to_owned(), Arc::new(strategy));
        Ok(self)
    }

    /// Replace the default `type`-field resolver.
    pub fn resolver(mut self, resolver: TypeResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Count parse outcomes on the given metric handles.
    pub fn metrics(mut self, metrics: SignalMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Freeze the registry.
    pub fn build(self) -> TypeRegistry<T> {
        info!(
            registry = self.kind,
            types = self.strategies.len(),
            resolver = self.resolver.label(),
            "type registry built"
        );
        TypeRegistry {
            kind: self.kind,
            strategies: self.strategies,
            resolver: self.resolver,
            metrics: self.metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deserializer::TypeValidatingDeserializer;
    use crate::field::{FieldDefinition, JsonObjectWriter};
    use crate::signal::{Category, Signal};
    use serde_json::json;
    use std::any::Any;

    const ECHO: &str = "test.commands:echo";
    const LEGACY: &str = "test.commands:legacy";
    const TEXT: FieldDefinition = FieldDefinition::regular("text", SchemaVersion::ALL);

    #[derive(Debug, PartialEq)]
    struct Echo {
        tag: &'static str,
        text: String,
        headers: Headers,
    }

    impl Signal for Echo {
        fn type_tag(&self) -> &str {
            self.tag
        }
        fn headers(&self) -> &Headers {
            &self.headers
        }
        fn supported_schema_versions(&self) -> &'static [SchemaVersion] {
            if self.tag == LEGACY {
                &[SchemaVersion::V1]
            } else {
                SchemaVersion::ALL
            }
        }
        fn append_payload(&self, writer: &mut JsonObjectWriter<'_>) -> Result<()> {
            writer.set(&TEXT, self.text.as_str());
            Ok(())
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    impl Command for Echo {
        fn category(&self) -> Category {
            Category::Query
        }
    }

    fn strategy(tag: &'static str) -> impl Fn(&JsonObject, &Headers) -> Result<Box<dyn Command>> {
        move |raw, headers| {
            let deserializer = TypeValidatingDeserializer::new(tag, raw)?;
            deserializer.deserialize(|| {
                Ok(Box::new(Echo {
                    tag,
                    text: deserializer.reader().string(&TEXT)?,
                    headers: headers.clone(),
                }) as Box<dyn Command>)
            })
        }
    }

    fn registry() -> CommandRegistry {
        TypeRegistry::builder("commands")
            .register(ECHO, strategy(ECHO))
            .and_then(|b| b.register(LEGACY, strategy(LEGACY)))
            .expect("valid registrations")
            .build()
    }

    fn object(value: Value) -> JsonObject {
        value.as_object().cloned().expect("object literal")
    }

    #[test]
    fn parse_dispatches_on_type_field() {
        let raw = object(json!({"type": ECHO, "text": "hello"}));
        let parsed = registry().parse(&raw, &Headers::empty()).expect("parse");
        let echo = parsed.as_any().downcast_ref::<Echo>().expect("echo");
        assert_eq!(echo.text, "hello");
        assert_eq!(parsed.name(), "echo");
    }

    #[test]
    fn unknown_type_is_surfaced() {
        let raw = object(json!({"type": "test.commands:nope"}));
        let err = registry().parse(&raw, &Headers::empty()).unwrap_err();
        assert!(matches!(err, SignalError::UnknownType { ref tag } if tag == "test.commands:nope"));
    }

    #[test]
    fn missing_type_field_is_reported() {
        let err = registry()
            .parse(&object(json!({"text": "x"})), &Headers::empty())
            .unwrap_err();
        assert!(matches!(err, SignalError::MissingRequiredField { .. }));
    }

    #[test]
    fn header_version_outside_supported_set_is_rejected() {
        let raw = object(json!({"type": LEGACY, "text": "old"}));
        let v2 = Headers::builder().schema_version(SchemaVersion::V2).build();
        let err = registry().parse(&raw, &v2).unwrap_err();
        assert!(matches!(err, SignalError::UnsupportedSchemaVersion { .. }));
        let v1 = Headers::builder().schema_version(SchemaVersion::V1).build();
        assert!(registry().parse(&raw, &v1).is_ok());
    }

    #[test]
    fn malformed_and_duplicate_registrations_fail_at_build_time() {
        let malformed = TypeRegistry::<Box<dyn Command>>::builder("commands")
            .register("echo", strategy(ECHO));
        assert!(matches!(malformed, Err(SignalError::MalformedTypeTag { .. })));

        let duplicate = TypeRegistry::<Box<dyn Command>>::builder("commands")
            .register(ECHO, strategy(ECHO))
            .and_then(|b| b.register(ECHO, strategy(ECHO)));
        assert!(matches!(
            duplicate,
            Err(SignalError::DuplicateRegistration { .. })
        ));
    }

    #[test]
    fn custom_resolver_is_used() {
        let registry = TypeRegistry::builder("commands")
            .register(ECHO, strategy(ECHO))
            .expect("register")
            .resolver(TypeResolver::new("fixed", |_| Ok(ECHO.to_owned())))
            .build();
        let raw = object(json!({"type": ECHO, "text": "resolved"}));
        assert!(registry.parse(&raw, &Headers::empty()).is_ok());
        assert_eq!(registry.type_tags(), vec![ECHO]);
    }

    #[test]
    fn parse_str_rejects_non_objects() {
        let err = registry().parse_str("[1, 2]", &Headers::empty()).unwrap_err();
        assert!(matches!(err, SignalError::NotAnObject { found: "array" }));
        let ok = registry()
            .parse_str(r#"{"type":"test.commands:echo","text":"t"}"#, &Headers::empty())
            .expect("parse text");
        assert_eq!(ok.type_tag(), ECHO);
    }

    #[test]
    fn metrics_count_outcomes() {
        let prom = prometheus::Registry::new();
        let metrics = SignalMetrics::register(&prom).expect("metrics");
        let registry = TypeRegistry::builder("commands")
            .register(ECHO, strategy(ECHO))
            .expect("register")
            .metrics(metrics)
            .build();
        let _ = registry.parse(&object(json!({"type": ECHO, "text": "a"})), &Headers::empty());
        let _ = registry.parse(&object(json!({"type": "x:y"})), &Headers::empty());
        let families = prom.gather();
        let rejected = families
            .iter()
            .find(|f| f.get_name() == "signals_rejected_total")
            .expect("rejected family");
        assert_eq!(rejected.get_metric().len(), 1);
    }

    #[test]
    fn frozen_registry_is_shareable_across_threads() {
        let registry = Arc::new(registry());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    let raw = object(json!({"type": ECHO, "text": format!("t{i}")}));
                    registry.parse(&raw, &Headers::empty()).map(|c| c.type_tag().to_owned())
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().expect("thread").expect("parse"), ECHO);
        }
    }
}
