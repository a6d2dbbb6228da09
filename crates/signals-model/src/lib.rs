//! ---
//! sig_section: "02-envelope-protocol"
//! sig_subsection: "module"
//! sig_type: "source"
//! sig_scope: "code"
//! sig_description: "Typed envelope contract, registries and response aggregation."
//! sig_version: "v0.0.0-prealpha"
//! sig_owner: "tbd"
//! ---
//! Envelope protocol shared by every service instance.
//!
//! Signals are either commands or command responses. Each carries a namespaced
//! type tag, immutable [`Headers`] and a payload whose fields are emitted
//! according to the negotiated [`SchemaVersion`]. Receivers rebuild signals
//! through a [`TypeRegistry`]; replies gathered from several instances are
//! combined with [`AggregatedResponse`].

pub mod aggregate;
pub mod deserializer;
pub mod error;
pub mod field;
pub mod headers;
pub mod metrics;
pub mod registry;
pub mod schema_version;
pub mod signal;

pub use aggregate::{AggregateEntry, AggregatedResponse, AGGREGATED_RESPONSE_TYPE};
pub use deserializer::TypeValidatingDeserializer;
pub use error::{Result, SignalError};
pub use field::{
    FieldDefinition, FieldMarker, FieldPredicate, FieldReader, JsonObject, JsonObjectWriter,
};
pub use headers::{Headers, HeadersBuilder};
pub use metrics::SignalMetrics;
pub use registry::{
    CommandRegistry, ParseStrategy, RegisteredSignal, ResponseRegistry, TypeRegistry,
    TypeRegistryBuilder, TypeResolver,
};
pub use schema_version::SchemaVersion;
pub use signal::{
    name_of, validate_type_tag, Category, Command, CommandResponse, Signal, WithEntity,
    WithHeaders,
};
