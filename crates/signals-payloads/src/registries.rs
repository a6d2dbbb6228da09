//! ---
//! sig_section: "03-payload-schemas"
//! sig_subsection: "module"
//! sig_type: "source"
//! sig_scope: "code"
//! sig_description: "Registry builders for every known command and response."
//! sig_version: "v0.0.0-prealpha"
//! sig_owner: "tbd"
//! ---
use std::sync::Arc;

use signals_model::{
    Command, CommandRegistry, CommandResponse, FieldPredicate, Headers, JsonObject,
    ResponseRegistry, Result, SchemaVersion, SignalMetrics,
};
use tracing::debug;

use crate::devops::{RetrieveLoggerConfig, RetrieveLoggerConfigResponse};
use crate::things::{
    CreateThing, CreateThingResponse, DeleteAttribute, DeleteAttributeResponse, ModifyAttribute,
    ModifyAttributeResponse, ModifyPolicyId, ModifyPolicyIdResponse, RetrieveAttribute,
    RetrieveAttributeResponse,
};

type Parse<S> = fn(&JsonObject, &Headers) -> Result<S>;

fn command<C: Command>(
    parse: Parse<C>,
) -> impl Fn(&JsonObject, &Headers) -> Result<Box<dyn Command>> {
    move |raw, headers| Ok(Box::new(parse(raw, headers)?) as Box<dyn Command>)
}

fn response<R: CommandResponse>(
    parse: Parse<R>,
) -> impl Fn(&JsonObject, &Headers) -> Result<Arc<dyn CommandResponse>> {
    move |raw, headers| Ok(Arc::new(parse(raw, headers)?) as Arc<dyn CommandResponse>)
}

/// Registry over every command this crate defines.
pub fn build_command_registry(metrics: Option<SignalMetrics>) -> Result<CommandRegistry> {
    let mut builder = CommandRegistry::builder("commands")
        .register(CreateThing::TYPE, command(CreateThing::from_json))?
        .register(ModifyAttribute::TYPE, command(ModifyAttribute::from_json))?
        .register(RetrieveAttribute::TYPE, command(RetrieveAttribute::from_json))?
        .register(DeleteAttribute::TYPE, command(DeleteAttribute::from_json))?
        .register(ModifyPolicyId::TYPE, command(ModifyPolicyId::from_json))?
        .register(RetrieveLoggerConfig::TYPE, command(RetrieveLoggerConfig::from_json))?;
    if let Some(metrics) = metrics {
        builder = builder.metrics(metrics);
    }
    Ok(builder.build())
}

/// Registry over every response this crate defines, including aggregated
/// responses whose leaves resolve through the same registry.
pub fn build_response_registry(metrics: Option<SignalMetrics>) -> Result<ResponseRegistry> {
    let mut builder = ResponseRegistry::builder("responses")
        .register(CreateThingResponse::TYPE, response(CreateThingResponse::from_json))?
        .register(ModifyAttributeResponse::TYPE, response(ModifyAttributeResponse::from_json))?
        .register(
            RetrieveAttributeResponse::TYPE,
            response(RetrieveAttributeResponse::from_json),
        )?
        .register(DeleteAttributeResponse::TYPE, response(DeleteAttributeResponse::from_json))?
        .register(ModifyPolicyIdResponse::TYPE, response(ModifyPolicyIdResponse::from_json))?
        .register(
            RetrieveLoggerConfigResponse::TYPE,
            response(RetrieveLoggerConfigResponse::from_json),
        )?
        .register_aggregated()?;
    if let Some(metrics) = metrics {
        builder = builder.metrics(metrics);
    }
    Ok(builder.build())
}

/// Frozen command and response registries, cheap to clone across threads.
#[derive(Debug, Clone)]
pub struct SignalRegistries {
    pub commands: Arc<CommandRegistry>,
    pub responses: Arc<ResponseRegistry>,
    metrics: Option<SignalMetrics>,
}

impl SignalRegistries {
    pub fn build() -> Result<Self> {
        Self::build_with(None)
    }

    /// Build both registries counting parse outcomes on `metrics`.
    pub fn with_metrics(metrics: &SignalMetrics) -> Result<Self> {
        Self::build_with(Some(metrics))
    }

    fn build_with(metrics: Option<&SignalMetrics>) -> Result<Self> {
        let commands = build_command_registry(metrics.cloned())?;
        let responses = build_response_registry(metrics.cloned())?;
        debug!(
            commands = commands.len(),
            responses = responses.len(),
            "signal registries ready"
        );
        Ok(Self {
            commands: Arc::new(commands),
            responses: Arc::new(responses),
            metrics: metrics.cloned(),
        })
    }

    /// Serialize a parsed signal, counting it on the attached metrics.
    pub fn emit(
        &self,
        signal: &ParsedSignal,
        version: SchemaVersion,
        predicate: &FieldPredicate,
    ) -> Result<JsonObject> {
        let json = signal.to_json_with(version, predicate)?;
        if let Some(metrics) = &self.metrics {
            metrics.observe_serialized();
        }
        Ok(json)
    }

    /// Parse `raw` through whichever registry knows its tag. Tags neither
    /// registry knows go to the one their namespace names; input without a
    /// tag is rejected by the command registry.
    pub fn parse_any(&self, raw: &JsonObject, headers: &Headers) -> Result<ParsedSignal> {
        let as_response = match self.commands.resolve_type_tag(raw) {
            Ok(tag) if self.commands.contains(&tag) => false,
            Ok(tag) => self.responses.contains(&tag) || in_response_namespace(&tag),
            Err(_) => false,
        };
        if as_response {
            self.responses.parse(raw, headers).map(ParsedSignal::Response)
        } else {
            self.commands.parse(raw, headers).map(ParsedSignal::Command)
        }
    }
}

fn in_response_namespace(type_tag: &str) -> bool {
    type_tag
        .split_once(':')
        .is_some_and(|(namespace, _)| namespace.ends_with(".responses"))
}

/// Outcome of [`SignalRegistries::parse_any`].
#[derive(Debug)]
pub enum ParsedSignal {
    Command(Box<dyn Command>),
    Response(Arc<dyn CommandResponse>),
}

impl ParsedSignal {
    pub fn to_json_with(
        &self,
        version: SchemaVersion,
        predicate: &FieldPredicate,
    ) -> Result<JsonObject> {
        match self {
            ParsedSignal::Command(command) => command.to_json_with(version, predicate),
            ParsedSignal::Response(response) => response.to_json_with(version, predicate),
        }
    }
}
