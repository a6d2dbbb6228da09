//! ---
//! sig_section: "04-tooling-interfaces"
//! sig_subsection: "binary"
//! sig_type: "source"
//! sig_scope: "code"
//! sig_description: "Re-emit a parsed signal at a chosen version and visibility."
//! sig_version: "v0.0.0-prealpha"
//! sig_owner: "tbd"
//! ---
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Args;
use serde_json::Value;
use signals_common::{PredicateChoice, SignalsConfig};
use signals_model::{Headers, JsonObject, SchemaVersion};
use signals_payloads::{ParsedSignal, SignalRegistries};
use tracing::info;

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Signal JSON file, or `-` for stdin.
    #[arg(value_name = "FILE")]
    pub path: PathBuf,
    /// Schema version to emit; defaults to the `version` header, then configuration.
    #[arg(long = "schema-version", value_name = "VERSION")]
    pub schema_version: Option<SchemaVersion>,
    /// Field visibility applied when emitting.
    #[arg(long, value_enum)]
    pub predicate: Option<PredicateChoice>,
    /// Header attached while parsing, as `key=value`. Repeatable.
    #[arg(long = "header", value_name = "KEY=VALUE", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,
}

pub fn run(args: InspectArgs, config: &SignalsConfig, registries: &SignalRegistries) -> Result<()> {
    let raw = read_object(&args.path)?;
    let headers: Headers = args.headers.into_iter().collect();
    let parsed = registries.parse_any(&raw, &headers)?;

    let version = args
        .schema_version
        .or_else(|| headers.schema_version())
        .unwrap_or(config.protocol.default_schema_version);
    let predicate = args
        .predicate
        .unwrap_or(config.protocol.default_predicate)
        .to_predicate();

    let kind = match &parsed {
        ParsedSignal::Command(command) => {
            info!(type_tag = command.type_tag(), category = %command.category(), "command parsed");
            "command"
        }
        ParsedSignal::Response(response) => {
            info!(
                type_tag = response.type_tag(),
                status = response.status_code(),
                "response parsed"
            );
            "response"
        }
    };
    let json = registries.emit(&parsed, version, &predicate)?;
    info!(kind, version = %version, predicate = predicate.label(), "re-emitting signal");
    println!("{}", serde_json::to_string_pretty(&Value::Object(json))?);
    Ok(())
}

/// Read a JSON object from `path`, or stdin when `path` is `-`.
pub fn read_object(path: &Path) -> Result<JsonObject> {
    let contents = if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read signal from stdin")?;
        buffer
    } else {
        fs::read_to_string(path)
            .with_context(|| format!("unable to read signal file {}", path.display()))?
    };
    match serde_json::from_str::<Value>(&contents)
        .with_context(|| format!("{} is not valid JSON", path.display()))?
    {
        Value::Object(raw) => Ok(raw),
        _ => Err(anyhow!("{} does not contain a JSON object", path.display())),
    }
}

fn parse_header(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim().to_owned(), value.trim().to_owned()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got `{}`", raw))
}
