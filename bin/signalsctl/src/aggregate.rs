//! ---
//! sig_section: "04-tooling-interfaces"
//! sig_subsection: "binary"
//! sig_type: "source"
//! sig_scope: "code"
//! sig_description: "Fold per-instance response files into an aggregated response."
//! sig_version: "v0.0.0-prealpha"
//! sig_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde_json::Value;
use signals_common::SignalsConfig;
use signals_model::{AggregateEntry, AggregatedResponse, CommandResponse, Headers};
use signals_payloads::SignalRegistries;
use tracing::{info, warn};

use crate::inspect::read_object;

#[derive(Debug, Args)]
pub struct AggregateArgs {
    /// Response file tagged with its origin as `[service][:instance]=FILE`.
    #[arg(value_name = "ORIGIN=FILE", required = true, value_parser = parse_source)]
    pub sources: Vec<ResponseSource>,
    /// Type of the aggregated responses; defaults to the first file's type.
    #[arg(long = "responses-type", value_name = "TAG")]
    pub responses_type: Option<String>,
    /// Status code of the aggregated response.
    #[arg(long, default_value_t = 200)]
    pub status: u16,
}

/// One response file and the instance it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSource {
    pub service_name: Option<String>,
    pub instance: Option<i32>,
    pub path: PathBuf,
}

pub fn run(
    args: AggregateArgs,
    config: &SignalsConfig,
    registries: &SignalRegistries,
) -> Result<()> {
    let mut entries = Vec::with_capacity(args.sources.len());
    let mut responses_type = args.responses_type;
    for source in args.sources {
        let raw = read_object(&source.path)?;
        let response = registries
            .responses
            .parse(&raw, &Headers::empty())
            .with_context(|| format!("{} is not a known response", source.path.display()))?;
        let expected = responses_type.get_or_insert_with(|| response.type_tag().to_owned());
        if response.type_tag() != expected.as_str() {
            bail!(
                "{} holds {} but the aggregate collects {}",
                source.path.display(),
                response.type_tag(),
                expected
            );
        }
        entries.push(AggregateEntry::new(source.service_name, source.instance, response));
    }
    let Some(responses_type) = responses_type else {
        bail!("no responses to aggregate");
    };

    let aggregated = AggregatedResponse::new(entries, responses_type, Headers::empty())?
        .with_status_code(args.status);
    let distinct = aggregated
        .entries()
        .iter()
        .map(|entry| (entry.service_key(), entry.instance_key()))
        .collect::<std::collections::HashSet<_>>()
        .len();
    if distinct < aggregated.entries().len() {
        warn!(
            entries = aggregated.entries().len(),
            distinct,
            "colliding origins; later files win"
        );
    }
    let version = config.protocol.default_schema_version;
    let predicate = config.protocol.default_predicate.to_predicate();
    let json = aggregated.to_json_with(version, &predicate)?;
    info!(
        responses_type = aggregated.responses_type(),
        entries = aggregated.entries().len(),
        "aggregated response emitted"
    );
    println!("{}", serde_json::to_string_pretty(&Value::Object(json))?);
    Ok(())
}

fn parse_source(raw: &str) -> std::result::Result<ResponseSource, String> {
    let (origin, path) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected [service][:instance]=FILE, got `{}`", raw))?;
    if path.trim().is_empty() {
        return Err(format!("missing file in `{}`", raw));
    }
    let (service, instance) = match origin.split_once(':') {
        Some((service, instance)) => (service, instance),
        None => (origin, ""),
    };
    let service_name = Some(service.trim())
        .filter(|service| !service.is_empty())
        .map(str::to_owned);
    let instance = match instance.trim() {
        "" => None,
        value => Some(
            value
                .parse::<i32>()
                .map_err(|_| format!("instance `{}` is not an integer", value))?,
        ),
    };
    Ok(ResponseSource {
        service_name,
        instance,
        path: PathBuf::from(path.trim()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_allow_missing_service_or_instance() {
        assert_eq!(
            parse_source("gateway:2=a.json").expect("full"),
            ResponseSource {
                service_name: Some("gateway".into()),
                instance: Some(2),
                path: PathBuf::from("a.json"),
            }
        );
        let bare = parse_source("=b.json").expect("bare");
        assert_eq!(bare.service_name, None);
        assert_eq!(bare.instance, None);
        let instance_only = parse_source(":7=c.json").expect("instance only");
        assert_eq!(instance_only.service_name, None);
        assert_eq!(instance_only.instance, Some(7));
    }

    #[test]
    fn malformed_origins_are_rejected() {
        assert!(parse_source("gateway:x=a.json").is_err());
        assert!(parse_source("gateway:1").is_err());
        assert!(parse_source("gateway:1=").is_err());
    }
}
