//! ---
//! sig_section: "03-payload-schemas"
//! sig_subsection: "module"
//! sig_type: "source"
//! sig_scope: "code"
//! sig_description: "Devops logger configuration command and per-instance response."
//! sig_version: "v0.0.0-prealpha"
//! sig_owner: "tbd"
//! ---
//! Devops signals are broadcast to every running service instance. Each
//! instance answers with its own response, identified by `serviceName` and
//! `instance`, and the replies are folded into an aggregated response.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use signals_model::{
    AggregateEntry, Category, Command, CommandResponse, FieldDefinition, Headers, JsonObject,
    JsonObjectWriter, Result, SchemaVersion, Signal, SignalError, TypeValidatingDeserializer,
    WithEntity,
};

pub mod fields {
    use signals_model::{FieldDefinition, SchemaVersion};

    pub const SERVICE_NAME: FieldDefinition =
        FieldDefinition::regular("serviceName", SchemaVersion::ALL);
    pub const INSTANCE: FieldDefinition = FieldDefinition::regular("instance", SchemaVersion::ALL);
    pub const ALL_KNOWN_LOGGERS: FieldDefinition =
        FieldDefinition::regular("allKnownLoggers", SchemaVersion::ALL);
    pub const SPECIFIC_LOGGERS: FieldDefinition =
        FieldDefinition::regular("specificLoggers", SchemaVersion::ALL);
    pub const LOGGER_CONFIGS: FieldDefinition =
        FieldDefinition::regular("loggerConfigs", SchemaVersion::ALL);
}

use fields::{ALL_KNOWN_LOGGERS, INSTANCE, LOGGER_CONFIGS, SERVICE_NAME, SPECIFIC_LOGGERS};

/// Level assigned to one named logger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerConfig {
    pub logger: String,
    pub level: String,
}

impl LoggerConfig {
    pub fn new(logger: impl Into<String>, level: impl Into<String>) -> Self {
        Self {
            logger: logger.into(),
            level: level.into(),
        }
    }
}

/// Ask instances for their logger levels, either all of them or a named subset.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrieveLoggerConfig {
    all_known_loggers: bool,
    specific_loggers: Vec<String>,
    headers: Headers,
}

impl RetrieveLoggerConfig {
    pub const TYPE: &'static str = "devops.commands:retrieveLoggerConfig";

    pub fn all_known(headers: Headers) -> Self {
        Self {
            all_known_loggers: true,
            specific_loggers: Vec::new(),
            headers,
        }
    }

    pub fn specific<I, S>(loggers: I, headers: Headers) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            all_known_loggers: false,
            specific_loggers: loggers.into_iter().map(Into::into).collect(),
            headers,
        }
    }

    pub fn is_all_known_loggers(&self) -> bool {
        self.all_known_loggers
    }

    pub fn specific_loggers(&self) -> &[String] {
        &self.specific_loggers
    }

    pub fn from_json(raw: &JsonObject, headers: &Headers) -> Result<Self> {
        let deserializer = TypeValidatingDeserializer::new(Self::TYPE, raw)?;
        let reader = deserializer.reader();
        deserializer.deserialize(|| {
            let all_known_loggers = match reader.optional_value(&ALL_KNOWN_LOGGERS) {
                None => false,
                Some(Value::Bool(flag)) => flag,
                Some(_) => return Err(invalid(Self::TYPE, &ALL_KNOWN_LOGGERS, "boolean")),
            };
            let specific_loggers = if raw.contains_key(SPECIFIC_LOGGERS.key()) {
                reader
                    .array(&SPECIFIC_LOGGERS)?
                    .iter()
                    .map(|logger| {
                        logger
                            .as_str()
                            .map(str::to_owned)
                            .ok_or_else(|| {
                                invalid(Self::TYPE, &SPECIFIC_LOGGERS, "array of strings")
                            })
                    })
                    .collect::<Result<Vec<_>>>()?
            } else {
                Vec::new()
            };
            Ok(Self {
                all_known_loggers,
                specific_loggers,
                headers: headers.clone(),
            })
        })
    }
}

impl Signal for RetrieveLoggerConfig {
    crate::signal_basics!(Self::TYPE);

    fn append_payload(&self, writer: &mut JsonObjectWriter<'_>) -> Result<()> {
        writer.set(&ALL_KNOWN_LOGGERS, self.all_known_loggers);
        if !self.specific_loggers.is_empty() {
            writer.set(&SPECIFIC_LOGGERS, self.specific_loggers.clone());
        }
        Ok(())
    }
}

impl Command for RetrieveLoggerConfig {
    fn category(&self) -> Category {
        Category::Query
    }
}

crate::with_headers!(RetrieveLoggerConfig);

/// Logger levels reported by one service instance.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrieveLoggerConfigResponse {
    service_name: Option<String>,
    instance: Option<i32>,
    logger_configs: Vec<LoggerConfig>,
    headers: Headers,
}

impl RetrieveLoggerConfigResponse {
    pub const TYPE: &'static str = "devops.responses:retrieveLoggerConfig";

    pub fn new(
        service_name: Option<String>,
        instance: Option<i32>,
        logger_configs: Vec<LoggerConfig>,
        headers: Headers,
    ) -> Self {
        Self {
            service_name,
            instance,
            logger_configs,
            headers,
        }
    }

    pub fn service_name(&self) -> Option<&str> {
        self.service_name.as_deref()
    }

    pub fn instance(&self) -> Option<i32> {
        self.instance
    }

    pub fn logger_configs(&self) -> &[LoggerConfig] {
        &self.logger_configs
    }

    /// Wrap this reply as an aggregate entry keyed by its own origin.
    pub fn into_entry(self) -> AggregateEntry {
        let service_name = self.service_name.clone();
        let instance = self.instance;
        AggregateEntry::new(service_name, instance, Arc::new(self))
    }

    pub fn from_json(raw: &JsonObject, headers: &Headers) -> Result<Self> {
        let deserializer = TypeValidatingDeserializer::new(Self::TYPE, raw)?;
        let reader = deserializer.reader();
        deserializer.deserialize(|| {
            let instance = reader
                .optional_i64(&INSTANCE)?
                .map(|instance| {
                    i32::try_from(instance)
                        .map_err(|_| invalid(Self::TYPE, &INSTANCE, "32-bit integer"))
                })
                .transpose()?;
            let logger_configs = parse_logger_configs(reader.value(&LOGGER_CONFIGS)?)?;
            Ok(Self::new(
                reader.optional_string(&SERVICE_NAME)?,
                instance,
                logger_configs,
                headers.clone(),
            ))
        })
    }
}

impl Signal for RetrieveLoggerConfigResponse {
    crate::signal_basics!(Self::TYPE);

    fn append_payload(&self, writer: &mut JsonObjectWriter<'_>) -> Result<()> {
        writer
            .set_optional(&SERVICE_NAME, self.service_name.as_deref())
            .set_optional(&INSTANCE, self.instance)
            .set(&LOGGER_CONFIGS, serde_json::to_value(&self.logger_configs)?);
        Ok(())
    }
}

impl CommandResponse for RetrieveLoggerConfigResponse {
    fn status_code(&self) -> u16 {
        200
    }
}

crate::with_headers!(RetrieveLoggerConfigResponse);

impl WithEntity for RetrieveLoggerConfigResponse {
    fn entity(&self, _version: SchemaVersion) -> Result<Value> {
        Ok(serde_json::to_value(&self.logger_configs)?)
    }

    fn set_entity(&self, entity: Value) -> Result<Self> {
        Ok(Self {
            logger_configs: parse_logger_configs(entity)?,
            ..self.clone()
        })
    }
}

fn parse_logger_configs(value: Value) -> Result<Vec<LoggerConfig>> {
    if !value.is_array() {
        return Err(invalid(
            RetrieveLoggerConfigResponse::TYPE,
            &LOGGER_CONFIGS,
            "array",
        ));
    }
    Ok(serde_json::from_value(value)?)
}

fn invalid(type_tag: &str, field: &FieldDefinition, expected: &'static str) -> SignalError {
    SignalError::InvalidFieldValue {
        field: field.key().to_owned(),
        type_tag: type_tag.to_owned(),
        expected,
    }
}
