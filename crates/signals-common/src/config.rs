//! ---
//! sig_section: "01-core-functionality"
//! sig_subsection: "module"
//! sig_type: "source"
//! sig_scope: "code"
//! sig_description: "TOML configuration for protocol defaults and logging."
//! sig_version: "v0.0.0-prealpha"
//! sig_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use signals_model::{FieldPredicate, SchemaVersion};
use tracing::debug;

use crate::logging::LogFormat;

fn default_schema_version() -> SchemaVersion {
    SchemaVersion::LATEST
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

/// Primary configuration object for signal tooling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalsConfig {
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where a [`SignalsConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedSignalsConfig {
    pub config: SignalsConfig,
    pub source: Option<PathBuf>,
}

impl SignalsConfig {
    pub const ENV_CONFIG_PATH: &str = "SIGNALS_CONFIG";

    /// Load configuration from disk, respecting the `SIGNALS_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        let loaded = Self::load_with_source(candidates)?;
        if loaded.source.is_none() {
            return Err(anyhow!(
                "no configuration files found. inspected: {}",
                describe(candidates)
            ));
        }
        Ok(loaded.config)
    }

    /// Like [`load`](Self::load) but falls back to defaults when no file exists.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedSignalsConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedSignalsConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedSignalsConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        debug!(inspected = %describe(candidates), "no configuration file found, using defaults");
        Ok(LoadedSignalsConfig {
            config: Self::default(),
            source: None,
        })
    }

    fn from_path(path: PathBuf) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        contents
            .parse::<SignalsConfig>()
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.logging.validate()
    }
}

impl std::str::FromStr for SignalsConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: SignalsConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

fn describe<P: AsRef<Path>>(candidates: &[P]) -> String {
    candidates
        .iter()
        .map(|p| p.as_ref().display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Field predicate selectable from configuration and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PredicateChoice {
    #[default]
    NotHidden,
    All,
    Regular,
}

impl PredicateChoice {
    pub fn to_predicate(self) -> FieldPredicate {
        match self {
            PredicateChoice::NotHidden => FieldPredicate::not_hidden(),
            PredicateChoice::All => FieldPredicate::all(),
            PredicateChoice::Regular => FieldPredicate::regular(),
        }
    }
}

/// Protocol defaults applied when a caller or header does not decide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    #[serde(default = "default_schema_version")]
    pub default_schema_version: SchemaVersion,
    #[serde(default)]
    pub default_predicate: PredicateChoice,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            default_schema_version: default_schema_version(),
            default_predicate: PredicateChoice::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
    /// Also write a daily rolling JSON log file under `directory`.
    #[serde(default)]
    pub file_output: bool,
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(prefix) = &self.file_prefix {
            if prefix.trim().is_empty() {
                return Err(anyhow!("logging.file_prefix cannot be blank"));
            }
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
            file_output: false,
        }
    }
}
