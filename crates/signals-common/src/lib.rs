//! ---
//! sig_section: "01-core-functionality"
//! sig_subsection: "module"
//! sig_type: "source"
//! sig_scope: "code"
//! sig_description: "Shared configuration, logging and version utilities."
//! sig_version: "v0.0.0-prealpha"
//! sig_owner: "tbd"
//! ---
//! Ambient utilities for the signals workspace: configuration loading,
//! tracing bootstrap and build metadata.

pub mod config;
pub mod logging;
pub mod version;

pub use config::{LoggingConfig, PredicateChoice, ProtocolConfig, SignalsConfig};
pub use logging::{init_tracing, LogFormat};
pub use version::VersionInfo;
