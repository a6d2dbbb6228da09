//! ---
//! sig_section: "03-payload-schemas"
//! sig_subsection: "module"
//! sig_type: "source"
//! sig_scope: "code"
//! sig_description: "Concrete thing and devops signals plus their registries."
//! sig_version: "v0.0.0-prealpha"
//! sig_owner: "tbd"
//! ---
//! Concrete signals exchanged between services.
//!
//! [`things`] covers thing and attribute management, [`devops`] the logger
//! configuration broadcast answered per service instance. [`SignalRegistries`]
//! bundles the frozen registries that turn raw JSON back into these types.

/// `Signal` accessors for structs holding a `headers: Headers` field.
macro_rules! signal_basics {
    ($tag:expr) => {
        fn type_tag(&self) -> &str {
            $tag
        }

        fn headers(&self) -> &signals_model::Headers {
            &self.headers
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    };
}

/// Copy-on-write `WithHeaders` for `Clone` structs holding a `headers` field.
macro_rules! with_headers {
    ($ty:ty) => {
        impl signals_model::WithHeaders for $ty {
            fn with_headers(&self, headers: signals_model::Headers) -> Self {
                Self {
                    headers,
                    ..self.clone()
                }
            }
        }
    };
}

pub(crate) use signal_basics;
pub(crate) use with_headers;

pub mod devops;
pub mod registries;
pub mod things;

pub use devops::{LoggerConfig, RetrieveLoggerConfig, RetrieveLoggerConfigResponse};
pub use registries::{
    build_command_registry, build_response_registry, ParsedSignal, SignalRegistries,
};
