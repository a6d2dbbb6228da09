//! ---
//! sig_section: "02-envelope-protocol"
//! sig_subsection: "module"
//! sig_type: "source"
//! sig_scope: "code"
//! sig_description: "Prometheus counters for registry and serialization activity."
//! sig_version: "v0.0.0-prealpha"
//! sig_owner: "tbd"
//! ---
use std::fmt;

use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

/// Prometheus metric handles for signal parsing and serialization.
#[derive(Clone)]
pub struct SignalMetrics {
    parsed: IntCounterVec,
    rejected: IntCounterVec,
    serialized: IntCounter,
}

impl SignalMetrics {
    /// Register signal metrics with the provided registry.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let parsed = IntCounterVec::new(
            Opts::new(
                "signals_parsed_total",
                "Signals reconstructed from raw JSON, by registry kind",
            ),
            &["registry"],
        )?;
        let rejected = IntCounterVec::new(
            Opts::new(
                "signals_rejected_total",
                "Raw JSON rejected while reconstructing signals",
            ),
            &["registry", "reason"],
        )?;
        let serialized = IntCounter::with_opts(Opts::new(
            "signals_serialized_total",
            "Signals written to JSON through the CLI or callers",
        ))?;

        registry.register(Box::new(parsed.clone()))?;
        registry.register(Box::new(rejected.clone()))?;
        registry.register(Box::new(serialized.clone()))?;

        Ok(Self {
            parsed,
            rejected,
            serialized,
        })
    }

    pub fn observe_parsed(&self, registry: &str) {
        self.parsed.with_label_values(&[registry]).inc();
    }

    pub fn observe_rejected(&self, registry: &str, reason: &str) {
        self.rejected.with_label_values(&[registry, reason]).inc();
    }

    pub fn observe_serialized(&self) {
        self.serialized.inc();
    }
}

impl fmt::Debug for SignalMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalMetrics")
            .field("serialized", &self.serialized.get())
            .finish_non_exhaustive()
    }
}
