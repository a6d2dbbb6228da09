//! ---
//! sig_section: "01-core-functionality"
//! sig_subsection: "module"
//! sig_type: "source"
//! sig_scope: "code"
//! sig_description: "Build and protocol version metadata."
//! sig_version: "v0.0.0-prealpha"
//! sig_owner: "tbd"
//! ---
use serde::Serialize;
use signals_model::SchemaVersion;

/// Compile-time version metadata captured via `vergen`.
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    /// Workspace semantic version.
    pub semver: String,
    /// Git commit hash supplied through `SIGNALS_GIT_SHA`.
    pub git_sha: String,
    pub build_timestamp: String,
    pub target: String,
    pub profile: String,
    /// Newest schema version this build can emit.
    pub latest_schema_version: SchemaVersion,
}

impl VersionInfo {
    #[must_use]
    pub fn current() -> Self {
        Self {
            semver: env!("CARGO_PKG_VERSION").to_owned(),
            git_sha: option_env!("SIGNALS_GIT_SHA")
                .unwrap_or("UNKNOWN")
                .to_owned(),
            build_timestamp: option_env!("VERGEN_BUILD_TIMESTAMP")
                .unwrap_or("UNKNOWN")
                .to_owned(),
            target: option_env!("VERGEN_CARGO_TARGET_TRIPLE")
                .unwrap_or("UNKNOWN")
                .to_owned(),
            profile: option_env!("VERGEN_CARGO_PROFILE")
                .unwrap_or("UNKNOWN")
                .to_owned(),
            latest_schema_version: SchemaVersion::LATEST,
        }
    }

    /// Human readable banner used in logging surfaces.
    #[must_use]
    pub fn banner(&self) -> String {
        format!(
            "signals v{} (git {}, schema v{})",
            self.semver, self.git_sha, self.latest_schema_version
        )
    }

    /// Extended string containing build metadata suitable for `--version` flags.
    #[must_use]
    pub fn extended(&self) -> String {
        format!(
            "{banner}\nBuilt: {built}\nTarget: {target}\nProfile: {profile}",
            banner = self.banner(),
            built = self.build_timestamp,
            target = self.target,
            profile = self.profile
        )
    }
}
