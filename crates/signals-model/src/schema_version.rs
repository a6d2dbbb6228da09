//! ---
//! sig_section: "02-envelope-protocol"
//! sig_subsection: "module"
//! sig_type: "source"
//! sig_scope: "code"
//! sig_description: "Negotiated schema versions gating payload fields."
//! sig_version: "v0.0.0-prealpha"
//! sig_owner: "tbd"
//! ---
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

/// Protocol schema version. Variants are ordered oldest first.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum SchemaVersion {
    #[strum(serialize = "1")]
    V1,
    #[strum(serialize = "2")]
    V2,
}

impl SchemaVersion {
    /// Every known version, oldest first.
    pub const ALL: &'static [SchemaVersion] = &[SchemaVersion::V1, SchemaVersion::V2];

    /// Version used when neither the caller nor the headers pick one.
    pub const LATEST: SchemaVersion = SchemaVersion::V2;

    /// Numeric wire form of the version.
    pub fn to_int(self) -> u8 {
        match self {
            SchemaVersion::V1 => 1,
            SchemaVersion::V2 => 2,
        }
    }

    /// Resolve the numeric wire form, if known.
    pub fn from_int(value: u8) -> Option<Self> {
        SchemaVersion::iter().find(|version| version.to_int() == value)
    }
}

impl From<SchemaVersion> for u8 {
    fn from(version: SchemaVersion) -> Self {
        version.to_int()
    }
}

impl TryFrom<u8> for SchemaVersion {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        SchemaVersion::from_int(value).ok_or_else(|| format!("unknown schema version: {}", value))
    }
}

impl FromStr for SchemaVersion {
    type Err = String;

    /// Accepts `1`, `2`, `v1`, `V2` and similar spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        digits
            .parse::<u8>()
            .ok()
            .and_then(SchemaVersion::from_int)
            .ok_or_else(|| format!("unknown schema version: {}", s))
    }
}
