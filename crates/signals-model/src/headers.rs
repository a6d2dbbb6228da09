//! ---
//! sig_section: "02-envelope-protocol"
//! sig_subsection: "module"
//! sig_type: "source"
//! sig_scope: "code"
//! sig_description: "Immutable ordered header carrier attached to every signal."
//! sig_version: "v0.0.0-prealpha"
//! sig_owner: "tbd"
//! ---
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::schema_version::SchemaVersion;

/// Header key carrying the negotiated schema version.
pub const SCHEMA_VERSION_KEY: &str = "version";
/// Header key carrying the correlation identifier.
pub const CORRELATION_ID_KEY: &str = "correlation-id";

/// Immutable, ordered key/value headers.
///
/// Keys are stored lowercased. Cloning shares the backing map, so handing the
/// same headers to many signals costs one reference count each.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Arc<IndexMap<String, String>>,
}

impl Headers {
    /// Empty header set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Start a builder for a new header set.
    pub fn builder() -> HeadersBuilder {
        HeadersBuilder::default()
    }

    /// Look up a header value by case-insensitive key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key.to_ascii_lowercase().as_str())
            .map(String::as_str)
    }

    /// Negotiated schema version, if the `version` header is present and known.
    pub fn schema_version(&self) -> Option<SchemaVersion> {
        let raw = self.get(SCHEMA_VERSION_KEY)?;
        match raw.parse() {
            Ok(version) => Some(version),
            Err(err) => {
                warn!(
                    header = SCHEMA_VERSION_KEY,
                    value = raw,
                    error = %err,
                    "ignoring unknown schema version header"
                );
                None
            }
        }
    }

    /// Correlation identifier, if present.
    pub fn correlation_id(&self) -> Option<&str> {
        self.get(CORRELATION_ID_KEY)
    }

    /// Return a new header set with `key` set to `value`; `self` is untouched.
    pub fn with(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut entries = (*self.entries).clone();
        entries.insert(key.into().to_ascii_lowercase(), value.into());
        Self {
            entries: Arc::new(entries),
        }
    }

    /// Return a new header set carrying the given schema version.
    pub fn with_schema_version(&self, version: SchemaVersion) -> Self {
        self.with(SCHEMA_VERSION_KEY, version.to_string())
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

impl Serialize for Headers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.as_ref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Headers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = IndexMap::<String, String>::deserialize(deserializer)?;
        Ok(raw.into_iter().collect())
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Headers::builder(), |builder, (k, v)| builder.set(k, v))
            .build()
    }
}

/// Accumulates header entries before freezing them into [`Headers`].
#[derive(Debug, Default)]
pub struct HeadersBuilder {
    entries: IndexMap<String, String>,
}

impl HeadersBuilder {
    /// Set a header, replacing any previous value for the same key.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries
            .insert(key.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn schema_version(self, version: SchemaVersion) -> Self {
        self.set(SCHEMA_VERSION_KEY, version.to_string())
    }

    pub fn correlation_id(self, id: impl Into<String>) -> Self {
        self.set(CORRELATION_ID_KEY, id)
    }

    /// Freeze the accumulated entries.
    pub fn build(self) -> Headers {
        Headers {
            entries: Arc::new(self.entries),
        }
    }
}
