//! Value Objects - Immutable domain primitives
//!
//! Value objects are identified by their value rather than identity.
//! They are validated on construction and can be freely shared.

use crate::domain::errors::RegistryError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use url::Url;

const SCHEME: &str = "mongodb://";
const SRV_SCHEME: &str = "mongodb+srv://";

/// A validated document-database connection string.
///
/// Accepts `mongodb://` and `mongodb+srv://` URIs with one or more
/// comma-separated hosts. Credentials, database and query options are
/// carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConnectionUri(String);

impl ConnectionUri {
    /// Parse and validate a connection string.
    ///
    /// # Examples
    /// ```
    /// use docwatch::domain::value_objects::ConnectionUri;
    ///
    /// assert!(ConnectionUri::parse("mongodb://localhost:27017").is_ok());
    /// assert!(ConnectionUri::parse("mongodb://a:1,b:2/admin?replicaSet=rs0").is_ok());
    /// assert!(ConnectionUri::parse("http://localhost").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, RegistryError> {
        let trimmed = raw.trim();
        let rest = trimmed
            .strip_prefix(SRV_SCHEME)
            .or_else(|| trimmed.strip_prefix(SCHEME))
            .ok_or_else(|| RegistryError::InvalidUri(format!("unsupported scheme in '{}'", raw)))?;

        // credentials end at the last '@' before the path
        let authority = rest.split(['/', '?']).next().unwrap_or_default();
        let hosts = match authority.rfind('@') {
            Some(idx) => &authority[idx + 1..],
            None => authority,
        };

        if hosts.is_empty() {
            return Err(RegistryError::InvalidUri("missing host".to_string()));
        }

        for host in hosts.split(',') {
            let parsed = Url::parse(&format!("{}{}", SCHEME, host))
                .map_err(|e| RegistryError::InvalidUri(format!("host '{}': {}", host, e)))?;
            if parsed.host_str().map_or(true, str::is_empty) {
                return Err(RegistryError::InvalidUri(format!("host '{}' is empty", host)));
            }
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this URI uses DNS seed-list discovery.
    pub fn is_srv(&self) -> bool {
        self.0.starts_with(SRV_SCHEME)
    }
}

impl TryFrom<String> for ConnectionUri {
    type Error = RegistryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ConnectionUri> for String {
    fn from(uri: ConnectionUri) -> Self {
        uri.0
    }
}

impl std::fmt::Display for ConnectionUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Driver options attached to a connection, keyed by option name.
///
/// Kept as arbitrary JSON values; the client factory decides which keys
/// it understands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionOptions(BTreeMap<String, Value>);

impl ConnectionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build options from a JSON value, which must be an object (or null).
    pub fn from_json(value: Value) -> Result<Self, RegistryError> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::Object(map) => Ok(Self::from_map(map)),
            other => Err(RegistryError::InvalidOptions(format!(
                "expected a JSON object, got {}",
                other
            ))),
        }
    }

    /// Parse options from a JSON string. An empty string means no options.
    pub fn parse(raw: &str) -> Result<Self, RegistryError> {
        if raw.trim().is_empty() {
            return Ok(Self::new());
        }
        let value: Value =
            serde_json::from_str(raw).map_err(|e| RegistryError::InvalidOptions(e.to_string()))?;
        Self::from_json(value)
    }

    fn from_map(map: Map<String, Value>) -> Self {
        Self(map.into_iter().collect())
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(Value::as_u64)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
