//! Structured configuration discovered on (or declared for) a host.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Source of a [`Config`] declared in the project file.
pub const MANUAL_SOURCE: &str = "manual";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_kind", alias = "adapter", alias = "driver")]
    pub kind: String,
    #[serde(default = "default_db_host")]
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(alias = "database", alias = "dbname")]
    pub name: String,
    #[serde(default, alias = "user")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
}

fn default_kind() -> String {
    "mysql".to_string()
}

fn default_db_host() -> String {
    "localhost".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_source")]
    pub source: String,
    /// Remote path the config was read from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub databases: Vec<DatabaseConfig>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

fn default_source() -> String {
    MANUAL_SOURCE.to_string()
}

impl Config {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_database(mut self, database: DatabaseConfig) -> Self {
        self.databases.push(database);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.databases.is_empty() && self.attributes.is_empty()
    }

    /// One line per database, credentials masked.
    pub fn summary(&self) -> Vec<String> {
        let origin = match &self.path {
            Some(path) => format!("{} ({})", self.source, path),
            None => self.source.clone(),
        };

        if self.databases.is_empty() {
            return vec![format!("{}: {} attribute(s)", origin, self.attributes.len())];
        }

        self.databases
            .iter()
            .map(|db| {
                let port = db.port.map(|p| format!(":{}", p)).unwrap_or_default();
                format!(
                    "{}: {} {}@{}{}/{}",
                    origin, db.kind, db.username, db.host, port, db.name
                )
            })
            .collect()
    }
}
