//! Storage backend selector.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which storage backend the service runs against.
///
/// Parsed from the `STORAGE_TYPE` environment variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// Process-local maps, nothing persisted.
    #[default]
    Memory,
    /// Redis only; entries expire after the cache TTL.
    Redis,
    /// PostgreSQL only.
    Postgres,
    /// Redis in front of PostgreSQL.
    #[serde(rename = "both", alias = "combined")]
    Combined,
}

impl StorageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Redis => "redis",
            Self::Postgres => "postgres",
            Self::Combined => "both",
        }
    }

    /// Returns true if this variant needs a PostgreSQL connection.
    pub fn needs_database(&self) -> bool {
        matches!(self, Self::Postgres | Self::Combined)
    }

    /// Returns true if this variant needs a Redis connection.
    pub fn needs_cache(&self) -> bool {
        matches!(self, Self::Redis | Self::Combined)
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when `STORAGE_TYPE` holds an unknown value.
#[derive(Debug, thiserror::Error)]
#[error("unknown storage type '{0}' (expected memory, redis, postgres or both)")]
pub struct UnknownStorageType(pub String);

impl FromStr for StorageType {
    type Err = UnknownStorageType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "both" | "combined" => Ok(Self::Combined),
            other => Err(UnknownStorageType(other.to_string())),
        }
    }
}
