//! Store configuration loaded from environment variables.
//!
//! Required variables must be present and valid, or loading fails with a
//! [`ConfigError`] naming the variable.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `IDSTORE_DATABASE_URL` | required |
//! | `IDSTORE_DATA_PROVIDER` | `sqlite` |
//! | `IDSTORE_MAX_CONNECTIONS` | `5` |
//! | `IDSTORE_CONNECT_TIMEOUT_SECS` | `30` |

use crate::connection::DataProvider;
use serde::Deserialize;
use std::env;
use std::time::Duration;
use thiserror::Error;

pub const DATABASE_URL_VAR: &str = "IDSTORE_DATABASE_URL";
pub const DATA_PROVIDER_VAR: &str = "IDSTORE_DATA_PROVIDER";
pub const MAX_CONNECTIONS_VAR: &str = "IDSTORE_MAX_CONNECTIONS";
pub const CONNECT_TIMEOUT_VAR: &str = "IDSTORE_CONNECT_TIMEOUT_SECS";

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },
}

/// Connection settings for a [`DefaultConnectionFactory`](crate::DefaultConnectionFactory).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    /// Backend driver selector.
    #[serde(default)]
    pub data_provider: DataProvider,

    /// Driver connection string (e.g. `sqlite://identity.db`).
    pub connection_string: String,

    /// Upper bound on pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait when acquiring a connection.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

impl StoreConfig {
    pub fn new(data_provider: DataProvider, connection_string: impl Into<String>) -> Self {
        Self {
            data_provider,
            connection_string: connection_string.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }

    /// A private in-memory SQLite database.
    ///
    /// The pool is limited to one connection, since every in-memory SQLite
    /// connection opens its own database.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            max_connections: 1,
            ..Self::new(DataProvider::Sqlite, "sqlite::memory:")
        }
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let connection_string = lookup(DATABASE_URL_VAR)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingVar(DATABASE_URL_VAR.to_string()))?;

        let data_provider = match lookup(DATA_PROVIDER_VAR) {
            Some(value) => {
                DataProvider::from_str_value(&value).map_err(|e| ConfigError::InvalidValue {
                    var: DATA_PROVIDER_VAR.to_string(),
                    message: e.to_string(),
                })?
            }
            None => DataProvider::default(),
        };

        let max_connections = parse_var(&lookup, MAX_CONNECTIONS_VAR, DEFAULT_MAX_CONNECTIONS)?;
        if max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                var: MAX_CONNECTIONS_VAR.to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        let connect_timeout_secs =
            parse_var(&lookup, CONNECT_TIMEOUT_VAR, DEFAULT_CONNECT_TIMEOUT_SECS)?;

        Ok(Self {
            data_provider,
            connection_string,
            max_connections,
            connect_timeout_secs,
        })
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Whether the connection string names an in-memory database.
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.connection_string.contains(":memory:")
            || self.connection_string.contains("mode=memory")
    }
}

fn parse_var<F, T>(lookup: &F, var: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            var: var.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}
