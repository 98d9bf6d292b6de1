//! Database connection setup.
//!
//! Stores never open connections themselves: they ask a [`ConnectionFactory`]
//! for a [`DataConnection`] on every operation. The default factory builds a
//! pool once from a [`StoreConfig`] and hands out cheap clones of it.

use std::str::FromStr;

use async_trait::async_trait;
use serde::Deserialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use tokio::sync::OnceCell;

use crate::config::StoreConfig;
use crate::error::DbError;
use crate::mapping::Entity;

/// Backend driver selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataProvider {
    /// SQLite through `sqlx`.
    #[default]
    #[serde(alias = "SQLite", alias = "Sqlite")]
    Sqlite,
}

impl DataProvider {
    /// Parse from string value (case-insensitive).
    pub fn from_str_value(s: &str) -> Result<Self, DbError> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            other => Err(DbError::UnsupportedProvider(other.to_string())),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
        }
    }
}

/// A session handle bound to one backend.
///
/// Cloning is cheap; clones share the underlying pool.
#[derive(Debug, Clone)]
pub struct DataConnection {
    pool: SqlitePool,
    provider: DataProvider,
}

impl DataConnection {
    #[must_use]
    pub fn new(pool: SqlitePool, provider: DataProvider) -> Self {
        Self { pool, provider }
    }

    /// Get a reference to the underlying pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    #[must_use]
    pub fn provider(&self) -> DataProvider {
        self.provider
    }

    /// Begin a transaction.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, DbError> {
        self.pool.begin().await.map_err(DbError::ConnectionFailed)
    }

    /// Create the table of `E` if it does not exist.
    pub async fn create_table<E: Entity>(&self) -> Result<(), DbError> {
        let table = E::table();
        tracing::debug!(table = table.name(), "Creating table");
        sqlx::query(&table.create_sql()).execute(&self.pool).await?;
        Ok(())
    }

    /// Drop the table of `E` if it exists.
    pub async fn drop_table<E: Entity>(&self) -> Result<(), DbError> {
        let table = E::table();
        tracing::debug!(table = table.name(), "Dropping table");
        sqlx::query(&table.drop_sql()).execute(&self.pool).await?;
        Ok(())
    }
}

/// Supplies database sessions to the stores.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    /// Returns a session for the configured backend.
    async fn connection(&self) -> Result<DataConnection, DbError>;
}

/// Connection factory driven by a [`StoreConfig`].
///
/// The pool is created on first use and shared by every session afterwards.
///
/// # Example
///
/// ```rust,ignore
/// use idstore_db::{ConnectionFactory, DefaultConnectionFactory, StoreConfig};
///
/// let factory = DefaultConnectionFactory::new(StoreConfig::in_memory());
/// let conn = factory.connection().await?;
/// ```
pub struct DefaultConnectionFactory {
    config: StoreConfig,
    pool: OnceCell<SqlitePool>,
}

impl DefaultConnectionFactory {
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            pool: OnceCell::new(),
        }
    }

    /// Build a factory from `IDSTORE_*` environment variables.
    pub fn from_env() -> Result<Self, DbError> {
        Ok(Self::new(StoreConfig::from_env()?))
    }

    /// Wrap an existing pool.
    #[must_use]
    pub fn from_pool(config: StoreConfig, pool: SqlitePool) -> Self {
        Self {
            config,
            pool: OnceCell::new_with(Some(pool)),
        }
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    async fn connect(&self) -> Result<SqlitePool, DbError> {
        let options = match self.config.data_provider {
            DataProvider::Sqlite => SqliteConnectOptions::from_str(&self.config.connection_string)
                .map_err(DbError::ConnectionFailed)?
                .create_if_missing(true)
                .foreign_keys(true),
        };

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(self.config.max_connections)
            .acquire_timeout(self.config.connect_timeout());

        // An in-memory database lives only as long as its connection.
        if self.config.is_in_memory() {
            pool_options = pool_options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(DbError::ConnectionFailed)?;

        tracing::info!(
            provider = self.config.data_provider.name(),
            max_connections = self.config.max_connections,
            "Database connection pool established"
        );
        Ok(pool)
    }
}

#[async_trait]
impl ConnectionFactory for DefaultConnectionFactory {
    async fn connection(&self) -> Result<DataConnection, DbError> {
        let pool = self.pool.get_or_try_init(|| self.connect()).await?;
        Ok(DataConnection::new(pool.clone(), self.config.data_provider))
    }
}
