//! Error types for the idstore-db crate.
//!
//! [`DbError`] wraps `SQLx` and configuration failures of the data layer.
//! [`StoreError`] is what store operations return for non-recoverable
//! conditions. Recoverable conditions (concurrency conflicts, duplicate names)
//! are reported as failed `IdentityResult`s instead.

use crate::config::ConfigError;
use thiserror::Error;

/// Data layer errors.
///
/// # Example
///
/// ```rust
/// use idstore_db::DbError;
///
/// fn handle_error(err: DbError) {
///     match err {
///         DbError::ConnectionFailed(e) => eprintln!("Cannot connect: {}", e),
///         DbError::QueryFailed(e) => eprintln!("Query error: {}", e),
///         DbError::UnsupportedProvider(name) => eprintln!("Unknown provider: {}", name),
///         DbError::Config(e) => eprintln!("Bad configuration: {}", e),
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum DbError {
    /// Failed to establish or acquire a database connection.
    #[error("Database connection failed: {0}")]
    ConnectionFailed(#[source] sqlx::Error),

    /// A query failed to execute.
    ///
    /// Unique constraint violations also surface here; stores translate them
    /// into failed results before they reach callers.
    #[error("Query failed: {0}")]
    QueryFailed(#[source] sqlx::Error),

    /// The configured data provider is not supported by this build.
    #[error("Unsupported data provider: {0}")]
    UnsupportedProvider(String),

    /// Store configuration is invalid.
    #[error("Invalid store configuration: {0}")]
    Config(#[from] ConfigError),
}

impl DbError {
    /// Check if this error indicates a connection problem.
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, DbError::ConnectionFailed(_))
    }

    /// Check if this error indicates a query problem.
    #[must_use]
    pub fn is_query_error(&self) -> bool {
        matches!(self, DbError::QueryFailed(_))
    }

    /// Check if this error is a unique constraint violation.
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DbError::QueryFailed(sqlx::Error::Database(e)) => e.is_unique_violation(),
            _ => false,
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        DbError::QueryFailed(err)
    }
}

/// Errors raised by store operations.
///
/// These indicate caller mistakes or infrastructure faults and are never
/// retried by the stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store was disposed before the call.
    #[error("Cannot access a disposed object: {object}")]
    Disposed {
        /// The store type name.
        object: &'static str,
    },

    /// A required argument was empty.
    #[error("Value cannot be empty (parameter '{param}')")]
    MissingArgument {
        /// The offending parameter.
        param: &'static str,
    },

    /// An argument was present but not acceptable.
    #[error("{message} (parameter '{param}')")]
    InvalidArgument {
        /// The offending parameter.
        param: &'static str,
        /// Why it was rejected.
        message: String,
    },

    /// The operation is not valid for the current data (e.g. unknown role).
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// The data layer failed.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl StoreError {
    /// Check if this error indicates use after disposal.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        matches!(self, StoreError::Disposed { .. })
    }

    /// Check if this error is an argument error, returning the parameter name.
    #[must_use]
    pub fn argument_name(&self) -> Option<&'static str> {
        match self {
            StoreError::MissingArgument { param } | StoreError::InvalidArgument { param, .. } => {
                Some(*param)
            }
            _ => None,
        }
    }

    /// Check if this error indicates an invalid operation.
    #[must_use]
    pub fn is_invalid_operation(&self) -> bool {
        matches!(self, StoreError::InvalidOperation(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Db(DbError::QueryFailed(err))
    }
}

/// Convenience Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_disposed() {
        let err = StoreError::Disposed {
            object: "SqlUserStore",
        };
        assert_eq!(
            err.to_string(),
            "Cannot access a disposed object: SqlUserStore"
        );
        assert!(err.is_disposed());
        assert!(err.argument_name().is_none());
    }

    #[test]
    fn test_argument_name() {
        let err = StoreError::MissingArgument {
            param: "login_provider",
        };
        assert_eq!(err.argument_name(), Some("login_provider"));

        let err = StoreError::InvalidArgument {
            param: "normalized_role_name",
            message: "Value cannot be null or empty.".to_string(),
        };
        assert_eq!(err.argument_name(), Some("normalized_role_name"));
        assert_eq!(
            err.to_string(),
            "Value cannot be null or empty. (parameter 'normalized_role_name')"
        );
    }

    #[test]
    fn test_unsupported_provider_predicates() {
        let err = DbError::UnsupportedProvider("oracle".to_string());
        assert!(!err.is_connection_error());
        assert!(!err.is_query_error());
        assert!(!err.is_unique_violation());
        assert_eq!(err.to_string(), "Unsupported data provider: oracle");
    }

    #[test]
    fn test_sqlx_error_converts_to_query_failed() {
        let err: StoreError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, StoreError::Db(DbError::QueryFailed(_))));
        assert!(!err.is_invalid_operation());
    }
}
