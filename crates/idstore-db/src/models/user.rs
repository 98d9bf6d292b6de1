//! User entity model.
//!
//! Represents a user account and the attributes the identity manager reads
//! and writes through the store.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use super::tables;
use crate::key::{new_stamp, IdentityKey};
use crate::mapping::{Entity, SqliteQuery, Table};

/// A user account.
///
/// `normalized_user_name` is unique within the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityUser<K> {
    /// Unique identifier for the user.
    pub id: K,

    pub user_name: Option<String>,

    /// Canonical form of `user_name`, used for lookups.
    pub normalized_user_name: Option<String>,

    pub email: Option<String>,

    /// Canonical form of `email`, used for lookups.
    pub normalized_email: Option<String>,

    /// Whether the email address has been confirmed.
    pub email_confirmed: bool,

    /// Salted and hashed password, produced by the identity manager.
    pub password_hash: Option<String>,

    /// Changes whenever credentials change; invalidates issued sessions.
    pub security_stamp: Option<String>,

    pub phone_number: Option<String>,

    pub phone_number_confirmed: bool,

    pub two_factor_enabled: bool,

    /// When the lockout ends; a past value means not locked.
    pub lockout_end: Option<DateTime<Utc>>,

    /// Whether the user can be locked out.
    pub lockout_enabled: bool,

    /// Consecutive failed access attempts.
    pub access_failed_count: i32,

    /// Optimistic concurrency token; regenerated on every successful write.
    pub concurrency_stamp: Option<String>,
}

impl<K: IdentityKey> IdentityUser<K> {
    /// Creates a user with fresh security and concurrency stamps.
    pub fn new(id: K, user_name: impl Into<String>) -> Self {
        Self {
            id,
            user_name: Some(user_name.into()),
            normalized_user_name: None,
            email: None,
            normalized_email: None,
            email_confirmed: false,
            password_hash: None,
            security_stamp: Some(new_stamp()),
            phone_number: None,
            phone_number_confirmed: false,
            two_factor_enabled: false,
            lockout_end: None,
            lockout_enabled: false,
            access_failed_count: 0,
            concurrency_stamp: Some(new_stamp()),
        }
    }

    /// Check if the user is currently locked out.
    #[must_use]
    pub fn is_locked_out(&self) -> bool {
        self.lockout_enabled && self.lockout_end.is_some_and(|end| end > Utc::now())
    }
}

impl IdentityUser<String> {
    /// Creates a user whose id is a new random UUID string.
    pub fn named(user_name: impl Into<String>) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), user_name)
    }
}

impl IdentityUser<uuid::Uuid> {
    /// Creates a user with a new random UUID id.
    pub fn named(user_name: impl Into<String>) -> Self {
        Self::new(uuid::Uuid::new_v4(), user_name)
    }
}

impl<'r, K: IdentityKey> FromRow<'r, SqliteRow> for IdentityUser<K> {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_name: row.try_get("user_name")?,
            normalized_user_name: row.try_get("normalized_user_name")?,
            email: row.try_get("email")?,
            normalized_email: row.try_get("normalized_email")?,
            email_confirmed: row.try_get("email_confirmed")?,
            password_hash: row.try_get("password_hash")?,
            security_stamp: row.try_get("security_stamp")?,
            phone_number: row.try_get("phone_number")?,
            phone_number_confirmed: row.try_get("phone_number_confirmed")?,
            two_factor_enabled: row.try_get("two_factor_enabled")?,
            lockout_end: row.try_get("lockout_end")?,
            lockout_enabled: row.try_get("lockout_enabled")?,
            access_failed_count: row.try_get("access_failed_count")?,
            concurrency_stamp: row.try_get("concurrency_stamp")?,
        })
    }
}

impl<K: IdentityKey> Entity for IdentityUser<K> {
    fn table() -> Table {
        Table::new(tables::USERS)
            .column("id", K::SQL_TYPE)
            .nullable("user_name", "TEXT")
            .nullable("normalized_user_name", "TEXT")
            .nullable("email", "TEXT")
            .nullable("normalized_email", "TEXT")
            .column("email_confirmed", "BOOLEAN")
            .nullable("password_hash", "TEXT")
            .nullable("security_stamp", "TEXT")
            .nullable("phone_number", "TEXT")
            .column("phone_number_confirmed", "BOOLEAN")
            .column("two_factor_enabled", "BOOLEAN")
            .nullable("lockout_end", "TEXT")
            .column("lockout_enabled", "BOOLEAN")
            .column("access_failed_count", "INTEGER")
            .nullable("concurrency_stamp", "TEXT")
            .primary_key(&["id"])
            .unique(&["normalized_user_name"])
    }

    fn bind_columns<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.id.clone())
            .bind(self.user_name.clone())
            .bind(self.normalized_user_name.clone())
            .bind(self.email.clone())
            .bind(self.normalized_email.clone())
            .bind(self.email_confirmed)
            .bind(self.password_hash.clone())
            .bind(self.security_stamp.clone())
            .bind(self.phone_number.clone())
            .bind(self.phone_number_confirmed)
            .bind(self.two_factor_enabled)
            .bind(self.lockout_end)
            .bind(self.lockout_enabled)
            .bind(self.access_failed_count)
            .bind(self.concurrency_stamp.clone())
    }
}

/// A user row type a store can persist.
///
/// Custom user types embed an [`IdentityUser`] and expose it here; extra
/// columns go through their own [`Entity`] implementation.
pub trait UserEntity: Entity {
    type Key: IdentityKey;

    fn user(&self) -> &IdentityUser<Self::Key>;

    fn user_mut(&mut self) -> &mut IdentityUser<Self::Key>;
}

impl<K: IdentityKey> UserEntity for IdentityUser<K> {
    type Key = K;

    fn user(&self) -> &IdentityUser<K> {
        self
    }

    fn user_mut(&mut self) -> &mut IdentityUser<K> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_new_assigns_stamps() {
        let a = IdentityUser::new(1_i64, "alice");
        let b = IdentityUser::new(2_i64, "bob");
        assert_eq!(a.user_name.as_deref(), Some("alice"));
        assert!(a.concurrency_stamp.is_some());
        assert!(a.security_stamp.is_some());
        assert_ne!(a.concurrency_stamp, b.concurrency_stamp);
        assert_eq!(a.access_failed_count, 0);
    }

    #[test]
    fn test_named_generates_distinct_ids() {
        let a = IdentityUser::<String>::named("alice");
        let b = IdentityUser::<String>::named("alice");
        assert_ne!(a.id, b.id);
        assert!(uuid::Uuid::parse_str(&a.id).is_ok());
    }

    #[test]
    fn test_is_locked_out() {
        let mut user = IdentityUser::new(1_i32, "locked");
        assert!(!user.is_locked_out());

        user.lockout_end = Some(Utc::now() + Duration::minutes(5));
        assert!(!user.is_locked_out(), "lockout disabled");

        user.lockout_enabled = true;
        assert!(user.is_locked_out());

        user.lockout_end = Some(Utc::now() - Duration::minutes(5));
        assert!(!user.is_locked_out());
    }

    #[test]
    fn test_table_binds_every_column() {
        let table = IdentityUser::<String>::table();
        assert_eq!(table.name(), "users");
        assert_eq!(table.insert_columns().count(), 15);
        assert!(table
            .create_sql()
            .contains("UNIQUE (normalized_user_name)"));
    }
}
