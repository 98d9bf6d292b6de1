//! User role entity model.
//!
//! Links a user to a role. The pair `(user_id, role_id)` is the primary key;
//! the link has no identity of its own.

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use super::tables;
use crate::key::IdentityKey;
use crate::mapping::{Entity, SqliteQuery, Table};

/// A role membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityUserRole<K> {
    pub user_id: K,
    pub role_id: K,
}

impl<'r, K: IdentityKey> FromRow<'r, SqliteRow> for IdentityUserRole<K> {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            user_id: row.try_get("user_id")?,
            role_id: row.try_get("role_id")?,
        })
    }
}

impl<K: IdentityKey> Entity for IdentityUserRole<K> {
    fn table() -> Table {
        Table::new(tables::USER_ROLES)
            .column("user_id", K::SQL_TYPE)
            .references(tables::USERS, "id")
            .column("role_id", K::SQL_TYPE)
            .references(tables::ROLES, "id")
            .primary_key(&["user_id", "role_id"])
    }

    fn bind_columns<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query.bind(self.user_id.clone()).bind(self.role_id.clone())
    }
}

/// A role membership row type a store can persist.
pub trait UserRoleEntity: Entity {
    type Key: IdentityKey;

    fn new_link(user_id: Self::Key, role_id: Self::Key) -> Self;

    fn user_id(&self) -> &Self::Key;

    fn role_id(&self) -> &Self::Key;
}

impl<K: IdentityKey> UserRoleEntity for IdentityUserRole<K> {
    type Key = K;

    fn new_link(user_id: K, role_id: K) -> Self {
        Self { user_id, role_id }
    }

    fn user_id(&self) -> &K {
        &self.user_id
    }

    fn role_id(&self) -> &K {
        &self.role_id
    }
}
