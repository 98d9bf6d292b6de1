//! User token entity model.
//!
//! Opaque per-provider tokens (e.g. authenticator keys, recovery codes),
//! keyed by `(user_id, login_provider, name)`.

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use super::tables;
use crate::key::IdentityKey;
use crate::mapping::{Entity, SqliteQuery, Table};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityUserToken<K> {
    pub user_id: K,
    pub login_provider: String,
    pub name: String,
    pub value: Option<String>,
}

impl<'r, K: IdentityKey> FromRow<'r, SqliteRow> for IdentityUserToken<K> {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            user_id: row.try_get("user_id")?,
            login_provider: row.try_get("login_provider")?,
            name: row.try_get("name")?,
            value: row.try_get("value")?,
        })
    }
}

impl<K: IdentityKey> Entity for IdentityUserToken<K> {
    fn table() -> Table {
        Table::new(tables::USER_TOKENS)
            .column("user_id", K::SQL_TYPE)
            .references(tables::USERS, "id")
            .column("login_provider", "TEXT")
            .column("name", "TEXT")
            .nullable("value", "TEXT")
            .primary_key(&["user_id", "login_provider", "name"])
    }

    fn bind_columns<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.user_id.clone())
            .bind(self.login_provider.clone())
            .bind(self.name.clone())
            .bind(self.value.clone())
    }
}

/// A token row type a store can persist.
pub trait UserTokenEntity: Entity {
    type Key: IdentityKey;

    fn new_for_user(
        user_id: Self::Key,
        login_provider: &str,
        name: &str,
        value: Option<&str>,
    ) -> Self;

    fn value(&self) -> Option<&str>;

    fn set_value(&mut self, value: Option<&str>);
}

impl<K: IdentityKey> UserTokenEntity for IdentityUserToken<K> {
    type Key = K;

    fn new_for_user(user_id: K, login_provider: &str, name: &str, value: Option<&str>) -> Self {
        Self {
            user_id,
            login_provider: login_provider.to_string(),
            name: name.to_string(),
            value: value.map(str::to_string),
        }
    }

    fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    fn set_value(&mut self, value: Option<&str>) {
        self.value = value.map(str::to_string);
    }
}
