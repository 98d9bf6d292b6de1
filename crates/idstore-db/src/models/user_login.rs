//! User login entity model.
//!
//! Associates an external login `(login_provider, provider_key)` with a user.

use idstore_core::UserLoginInfo;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use super::tables;
use crate::key::IdentityKey;
use crate::mapping::{Entity, SqliteQuery, Table};

/// An external login linked to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityUserLogin<K> {
    pub login_provider: String,
    pub provider_key: String,
    pub provider_display_name: Option<String>,
    pub user_id: K,
}

impl<'r, K: IdentityKey> FromRow<'r, SqliteRow> for IdentityUserLogin<K> {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            login_provider: row.try_get("login_provider")?,
            provider_key: row.try_get("provider_key")?,
            provider_display_name: row.try_get("provider_display_name")?,
            user_id: row.try_get("user_id")?,
        })
    }
}

impl<K: IdentityKey> Entity for IdentityUserLogin<K> {
    fn table() -> Table {
        Table::new(tables::USER_LOGINS)
            .column("login_provider", "TEXT")
            .column("provider_key", "TEXT")
            .nullable("provider_display_name", "TEXT")
            .column("user_id", K::SQL_TYPE)
            .references(tables::USERS, "id")
            .primary_key(&["login_provider", "provider_key"])
    }

    fn bind_columns<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.login_provider.clone())
            .bind(self.provider_key.clone())
            .bind(self.provider_display_name.clone())
            .bind(self.user_id.clone())
    }
}

/// An external login row type a store can persist.
pub trait UserLoginEntity: Entity {
    type Key: IdentityKey;

    fn new_for_user(user_id: Self::Key, login: &UserLoginInfo) -> Self;

    fn user_id(&self) -> &Self::Key;

    fn login_info(&self) -> UserLoginInfo;
}

impl<K: IdentityKey> UserLoginEntity for IdentityUserLogin<K> {
    type Key = K;

    fn new_for_user(user_id: K, login: &UserLoginInfo) -> Self {
        Self {
            login_provider: login.login_provider.clone(),
            provider_key: login.provider_key.clone(),
            provider_display_name: login.provider_display_name.clone(),
            user_id,
        }
    }

    fn user_id(&self) -> &K {
        &self.user_id
    }

    fn login_info(&self) -> UserLoginInfo {
        UserLoginInfo::new(
            self.login_provider.clone(),
            self.provider_key.clone(),
            self.provider_display_name.clone(),
        )
    }
}
