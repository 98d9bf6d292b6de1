//! Role entity model.

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use super::tables;
use crate::key::{new_stamp, IdentityKey};
use crate::mapping::{Entity, SqliteQuery, Table};

/// A named role users can be members of.
///
/// `normalized_name` is unique within the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRole<K> {
    pub id: K,
    pub name: Option<String>,
    /// Canonical form of `name`, used for lookups.
    pub normalized_name: Option<String>,
    /// Optimistic concurrency token; regenerated on every successful write.
    pub concurrency_stamp: Option<String>,
}

impl<K: IdentityKey> IdentityRole<K> {
    pub fn new(id: K, name: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
            normalized_name: None,
            concurrency_stamp: Some(new_stamp()),
        }
    }
}

impl IdentityRole<String> {
    /// Creates a role whose id is a new random UUID string.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), name)
    }
}

impl IdentityRole<uuid::Uuid> {
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(uuid::Uuid::new_v4(), name)
    }
}

impl<'r, K: IdentityKey> FromRow<'r, SqliteRow> for IdentityRole<K> {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            normalized_name: row.try_get("normalized_name")?,
            concurrency_stamp: row.try_get("concurrency_stamp")?,
        })
    }
}

impl<K: IdentityKey> Entity for IdentityRole<K> {
    fn table() -> Table {
        Table::new(tables::ROLES)
            .column("id", K::SQL_TYPE)
            .nullable("name", "TEXT")
            .nullable("normalized_name", "TEXT")
            .nullable("concurrency_stamp", "TEXT")
            .primary_key(&["id"])
            .unique(&["normalized_name"])
    }

    fn bind_columns<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.id.clone())
            .bind(self.name.clone())
            .bind(self.normalized_name.clone())
            .bind(self.concurrency_stamp.clone())
    }
}

/// A role row type a store can persist.
pub trait RoleEntity: Entity {
    type Key: IdentityKey;

    fn role(&self) -> &IdentityRole<Self::Key>;

    fn role_mut(&mut self) -> &mut IdentityRole<Self::Key>;
}

impl<K: IdentityKey> RoleEntity for IdentityRole<K> {
    type Key = K;

    fn role(&self) -> &IdentityRole<K> {
        self
    }

    fn role_mut(&mut self) -> &mut IdentityRole<K> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_role() {
        let role = IdentityRole::new(7_i64, "admin");
        assert_eq!(role.id, 7);
        assert_eq!(role.name.as_deref(), Some("admin"));
        assert!(role.normalized_name.is_none());
        assert!(role.concurrency_stamp.is_some());
    }

    #[test]
    fn test_table() {
        let sql = IdentityRole::<uuid::Uuid>::table().create_sql();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS roles (id BLOB NOT NULL"));
        assert!(sql.contains("UNIQUE (normalized_name)"));
    }
}
