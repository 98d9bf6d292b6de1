//! Role claim entity model.

use idstore_core::Claim;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use super::tables;
use crate::key::IdentityKey;
use crate::mapping::{Entity, SqliteQuery, Table};

/// A claim granted to every member of a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRoleClaim<K> {
    /// Database-assigned row id (0 until persisted).
    pub id: i64,
    pub role_id: K,
    pub claim_type: String,
    pub claim_value: String,
}

impl<'r, K: IdentityKey> FromRow<'r, SqliteRow> for IdentityRoleClaim<K> {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            role_id: row.try_get("role_id")?,
            claim_type: row.try_get("claim_type")?,
            claim_value: row.try_get("claim_value")?,
        })
    }
}

impl<K: IdentityKey> Entity for IdentityRoleClaim<K> {
    fn table() -> Table {
        Table::new(tables::ROLE_CLAIMS)
            .auto_id("id")
            .column("role_id", K::SQL_TYPE)
            .references(tables::ROLES, "id")
            .column("claim_type", "TEXT")
            .column("claim_value", "TEXT")
    }

    fn bind_columns<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.role_id.clone())
            .bind(self.claim_type.clone())
            .bind(self.claim_value.clone())
    }
}

/// A role claim row type a store can persist.
pub trait RoleClaimEntity: Entity {
    type Key: IdentityKey;

    fn new_for_role(role_id: Self::Key, claim: &Claim) -> Self;

    fn row_id(&self) -> i64;

    fn role_id(&self) -> &Self::Key;

    fn to_claim(&self) -> Claim;

    fn init_from_claim(&mut self, claim: &Claim);

    fn matches(&self, claim: &Claim) -> bool {
        self.to_claim().same_type_and_value(claim)
    }
}

impl<K: IdentityKey> RoleClaimEntity for IdentityRoleClaim<K> {
    type Key = K;

    fn new_for_role(role_id: K, claim: &Claim) -> Self {
        Self {
            id: 0,
            role_id,
            claim_type: claim.claim_type.clone(),
            claim_value: claim.value.clone(),
        }
    }

    fn row_id(&self) -> i64 {
        self.id
    }

    fn role_id(&self) -> &K {
        &self.role_id
    }

    fn to_claim(&self) -> Claim {
        Claim::new(self.claim_type.clone(), self.claim_value.clone())
    }

    fn init_from_claim(&mut self, claim: &Claim) {
        self.claim_type = claim.claim_type.clone();
        self.claim_value = claim.value.clone();
    }
}
