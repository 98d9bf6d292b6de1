//! User claim entity model.
//!
//! Claims asserted about a user, one row per claim.

use idstore_core::Claim;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use super::tables;
use crate::key::IdentityKey;
use crate::mapping::{Entity, SqliteQuery, Table};

/// A claim owned by a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityUserClaim<K> {
    /// Database-assigned row id (0 until persisted).
    pub id: i64,
    pub user_id: K,
    pub claim_type: String,
    pub claim_value: String,
}

impl<'r, K: IdentityKey> FromRow<'r, SqliteRow> for IdentityUserClaim<K> {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            claim_type: row.try_get("claim_type")?,
            claim_value: row.try_get("claim_value")?,
        })
    }
}

impl<K: IdentityKey> Entity for IdentityUserClaim<K> {
    fn table() -> Table {
        Table::new(tables::USER_CLAIMS)
            .auto_id("id")
            .column("user_id", K::SQL_TYPE)
            .references(tables::USERS, "id")
            .column("claim_type", "TEXT")
            .column("claim_value", "TEXT")
    }

    fn bind_columns<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.user_id.clone())
            .bind(self.claim_type.clone())
            .bind(self.claim_value.clone())
    }
}

/// A user claim row type a store can persist.
pub trait UserClaimEntity: Entity {
    type Key: IdentityKey;

    /// Builds an unsaved row for `claim` owned by `user_id`.
    fn new_for_user(user_id: Self::Key, claim: &Claim) -> Self;

    /// Database-assigned row id.
    fn row_id(&self) -> i64;

    fn user_id(&self) -> &Self::Key;

    fn to_claim(&self) -> Claim;

    /// Overwrites the claim fields with those of `claim`.
    fn init_from_claim(&mut self, claim: &Claim);

    /// Whether this row stores `claim`. Type and value only by default.
    fn matches(&self, claim: &Claim) -> bool {
        self.to_claim().same_type_and_value(claim)
    }
}

impl<K: IdentityKey> UserClaimEntity for IdentityUserClaim<K> {
    type Key = K;

    fn new_for_user(user_id: K, claim: &Claim) -> Self {
        Self {
            id: 0,
            user_id,
            claim_type: claim.claim_type.clone(),
            claim_value: claim.value.clone(),
        }
    }

    fn row_id(&self) -> i64 {
        self.id
    }

    fn user_id(&self) -> &K {
        &self.user_id
    }

    fn to_claim(&self) -> Claim {
        Claim::new(self.claim_type.clone(), self.claim_value.clone())
    }

    fn init_from_claim(&mut self, claim: &Claim) {
        self.claim_type = claim.claim_type.clone();
        self.claim_value = claim.value.clone();
    }
}
