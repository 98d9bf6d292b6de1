//! Role store over a [`ConnectionFactory`].

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use idstore_core::{Claim, DefaultErrorDescriber, ErrorDescriber, IdentityResult};

use super::factory::{DefaultEntityFactory, RoleEntityFactory};
use super::{require, RoleClaimStore, RoleStore};
use crate::connection::{ConnectionFactory, DataConnection};
use crate::error::{DbError, StoreError, StoreResult};
use crate::key::{new_stamp, IdentityKey};
use crate::models::{RoleClaimEntity, RoleEntity};

const BY_ID_AND_STAMP: &str = "id = ? AND concurrency_stamp IS ?";

/// Persists roles of type `R` and their claims of type `RC`.
pub struct SqlRoleStore<K, R, RC>
where
    K: IdentityKey,
    RC: RoleClaimEntity<Key = K>,
{
    connections: Arc<dyn ConnectionFactory>,
    describer: Arc<dyn ErrorDescriber>,
    entities: Arc<dyn RoleEntityFactory<K, RC>>,
    disposed: AtomicBool,
    _marker: PhantomData<fn() -> R>,
}

impl<K, R, RC> SqlRoleStore<K, R, RC>
where
    K: IdentityKey,
    R: RoleEntity<Key = K>,
    RC: RoleClaimEntity<Key = K>,
{
    pub fn new(connections: Arc<dyn ConnectionFactory>) -> Self {
        Self {
            connections,
            describer: Arc::new(DefaultErrorDescriber),
            entities: Arc::new(DefaultEntityFactory),
            disposed: AtomicBool::new(false),
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn with_describer(mut self, describer: Arc<dyn ErrorDescriber>) -> Self {
        self.describer = describer;
        self
    }

    #[must_use]
    pub fn with_entity_factory(mut self, entities: Arc<dyn RoleEntityFactory<K, RC>>) -> Self {
        self.entities = entities;
        self
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    async fn connection(&self) -> StoreResult<DataConnection> {
        Ok(self.connections.connection().await?)
    }

    fn write_failure(&self, role: &R, err: DbError) -> StoreResult<IdentityResult> {
        if err.is_unique_violation() {
            let name = role.role().name.as_deref().unwrap_or_default();
            tracing::warn!(role_name = name, "Role name already taken");
            return Ok(IdentityResult::failed([self
                .describer
                .duplicate_role_name(name)]));
        }
        Err(err.into())
    }

    fn concurrency_failure(&self, role: &R) -> IdentityResult {
        tracing::warn!(role_id = ?role.role().id, "Concurrency stamp mismatch");
        IdentityResult::failed([self.describer.concurrency_failure()])
    }
}

#[async_trait]
impl<K, R, RC> RoleStore<R> for SqlRoleStore<K, R, RC>
where
    K: IdentityKey,
    R: RoleEntity<Key = K>,
    RC: RoleClaimEntity<Key = K>,
{
    async fn create(&self, role: &R) -> StoreResult<IdentityResult> {
        self.check_disposed()?;
        let conn = self.connection().await?;

        let sql = R::table().insert_sql();
        match role
            .bind_columns(sqlx::query(&sql))
            .execute(conn.pool())
            .await
        {
            Ok(_) => {
                tracing::debug!(role_id = ?role.role().id, "Role created");
                Ok(IdentityResult::success())
            }
            Err(err) => self.write_failure(role, err.into()),
        }
    }

    async fn update(&self, role: &mut R) -> StoreResult<IdentityResult> {
        self.check_disposed()?;
        let conn = self.connection().await?;

        let expected = role.role().concurrency_stamp.clone();
        let mut updated = role.clone();
        updated.role_mut().concurrency_stamp = Some(new_stamp());

        let sql = R::table().update_sql(BY_ID_AND_STAMP);
        let outcome = updated
            .bind_columns(sqlx::query(&sql))
            .bind(role.role().id.clone())
            .bind(expected)
            .execute(conn.pool())
            .await;

        match outcome {
            Ok(done) if done.rows_affected() == 0 => Ok(self.concurrency_failure(role)),
            Ok(_) => {
                *role = updated;
                Ok(IdentityResult::success())
            }
            Err(err) => self.write_failure(role, err.into()),
        }
    }

    async fn delete(&self, role: &R) -> StoreResult<IdentityResult> {
        self.check_disposed()?;
        let conn = self.connection().await?;

        let sql = R::table().delete_sql(BY_ID_AND_STAMP);
        let done = sqlx::query(&sql)
            .bind(role.role().id.clone())
            .bind(role.role().concurrency_stamp.clone())
            .execute(conn.pool())
            .await?;

        if done.rows_affected() == 0 {
            return Ok(self.concurrency_failure(role));
        }
        tracing::debug!(role_id = ?role.role().id, "Role deleted");
        Ok(IdentityResult::success())
    }

    async fn find_by_id(&self, role_id: &K) -> StoreResult<Option<R>> {
        self.check_disposed()?;
        let conn = self.connection().await?;

        let sql = R::table().select_sql("id = ?");
        Ok(sqlx::query_as::<_, R>(&sql)
            .bind(role_id.clone())
            .fetch_optional(conn.pool())
            .await?)
    }

    async fn find_by_name(&self, normalized_role_name: &str) -> StoreResult<Option<R>> {
        self.check_disposed()?;
        require(normalized_role_name, "normalized_role_name")?;
        let conn = self.connection().await?;

        let sql = R::table().select_sql("normalized_name = ?");
        Ok(sqlx::query_as::<_, R>(&sql)
            .bind(normalized_role_name)
            .fetch_optional(conn.pool())
            .await?)
    }

    fn check_disposed(&self) -> StoreResult<()> {
        if self.is_disposed() {
            return Err(StoreError::Disposed {
                object: "SqlRoleStore",
            });
        }
        Ok(())
    }

    fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            tracing::debug!("Role store disposed");
        }
    }
}

#[async_trait]
impl<K, R, RC> RoleClaimStore<R> for SqlRoleStore<K, R, RC>
where
    K: IdentityKey,
    R: RoleEntity<Key = K>,
    RC: RoleClaimEntity<Key = K>,
{
    async fn get_claims(&self, role: &R) -> StoreResult<Vec<Claim>> {
        self.check_disposed()?;
        let conn = self.connection().await?;

        let sql = RC::table().select_sql("role_id = ?");
        let rows = sqlx::query_as::<_, RC>(&sql)
            .bind(role.role().id.clone())
            .fetch_all(conn.pool())
            .await?;
        Ok(rows.iter().map(RoleClaimEntity::to_claim).collect())
    }

    async fn add_claim(&self, role: &R, claim: &Claim) -> StoreResult<()> {
        self.check_disposed()?;
        require(&claim.claim_type, "claim")?;
        let conn = self.connection().await?;

        let row = self.entities.create_role_claim(&role.role().id, claim);
        let sql = RC::table().insert_sql();
        row.bind_columns(sqlx::query(&sql))
            .execute(conn.pool())
            .await?;
        Ok(())
    }

    async fn remove_claim(&self, role: &R, claim: &Claim) -> StoreResult<()> {
        self.check_disposed()?;
        require(&claim.claim_type, "claim")?;
        let conn = self.connection().await?;

        let table = RC::table();
        let select = table.select_sql("role_id = ?");
        let delete = table.delete_sql("id = ?");

        let mut tx = conn.begin().await?;
        let rows = sqlx::query_as::<_, RC>(&select)
            .bind(role.role().id.clone())
            .fetch_all(&mut *tx)
            .await?;
        for row in rows.iter().filter(|row| row.matches(claim)) {
            sqlx::query(&delete)
                .bind(row.row_id())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
