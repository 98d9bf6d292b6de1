//! User store over a [`ConnectionFactory`].
//!
//! Updates and deletes are conditional writes on `(id, concurrency_stamp)`:
//! when another writer got there first no row matches, and the caller gets a
//! `ConcurrencyFailure` result instead of silently overwriting.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use idstore_core::{Claim, DefaultErrorDescriber, ErrorDescriber, IdentityResult, UserLoginInfo};

use super::factory::{DefaultEntityFactory, UserEntityFactory};
use super::{
    require, UserAttributeStore, UserAuthenticationTokenStore, UserClaimStore, UserLoginStore,
    UserRoleStore, UserStore,
};
use crate::connection::{ConnectionFactory, DataConnection};
use crate::error::{DbError, StoreError, StoreResult};
use crate::key::{new_stamp, IdentityKey};
use crate::models::{
    RoleEntity, UserClaimEntity, UserEntity, UserLoginEntity, UserRoleEntity, UserTokenEntity,
};

const BY_ID_AND_STAMP: &str = "id = ? AND concurrency_stamp IS ?";
const TOKEN_KEY: &str = "user_id = ? AND login_provider = ? AND name = ?";

/// Persists users of type `U` and their associations.
///
/// `R` is the role type membership is resolved against; `UC`, `UR`, `UL` and
/// `UT` are the claim, role-link, login and token row types. All share the
/// key type `K`.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use idstore_db::models::*;
/// use idstore_db::stores::{SqlUserStore, UserStore};
///
/// let store: SqlUserStore<
///     String,
///     IdentityUser<String>,
///     IdentityRole<String>,
///     IdentityUserClaim<String>,
///     IdentityUserRole<String>,
///     IdentityUserLogin<String>,
///     IdentityUserToken<String>,
/// > = SqlUserStore::new(Arc::new(factory));
///
/// let user = IdentityUser::<String>::named("alice");
/// assert!(store.create(&user).await?.succeeded());
/// ```
pub struct SqlUserStore<K, U, R, UC, UR, UL, UT>
where
    K: IdentityKey,
    UC: UserClaimEntity<Key = K>,
    UR: UserRoleEntity<Key = K>,
    UL: UserLoginEntity<Key = K>,
    UT: UserTokenEntity<Key = K>,
{
    connections: Arc<dyn ConnectionFactory>,
    describer: Arc<dyn ErrorDescriber>,
    entities: Arc<dyn UserEntityFactory<K, UC, UR, UL, UT>>,
    disposed: AtomicBool,
    _marker: PhantomData<fn() -> (U, R)>,
}

impl<K, U, R, UC, UR, UL, UT> SqlUserStore<K, U, R, UC, UR, UL, UT>
where
    K: IdentityKey,
    U: UserEntity<Key = K>,
    R: RoleEntity<Key = K>,
    UC: UserClaimEntity<Key = K>,
    UR: UserRoleEntity<Key = K>,
    UL: UserLoginEntity<Key = K>,
    UT: UserTokenEntity<Key = K>,
{
    /// Creates a store with the default error describer and entity factory.
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
    pub fn with_entity_factory(
        mut self,
        entities: Arc<dyn UserEntityFactory<K, UC, UR, UL, UT>>,
    ) -> Self {
        self.entities = entities;
        self
    }

    pub fn describer(&self) -> &dyn ErrorDescriber {
        self.describer.as_ref()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    async fn connection(&self) -> StoreResult<DataConnection> {
        Ok(self.connections.connection().await?)
    }

    /// Translates a failed insert or update into a result where possible.
    fn write_failure(&self, user: &U, err: DbError) -> StoreResult<IdentityResult> {
        if err.is_unique_violation() {
            let name = user.user().user_name.as_deref().unwrap_or_default();
            tracing::warn!(user_name = name, "User name already taken");
            return Ok(IdentityResult::failed([self
                .describer
                .duplicate_user_name(name)]));
        }
        Err(err.into())
    }

    fn concurrency_failure(&self, user: &U) -> IdentityResult {
        tracing::warn!(user_id = ?user.user().id, "Concurrency stamp mismatch");
        IdentityResult::failed([self.describer.concurrency_failure()])
    }

    async fn find_role(
        &self,
        conn: &DataConnection,
        normalized_role_name: &str,
    ) -> StoreResult<Option<R>> {
        let sql = R::table().select_sql("normalized_name = ?");
        Ok(sqlx::query_as::<_, R>(&sql)
            .bind(normalized_role_name)
            .fetch_optional(conn.pool())
            .await?)
    }

    async fn find_user(&self, conn: &DataConnection, user_id: &K) -> StoreResult<Option<U>> {
        let sql = U::table().select_sql("id = ?");
        Ok(sqlx::query_as::<_, U>(&sql)
            .bind(user_id.clone())
            .fetch_optional(conn.pool())
            .await?)
    }
}

fn require_role_name(normalized_role_name: &str) -> StoreResult<()> {
    if normalized_role_name.trim().is_empty() {
        return Err(StoreError::InvalidArgument {
            param: "normalized_role_name",
            message: "Value cannot be null or empty.".to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl<K, U, R, UC, UR, UL, UT> UserStore<U> for SqlUserStore<K, U, R, UC, UR, UL, UT>
where
    K: IdentityKey,
    U: UserEntity<Key = K>,
    R: RoleEntity<Key = K>,
    UC: UserClaimEntity<Key = K>,
    UR: UserRoleEntity<Key = K>,
    UL: UserLoginEntity<Key = K>,
    UT: UserTokenEntity<Key = K>,
{
    async fn create(&self, user: &U) -> StoreResult<IdentityResult> {
        self.check_disposed()?;
        let conn = self.connection().await?;

        let sql = U::table().insert_sql();
        match user
            .bind_columns(sqlx::query(&sql))
            .execute(conn.pool())
            .await
        {
            Ok(_) => {
                tracing::debug!(user_id = ?user.user().id, "User created");
                Ok(IdentityResult::success())
            }
            Err(err) => self.write_failure(user, err.into()),
        }
    }

    async fn update(&self, user: &mut U) -> StoreResult<IdentityResult> {
        self.check_disposed()?;
        let conn = self.connection().await?;

        let expected = user.user().concurrency_stamp.clone();
        let mut updated = user.clone();
        updated.user_mut().concurrency_stamp = Some(new_stamp());

        let sql = U::table().update_sql(BY_ID_AND_STAMP);
        let outcome = updated
            .bind_columns(sqlx::query(&sql))
            .bind(user.user().id.clone())
            .bind(expected)
            .execute(conn.pool())
            .await;

        match outcome {
            Ok(done) if done.rows_affected() == 0 => Ok(self.concurrency_failure(user)),
            Ok(_) => {
                *user = updated;
                tracing::debug!(user_id = ?user.user().id, "User updated");
                Ok(IdentityResult::success())
            }
            Err(err) => self.write_failure(user, err.into()),
        }
    }

    async fn delete(&self, user: &U) -> StoreResult<IdentityResult> {
        self.check_disposed()?;
        let conn = self.connection().await?;

        let sql = U::table().delete_sql(BY_ID_AND_STAMP);
        let done = sqlx::query(&sql)
            .bind(user.user().id.clone())
            .bind(user.user().concurrency_stamp.clone())
            .execute(conn.pool())
            .await?;

        if done.rows_affected() == 0 {
            return Ok(self.concurrency_failure(user));
        }
        tracing::debug!(user_id = ?user.user().id, "User deleted");
        Ok(IdentityResult::success())
    }

    async fn find_by_id(&self, user_id: &K) -> StoreResult<Option<U>> {
        self.check_disposed()?;
        let conn = self.connection().await?;
        self.find_user(&conn, user_id).await
    }

    async fn find_by_name(&self, normalized_user_name: &str) -> StoreResult<Option<U>> {
        self.check_disposed()?;
        require(normalized_user_name, "normalized_user_name")?;
        let conn = self.connection().await?;

        let sql = U::table().select_sql("normalized_user_name = ?");
        Ok(sqlx::query_as::<_, U>(&sql)
            .bind(normalized_user_name)
            .fetch_optional(conn.pool())
            .await?)
    }

    fn check_disposed(&self) -> StoreResult<()> {
        if self.is_disposed() {
            return Err(StoreError::Disposed {
                object: "SqlUserStore",
            });
        }
        Ok(())
    }

    fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            tracing::debug!("User store disposed");
        }
    }
}

#[async_trait]
impl<K, U, R, UC, UR, UL, UT> UserClaimStore<U> for SqlUserStore<K, U, R, UC, UR, UL, UT>
where
    K: IdentityKey,
    U: UserEntity<Key = K>,
    R: RoleEntity<Key = K>,
    UC: UserClaimEntity<Key = K>,
    UR: UserRoleEntity<Key = K>,
    UL: UserLoginEntity<Key = K>,
    UT: UserTokenEntity<Key = K>,
{
    async fn get_claims(&self, user: &U) -> StoreResult<Vec<Claim>> {
        self.check_disposed()?;
        let conn = self.connection().await?;

        let sql = UC::table().select_sql("user_id = ?");
        let rows = sqlx::query_as::<_, UC>(&sql)
            .bind(user.user().id.clone())
            .fetch_all(conn.pool())
            .await?;
        Ok(rows.iter().map(UserClaimEntity::to_claim).collect())
    }

    async fn add_claims(&self, user: &U, claims: &[Claim]) -> StoreResult<()> {
        self.check_disposed()?;
        let conn = self.connection().await?;

        let sql = UC::table().insert_sql();
        let user_id = &user.user().id;
        let mut tx = conn.begin().await?;
        for claim in claims {
            let row = self.entities.create_user_claim(user_id, claim);
            row.bind_columns(sqlx::query(&sql))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        tracing::debug!(user_id = ?user_id, count = claims.len(), "Claims added");
        Ok(())
    }

    async fn replace_claim(&self, user: &U, claim: &Claim, new_claim: &Claim) -> StoreResult<()> {
        self.check_disposed()?;
        require(&claim.claim_type, "claim")?;
        require(&new_claim.claim_type, "new_claim")?;
        let conn = self.connection().await?;

        let table = UC::table();
        let select = table.select_sql("user_id = ?");
        let update = table.update_sql("id = ?");

        let mut tx = conn.begin().await?;
        let rows = sqlx::query_as::<_, UC>(&select)
            .bind(user.user().id.clone())
            .fetch_all(&mut *tx)
            .await?;
        for mut row in rows.into_iter().filter(|row| row.matches(claim)) {
            row.init_from_claim(new_claim);
            let id = row.row_id();
            row.bind_columns(sqlx::query(&update))
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn remove_claims(&self, user: &U, claims: &[Claim]) -> StoreResult<()> {
        self.check_disposed()?;
        let conn = self.connection().await?;

        let table = UC::table();
        let select = table.select_sql("user_id = ?");
        let delete = table.delete_sql("id = ?");

        let mut tx = conn.begin().await?;
        let rows = sqlx::query_as::<_, UC>(&select)
            .bind(user.user().id.clone())
            .fetch_all(&mut *tx)
            .await?;
        let mut removed = 0_u64;
        for row in rows
            .iter()
            .filter(|row| claims.iter().any(|claim| row.matches(claim)))
        {
            removed += sqlx::query(&delete)
                .bind(row.row_id())
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }
        tx.commit().await?;

        tracing::debug!(user_id = ?user.user().id, removed, "Claims removed");
        Ok(())
    }

    async fn get_users_for_claim(&self, claim: &Claim) -> StoreResult<Vec<U>> {
        self.check_disposed()?;
        require(&claim.claim_type, "claim")?;
        let conn = self.connection().await?;

        let sql = UC::table().select_sql("claim_type = ?");
        let rows = sqlx::query_as::<_, UC>(&sql)
            .bind(claim.claim_type.clone())
            .fetch_all(conn.pool())
            .await?;

        let mut user_ids: Vec<K> = Vec::new();
        for row in rows.iter().filter(|row| row.matches(claim)) {
            if !user_ids.contains(row.user_id()) {
                user_ids.push(row.user_id().clone());
            }
        }

        let mut users = Vec::with_capacity(user_ids.len());
        for user_id in &user_ids {
            if let Some(user) = self.find_user(&conn, user_id).await? {
                users.push(user);
            }
        }
        Ok(users)
    }
}

#[async_trait]
impl<K, U, R, UC, UR, UL, UT> UserLoginStore<U> for SqlUserStore<K, U, R, UC, UR, UL, UT>
where
    K: IdentityKey,
    U: UserEntity<Key = K>,
    R: RoleEntity<Key = K>,
    UC: UserClaimEntity<Key = K>,
    UR: UserRoleEntity<Key = K>,
    UL: UserLoginEntity<Key = K>,
    UT: UserTokenEntity<Key = K>,
{
    async fn add_login(&self, user: &U, login: &UserLoginInfo) -> StoreResult<()> {
        self.check_disposed()?;
        require(&login.login_provider, "login_provider")?;
        require(&login.provider_key, "provider_key")?;
        let conn = self.connection().await?;

        let row = self.entities.create_user_login(&user.user().id, login);
        let sql = UL::table().insert_sql();
        row.bind_columns(sqlx::query(&sql))
            .execute(conn.pool())
            .await?;

        tracing::debug!(
            user_id = ?user.user().id,
            login_provider = %login.login_provider,
            "Login added"
        );
        Ok(())
    }

    async fn remove_login(
        &self,
        user: &U,
        login_provider: &str,
        provider_key: &str,
    ) -> StoreResult<()> {
        self.check_disposed()?;
        require(login_provider, "login_provider")?;
        require(provider_key, "provider_key")?;
        let conn = self.connection().await?;

        let sql = UL::table().delete_sql("user_id = ? AND login_provider = ? AND provider_key = ?");
        sqlx::query(&sql)
            .bind(user.user().id.clone())
            .bind(login_provider)
            .bind(provider_key)
            .execute(conn.pool())
            .await?;
        Ok(())
    }

    async fn get_logins(&self, user: &U) -> StoreResult<Vec<UserLoginInfo>> {
        self.check_disposed()?;
        let conn = self.connection().await?;

        let sql = UL::table().select_sql("user_id = ?");
        let rows = sqlx::query_as::<_, UL>(&sql)
            .bind(user.user().id.clone())
            .fetch_all(conn.pool())
            .await?;
        Ok(rows.iter().map(UserLoginEntity::login_info).collect())
    }

    async fn find_by_login(
        &self,
        login_provider: &str,
        provider_key: &str,
    ) -> StoreResult<Option<U>> {
        self.check_disposed()?;
        require(login_provider, "login_provider")?;
        require(provider_key, "provider_key")?;
        let conn = self.connection().await?;

        let sql = UL::table().select_sql("login_provider = ? AND provider_key = ?");
        let login = sqlx::query_as::<_, UL>(&sql)
            .bind(login_provider)
            .bind(provider_key)
            .fetch_optional(conn.pool())
            .await?;

        match login {
            Some(login) => self.find_user(&conn, login.user_id()).await,
            None => Ok(None),
        }
    }
}

#[async_trait]
impl<K, U, R, UC, UR, UL, UT> UserRoleStore<U> for SqlUserStore<K, U, R, UC, UR, UL, UT>
where
    K: IdentityKey,
    U: UserEntity<Key = K>,
    R: RoleEntity<Key = K>,
    UC: UserClaimEntity<Key = K>,
    UR: UserRoleEntity<Key = K>,
    UL: UserLoginEntity<Key = K>,
    UT: UserTokenEntity<Key = K>,
{
    async fn add_to_role(&self, user: &U, normalized_role_name: &str) -> StoreResult<()> {
        self.check_disposed()?;
        require_role_name(normalized_role_name)?;
        let conn = self.connection().await?;

        let Some(role) = self.find_role(&conn, normalized_role_name).await? else {
            return Err(StoreError::InvalidOperation(format!(
                "Role {normalized_role_name} does not exist."
            )));
        };

        let link = self
            .entities
            .create_user_role(&user.user().id, &role.role().id);
        let sql = UR::table().insert_sql();
        link.bind_columns(sqlx::query(&sql))
            .execute(conn.pool())
            .await?;

        tracing::debug!(
            user_id = ?user.user().id,
            role = normalized_role_name,
            "User added to role"
        );
        Ok(())
    }

    async fn remove_from_role(&self, user: &U, normalized_role_name: &str) -> StoreResult<()> {
        self.check_disposed()?;
        require_role_name(normalized_role_name)?;
        let conn = self.connection().await?;

        if let Some(role) = self.find_role(&conn, normalized_role_name).await? {
            let sql = UR::table().delete_sql("user_id = ? AND role_id = ?");
            sqlx::query(&sql)
                .bind(user.user().id.clone())
                .bind(role.role().id.clone())
                .execute(conn.pool())
                .await?;
        }
        Ok(())
    }

    async fn get_roles(&self, user: &U) -> StoreResult<Vec<String>> {
        self.check_disposed()?;
        let conn = self.connection().await?;

        let sql = format!(
            "SELECT r.* FROM {} r INNER JOIN {} ur ON ur.role_id = r.id WHERE ur.user_id = ?",
            R::table().name(),
            UR::table().name()
        );
        let roles = sqlx::query_as::<_, R>(&sql)
            .bind(user.user().id.clone())
            .fetch_all(conn.pool())
            .await?;
        Ok(roles
            .into_iter()
            .filter_map(|role| role.role().name.clone())
            .collect())
    }

    async fn is_in_role(&self, user: &U, normalized_role_name: &str) -> StoreResult<bool> {
        self.check_disposed()?;
        require_role_name(normalized_role_name)?;
        let conn = self.connection().await?;

        let Some(role) = self.find_role(&conn, normalized_role_name).await? else {
            return Ok(false);
        };
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE user_id = ? AND role_id = ?",
            UR::table().name()
        );
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(user.user().id.clone())
            .bind(role.role().id.clone())
            .fetch_one(conn.pool())
            .await?;
        Ok(count > 0)
    }

    async fn get_users_in_role(&self, normalized_role_name: &str) -> StoreResult<Vec<U>> {
        self.check_disposed()?;
        require_role_name(normalized_role_name)?;
        let conn = self.connection().await?;

        let Some(role) = self.find_role(&conn, normalized_role_name).await? else {
            return Ok(Vec::new());
        };
        let sql = format!(
            "SELECT u.* FROM {} u INNER JOIN {} ur ON ur.user_id = u.id WHERE ur.role_id = ?",
            U::table().name(),
            UR::table().name()
        );
        Ok(sqlx::query_as::<_, U>(&sql)
            .bind(role.role().id.clone())
            .fetch_all(conn.pool())
            .await?)
    }
}

#[async_trait]
impl<K, U, R, UC, UR, UL, UT> UserAuthenticationTokenStore<U>
    for SqlUserStore<K, U, R, UC, UR, UL, UT>
where
    K: IdentityKey,
    U: UserEntity<Key = K>,
    R: RoleEntity<Key = K>,
    UC: UserClaimEntity<Key = K>,
    UR: UserRoleEntity<Key = K>,
    UL: UserLoginEntity<Key = K>,
    UT: UserTokenEntity<Key = K>,
{
    async fn set_token(
        &self,
        user: &U,
        login_provider: &str,
        name: &str,
        value: Option<&str>,
    ) -> StoreResult<()> {
        self.check_disposed()?;
        require(login_provider, "login_provider")?;
        require(name, "name")?;
        let conn = self.connection().await?;

        let table = UT::table();
        let select = table.select_sql(TOKEN_KEY);
        let user_id = &user.user().id;

        let mut tx = conn.begin().await?;
        let existing = sqlx::query_as::<_, UT>(&select)
            .bind(user_id.clone())
            .bind(login_provider)
            .bind(name)
            .fetch_optional(&mut *tx)
            .await?;

        match existing {
            Some(mut token) => {
                token.set_value(value);
                let update = table.update_sql(TOKEN_KEY);
                token
                    .bind_columns(sqlx::query(&update))
                    .bind(user_id.clone())
                    .bind(login_provider)
                    .bind(name)
                    .execute(&mut *tx)
                    .await?;
            }
            None => {
                let token = self
                    .entities
                    .create_user_token(user_id, login_provider, name, value);
                let insert = table.insert_sql();
                token
                    .bind_columns(sqlx::query(&insert))
                    .execute(&mut *tx)
                    .await?;
            }
        }
        tx.commit().await?;
        Ok(())
    }

    async fn remove_token(&self, user: &U, login_provider: &str, name: &str) -> StoreResult<()> {
        self.check_disposed()?;
        require(login_provider, "login_provider")?;
        require(name, "name")?;
        let conn = self.connection().await?;

        let sql = UT::table().delete_sql(TOKEN_KEY);
        sqlx::query(&sql)
            .bind(user.user().id.clone())
            .bind(login_provider)
            .bind(name)
            .execute(conn.pool())
            .await?;
        Ok(())
    }

    async fn get_token(
        &self,
        user: &U,
        login_provider: &str,
        name: &str,
    ) -> StoreResult<Option<String>> {
        self.check_disposed()?;
        require(login_provider, "login_provider")?;
        require(name, "name")?;
        let conn = self.connection().await?;

        let sql = UT::table().select_sql(TOKEN_KEY);
        let token = sqlx::query_as::<_, UT>(&sql)
            .bind(user.user().id.clone())
            .bind(login_provider)
            .bind(name)
            .fetch_optional(conn.pool())
            .await?;
        Ok(token.and_then(|t| t.value().map(str::to_string)))
    }
}

#[async_trait]
impl<K, U, R, UC, UR, UL, UT> UserAttributeStore<U> for SqlUserStore<K, U, R, UC, UR, UL, UT>
where
    K: IdentityKey,
    U: UserEntity<Key = K>,
    R: RoleEntity<Key = K>,
    UC: UserClaimEntity<Key = K>,
    UR: UserRoleEntity<Key = K>,
    UL: UserLoginEntity<Key = K>,
    UT: UserTokenEntity<Key = K>,
{
    async fn find_by_email(&self, normalized_email: &str) -> StoreResult<Option<U>> {
        self.check_disposed()?;
        require(normalized_email, "normalized_email")?;
        let conn = self.connection().await?;

        let sql = U::table().select_sql("normalized_email = ?");
        Ok(sqlx::query_as::<_, U>(&sql)
            .bind(normalized_email)
            .fetch_optional(conn.pool())
            .await?)
    }
}
