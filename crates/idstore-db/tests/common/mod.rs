//! Integration test helpers for idstore-db.
//!
//! Every [`TestContext`] owns a private in-memory SQLite database with the
//! identity schema already created.
//!
//! # Usage
//!
//! ```ignore
//! use crate::common::TestContext;
//!
//! #[tokio::test]
//! async fn my_integration_test() {
//!     let ctx = TestContext::new().await;
//!     let users = ctx.user_store::<String>();
//!     // ...
//! }
//! ```

#![allow(dead_code)]

use std::sync::{Arc, Once};

use idstore_core::{LookupNormalizer, UpperInvariantNormalizer};
use idstore_db::models::{
    IdentityRole, IdentityRoleClaim, IdentityUser, IdentityUserClaim, IdentityUserLogin,
    IdentityUserRole, IdentityUserToken, RoleClaimEntity, RoleEntity, UserClaimEntity,
    UserEntity, UserLoginEntity, UserRoleEntity, UserTokenEntity,
};
use idstore_db::stores::{SqlRoleStore, SqlUserStore};
use idstore_db::{
    create_default_tables, create_identity_tables, ConnectionFactory, DataConnection,
    DefaultConnectionFactory, IdentityKey, StoreConfig,
};

static INIT: Once = Once::new();

/// Initialize logging for tests (once).
pub fn init_test_logging() {
    INIT.call_once(|| {
        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init()
                .ok();
        }
    });
}

/// User store over the standard entity types keyed by `K`.
pub type DefaultUserStore<K> = SqlUserStore<
    K,
    IdentityUser<K>,
    IdentityRole<K>,
    IdentityUserClaim<K>,
    IdentityUserRole<K>,
    IdentityUserLogin<K>,
    IdentityUserToken<K>,
>;

/// Role store over the standard entity types keyed by `K`.
pub type DefaultRoleStore<K> = SqlRoleStore<K, IdentityRole<K>, IdentityRoleClaim<K>>;

/// Test context holding the connection factory of one database.
pub struct TestContext {
    pub factory: Arc<DefaultConnectionFactory>,
    pub conn: DataConnection,
}

impl TestContext {
    /// Fresh database with the standard tables keyed by `String`.
    pub async fn new() -> Self {
        Self::with_key::<String>().await
    }

    /// Fresh database with the standard tables keyed by `K`.
    pub async fn with_key<K: IdentityKey>() -> Self {
        let ctx = Self::empty().await;
        create_default_tables::<K>(&ctx.conn)
            .await
            .expect("Failed to create identity tables");
        ctx
    }

    /// Fresh database with tables for a custom entity set.
    pub async fn with_entities<U, R, UC, UR, UL, UT, RC>() -> Self
    where
        U: UserEntity,
        R: RoleEntity<Key = U::Key>,
        UC: UserClaimEntity<Key = U::Key>,
        UR: UserRoleEntity<Key = U::Key>,
        UL: UserLoginEntity<Key = U::Key>,
        UT: UserTokenEntity<Key = U::Key>,
        RC: RoleClaimEntity<Key = U::Key>,
    {
        let ctx = Self::empty().await;
        create_identity_tables::<U, R, UC, UR, UL, UT, RC>(&ctx.conn)
            .await
            .expect("Failed to create identity tables");
        ctx
    }

    async fn empty() -> Self {
        init_test_logging();

        let factory = Arc::new(DefaultConnectionFactory::new(StoreConfig::in_memory()));
        let conn = factory
            .connection()
            .await
            .expect("Failed to open in-memory database");
        Self { factory, conn }
    }

    pub fn connections(&self) -> Arc<dyn ConnectionFactory> {
        self.factory.clone()
    }

    pub fn user_store<K: IdentityKey>(&self) -> DefaultUserStore<K> {
        SqlUserStore::new(self.connections())
    }

    pub fn role_store<K: IdentityKey>(&self) -> DefaultRoleStore<K> {
        SqlRoleStore::new(self.connections())
    }

    /// Count rows of a table.
    pub async fn count(&self, table: &str) -> i64 {
        let row: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(self.conn.pool())
            .await
            .expect("Failed to count rows");
        row.0
    }
}

/// A user with normalized name and email filled in.
pub fn test_user<K: IdentityKey>(id: K, name: &str) -> IdentityUser<K> {
    let mut user = IdentityUser::new(id, name);
    user.normalized_user_name = Some(UpperInvariantNormalizer.normalize_name(name));
    let email = format!("{name}@example.com");
    user.normalized_email = Some(UpperInvariantNormalizer.normalize_email(&email));
    user.email = Some(email);
    user
}

/// A role with its normalized name filled in.
pub fn test_role<K: IdentityKey>(id: K, name: &str) -> IdentityRole<K> {
    let mut role = IdentityRole::new(id, name);
    role.normalized_name = Some(UpperInvariantNormalizer.normalize_name(name));
    role
}

/// A fresh string id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
