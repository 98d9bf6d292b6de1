//! Schema management for the identity tables.
//!
//! Tables are created from the entity definitions, so extended entity types
//! get their extra columns without hand-written DDL.

use crate::connection::DataConnection;
use crate::error::DbError;
use crate::key::IdentityKey;
use crate::models::{
    IdentityRole, IdentityRoleClaim, IdentityUser, IdentityUserClaim, IdentityUserLogin,
    IdentityUserRole, IdentityUserToken, RoleClaimEntity, RoleEntity, UserClaimEntity,
    UserEntity, UserLoginEntity, UserRoleEntity, UserTokenEntity,
};

/// Create every identity table for the given entity types.
///
/// Parents are created before the tables referencing them.
///
/// # Example
///
/// ```rust,ignore
/// use idstore_db::migrations::create_identity_tables;
/// use idstore_db::models::*;
///
/// create_identity_tables::<
///     IdentityUser<String>,
///     IdentityRole<String>,
///     IdentityUserClaim<String>,
///     IdentityUserRole<String>,
///     IdentityUserLogin<String>,
///     IdentityUserToken<String>,
///     IdentityRoleClaim<String>,
/// >(&conn)
/// .await?;
/// ```
///
/// # Errors
///
/// Returns `DbError::QueryFailed` if any statement fails.
pub async fn create_identity_tables<U, R, UC, UR, UL, UT, RC>(
    conn: &DataConnection,
) -> Result<(), DbError>
where
    U: UserEntity,
    R: RoleEntity<Key = U::Key>,
    UC: UserClaimEntity<Key = U::Key>,
    UR: UserRoleEntity<Key = U::Key>,
    UL: UserLoginEntity<Key = U::Key>,
    UT: UserTokenEntity<Key = U::Key>,
    RC: RoleClaimEntity<Key = U::Key>,
{
    tracing::info!("Creating identity tables...");

    conn.create_table::<U>().await?;
    conn.create_table::<R>().await?;
    conn.create_table::<UC>().await?;
    conn.create_table::<UR>().await?;
    conn.create_table::<UL>().await?;
    conn.create_table::<UT>().await?;
    conn.create_table::<RC>().await?;

    tracing::info!("Identity tables created successfully");
    Ok(())
}

/// Drop every identity table for the given entity types, children first.
pub async fn drop_identity_tables<U, R, UC, UR, UL, UT, RC>(
    conn: &DataConnection,
) -> Result<(), DbError>
where
    U: UserEntity,
    R: RoleEntity<Key = U::Key>,
    UC: UserClaimEntity<Key = U::Key>,
    UR: UserRoleEntity<Key = U::Key>,
    UL: UserLoginEntity<Key = U::Key>,
    UT: UserTokenEntity<Key = U::Key>,
    RC: RoleClaimEntity<Key = U::Key>,
{
    conn.drop_table::<RC>().await?;
    conn.drop_table::<UT>().await?;
    conn.drop_table::<UL>().await?;
    conn.drop_table::<UR>().await?;
    conn.drop_table::<UC>().await?;
    conn.drop_table::<R>().await?;
    conn.drop_table::<U>().await?;

    tracing::info!("Identity tables dropped");
    Ok(())
}

/// Create the standard identity tables keyed by `K`.
pub async fn create_default_tables<K: IdentityKey>(conn: &DataConnection) -> Result<(), DbError> {
    create_identity_tables::<
        IdentityUser<K>,
        IdentityRole<K>,
        IdentityUserClaim<K>,
        IdentityUserRole<K>,
        IdentityUserLogin<K>,
        IdentityUserToken<K>,
        IdentityRoleClaim<K>,
    >(conn)
    .await
}

/// Drop the standard identity tables keyed by `K`.
pub async fn drop_default_tables<K: IdentityKey>(conn: &DataConnection) -> Result<(), DbError> {
    drop_identity_tables::<
        IdentityUser<K>,
        IdentityRole<K>,
        IdentityUserClaim<K>,
        IdentityUserRole<K>,
        IdentityUserLogin<K>,
        IdentityUserToken<K>,
        IdentityRoleClaim<K>,
    >(conn)
    .await
}
