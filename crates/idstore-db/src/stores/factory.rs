//! Construction hooks for association rows.
//!
//! Stores never build claim, role-link, login or token rows directly. They
//! ask an injected factory, so applications with custom row types can fill in
//! extra columns (an issuer, a creation date, a context string) at the moment
//! the row is created.

use idstore_core::{Claim, UserLoginInfo};

use crate::key::IdentityKey;
use crate::models::{
    RoleClaimEntity, UserClaimEntity, UserLoginEntity, UserRoleEntity, UserTokenEntity,
};

/// Builds the association rows owned by a user.
///
/// The default methods delegate to the entity types' own constructors.
pub trait UserEntityFactory<K, UC, UR, UL, UT>: Send + Sync
where
    K: IdentityKey,
    UC: UserClaimEntity<Key = K>,
    UR: UserRoleEntity<Key = K>,
    UL: UserLoginEntity<Key = K>,
    UT: UserTokenEntity<Key = K>,
{
    fn create_user_claim(&self, user_id: &K, claim: &Claim) -> UC {
        UC::new_for_user(user_id.clone(), claim)
    }

    fn create_user_role(&self, user_id: &K, role_id: &K) -> UR {
        UR::new_link(user_id.clone(), role_id.clone())
    }

    fn create_user_login(&self, user_id: &K, login: &UserLoginInfo) -> UL {
        UL::new_for_user(user_id.clone(), login)
    }

    fn create_user_token(
        &self,
        user_id: &K,
        login_provider: &str,
        name: &str,
        value: Option<&str>,
    ) -> UT {
        UT::new_for_user(user_id.clone(), login_provider, name, value)
    }
}

/// Builds the claim rows owned by a role.
pub trait RoleEntityFactory<K, RC>: Send + Sync
where
    K: IdentityKey,
    RC: RoleClaimEntity<Key = K>,
{
    fn create_role_claim(&self, role_id: &K, claim: &Claim) -> RC {
        RC::new_for_role(role_id.clone(), claim)
    }
}

/// Factory using the entity constructors for every row type.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEntityFactory;

impl<K, UC, UR, UL, UT> UserEntityFactory<K, UC, UR, UL, UT> for DefaultEntityFactory
where
    K: IdentityKey,
    UC: UserClaimEntity<Key = K>,
    UR: UserRoleEntity<Key = K>,
    UL: UserLoginEntity<Key = K>,
    UT: UserTokenEntity<Key = K>,
{
}

impl<K, RC> RoleEntityFactory<K, RC> for DefaultEntityFactory
where
    K: IdentityKey,
    RC: RoleClaimEntity<Key = K>,
{
}
