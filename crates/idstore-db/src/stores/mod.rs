//! Store capabilities consumed by the identity manager.
//!
//! Each capability is a separate trait so callers can depend on the narrowest
//! surface they need. [`IdentityUserStore`] and [`IdentityRoleStore`] bundle
//! the full sets and are what the service container hands out.
//!
//! Every operation fails with [`StoreError::Disposed`](crate::StoreError::Disposed)
//! once the store has been disposed, before any argument is inspected.

pub mod factory;
pub mod role_store;
pub mod user_store;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use idstore_core::{Claim, IdentityResult, UserLoginInfo};

use crate::error::{StoreError, StoreResult};
use crate::models::{RoleEntity, UserEntity};

pub use factory::{DefaultEntityFactory, RoleEntityFactory, UserEntityFactory};
pub use role_store::SqlRoleStore;
pub use user_store::SqlUserStore;

/// Fails with [`StoreError::MissingArgument`] when `value` is empty.
pub(crate) fn require(value: &str, param: &'static str) -> StoreResult<()> {
    if value.is_empty() {
        return Err(StoreError::MissingArgument { param });
    }
    Ok(())
}

/// User persistence and the user-name accessors.
#[async_trait]
pub trait UserStore<U: UserEntity>: Send + Sync {
    /// Inserts the user.
    ///
    /// Returns a failed result with `DuplicateUserName` when the normalized
    /// name is already taken.
    async fn create(&self, user: &U) -> StoreResult<IdentityResult>;

    /// Writes the user if its concurrency stamp still matches storage.
    ///
    /// On success `user` carries the newly stored stamp. A stale stamp
    /// yields `ConcurrencyFailure` and leaves both storage and `user` as
    /// they were.
    async fn update(&self, user: &mut U) -> StoreResult<IdentityResult>;

    /// Deletes the user if its concurrency stamp still matches storage.
    async fn delete(&self, user: &U) -> StoreResult<IdentityResult>;

    async fn find_by_id(&self, user_id: &U::Key) -> StoreResult<Option<U>>;

    async fn find_by_name(&self, normalized_user_name: &str) -> StoreResult<Option<U>>;

    /// Fails if the store has been disposed.
    fn check_disposed(&self) -> StoreResult<()>;

    /// Marks the store disposed. Irreversible.
    fn dispose(&self);

    fn get_user_id(&self, user: &U) -> StoreResult<U::Key> {
        self.check_disposed()?;
        Ok(user.user().id.clone())
    }

    fn get_user_name(&self, user: &U) -> StoreResult<Option<String>> {
        self.check_disposed()?;
        Ok(user.user().user_name.clone())
    }

    fn set_user_name(&self, user: &mut U, user_name: Option<&str>) -> StoreResult<()> {
        self.check_disposed()?;
        user.user_mut().user_name = user_name.map(str::to_string);
        Ok(())
    }

    fn get_normalized_user_name(&self, user: &U) -> StoreResult<Option<String>> {
        self.check_disposed()?;
        Ok(user.user().normalized_user_name.clone())
    }

    fn set_normalized_user_name(&self, user: &mut U, normalized: Option<&str>) -> StoreResult<()> {
        self.check_disposed()?;
        user.user_mut().normalized_user_name = normalized.map(str::to_string);
        Ok(())
    }
}

/// Claims owned by a user.
#[async_trait]
pub trait UserClaimStore<U: UserEntity>: UserStore<U> {
    async fn get_claims(&self, user: &U) -> StoreResult<Vec<Claim>>;

    async fn add_claims(&self, user: &U, claims: &[Claim]) -> StoreResult<()>;

    /// Rewrites every stored claim of `user` matching `claim` to `new_claim`.
    async fn replace_claim(&self, user: &U, claim: &Claim, new_claim: &Claim) -> StoreResult<()>;

    /// Removes every stored claim of `user` matching one of `claims`.
    async fn remove_claims(&self, user: &U, claims: &[Claim]) -> StoreResult<()>;

    /// Users holding a claim matching `claim`.
    async fn get_users_for_claim(&self, claim: &Claim) -> StoreResult<Vec<U>>;
}

/// External logins linked to a user.
#[async_trait]
pub trait UserLoginStore<U: UserEntity>: UserStore<U> {
    async fn add_login(&self, user: &U, login: &UserLoginInfo) -> StoreResult<()>;

    async fn remove_login(
        &self,
        user: &U,
        login_provider: &str,
        provider_key: &str,
    ) -> StoreResult<()>;

    async fn get_logins(&self, user: &U) -> StoreResult<Vec<UserLoginInfo>>;

    async fn find_by_login(
        &self,
        login_provider: &str,
        provider_key: &str,
    ) -> StoreResult<Option<U>>;
}

/// Role membership, addressed by normalized role name.
#[async_trait]
pub trait UserRoleStore<U: UserEntity>: UserStore<U> {
    /// Fails with [`StoreError::InvalidOperation`] when the role does not exist.
    async fn add_to_role(&self, user: &U, normalized_role_name: &str) -> StoreResult<()>;

    async fn remove_from_role(&self, user: &U, normalized_role_name: &str) -> StoreResult<()>;

    /// Names of the roles `user` belongs to.
    async fn get_roles(&self, user: &U) -> StoreResult<Vec<String>>;

    async fn is_in_role(&self, user: &U, normalized_role_name: &str) -> StoreResult<bool>;

    async fn get_users_in_role(&self, normalized_role_name: &str) -> StoreResult<Vec<U>>;
}

/// Per-provider authentication tokens.
#[async_trait]
pub trait UserAuthenticationTokenStore<U: UserEntity>: UserStore<U> {
    /// Inserts or overwrites the token.
    async fn set_token(
        &self,
        user: &U,
        login_provider: &str,
        name: &str,
        value: Option<&str>,
    ) -> StoreResult<()>;

    async fn remove_token(&self, user: &U, login_provider: &str, name: &str) -> StoreResult<()>;

    async fn get_token(
        &self,
        user: &U,
        login_provider: &str,
        name: &str,
    ) -> StoreResult<Option<String>>;
}

/// Credential, contact and lockout attributes.
///
/// Everything except [`find_by_email`](Self::find_by_email) reads or writes
/// the in-memory entity only; call [`UserStore::update`] to persist.
#[async_trait]
pub trait UserAttributeStore<U: UserEntity>: UserStore<U> {
    async fn find_by_email(&self, normalized_email: &str) -> StoreResult<Option<U>>;

    fn set_password_hash(&self, user: &mut U, password_hash: Option<&str>) -> StoreResult<()> {
        self.check_disposed()?;
        user.user_mut().password_hash = password_hash.map(str::to_string);
        Ok(())
    }

    fn get_password_hash(&self, user: &U) -> StoreResult<Option<String>> {
        self.check_disposed()?;
        Ok(user.user().password_hash.clone())
    }

    fn has_password(&self, user: &U) -> StoreResult<bool> {
        self.check_disposed()?;
        Ok(user.user().password_hash.is_some())
    }

    fn set_security_stamp(&self, user: &mut U, stamp: &str) -> StoreResult<()> {
        self.check_disposed()?;
        require(stamp, "stamp")?;
        user.user_mut().security_stamp = Some(stamp.to_string());
        Ok(())
    }

    fn get_security_stamp(&self, user: &U) -> StoreResult<Option<String>> {
        self.check_disposed()?;
        Ok(user.user().security_stamp.clone())
    }

    fn set_email(&self, user: &mut U, email: Option<&str>) -> StoreResult<()> {
        self.check_disposed()?;
        user.user_mut().email = email.map(str::to_string);
        Ok(())
    }

    fn get_email(&self, user: &U) -> StoreResult<Option<String>> {
        self.check_disposed()?;
        Ok(user.user().email.clone())
    }

    fn set_normalized_email(&self, user: &mut U, normalized: Option<&str>) -> StoreResult<()> {
        self.check_disposed()?;
        user.user_mut().normalized_email = normalized.map(str::to_string);
        Ok(())
    }

    fn get_normalized_email(&self, user: &U) -> StoreResult<Option<String>> {
        self.check_disposed()?;
        Ok(user.user().normalized_email.clone())
    }

    fn set_email_confirmed(&self, user: &mut U, confirmed: bool) -> StoreResult<()> {
        self.check_disposed()?;
        user.user_mut().email_confirmed = confirmed;
        Ok(())
    }

    fn get_email_confirmed(&self, user: &U) -> StoreResult<bool> {
        self.check_disposed()?;
        Ok(user.user().email_confirmed)
    }

    fn set_phone_number(&self, user: &mut U, phone_number: Option<&str>) -> StoreResult<()> {
        self.check_disposed()?;
        user.user_mut().phone_number = phone_number.map(str::to_string);
        Ok(())
    }

    fn get_phone_number(&self, user: &U) -> StoreResult<Option<String>> {
        self.check_disposed()?;
        Ok(user.user().phone_number.clone())
    }

    fn set_phone_number_confirmed(&self, user: &mut U, confirmed: bool) -> StoreResult<()> {
        self.check_disposed()?;
        user.user_mut().phone_number_confirmed = confirmed;
        Ok(())
    }

    fn get_phone_number_confirmed(&self, user: &U) -> StoreResult<bool> {
        self.check_disposed()?;
        Ok(user.user().phone_number_confirmed)
    }

    fn set_two_factor_enabled(&self, user: &mut U, enabled: bool) -> StoreResult<()> {
        self.check_disposed()?;
        user.user_mut().two_factor_enabled = enabled;
        Ok(())
    }

    fn get_two_factor_enabled(&self, user: &U) -> StoreResult<bool> {
        self.check_disposed()?;
        Ok(user.user().two_factor_enabled)
    }

    fn set_lockout_end_date(&self, user: &mut U, end: Option<DateTime<Utc>>) -> StoreResult<()> {
        self.check_disposed()?;
        user.user_mut().lockout_end = end;
        Ok(())
    }

    fn get_lockout_end_date(&self, user: &U) -> StoreResult<Option<DateTime<Utc>>> {
        self.check_disposed()?;
        Ok(user.user().lockout_end)
    }

    fn set_lockout_enabled(&self, user: &mut U, enabled: bool) -> StoreResult<()> {
        self.check_disposed()?;
        user.user_mut().lockout_enabled = enabled;
        Ok(())
    }

    fn get_lockout_enabled(&self, user: &U) -> StoreResult<bool> {
        self.check_disposed()?;
        Ok(user.user().lockout_enabled)
    }

    fn get_access_failed_count(&self, user: &U) -> StoreResult<i32> {
        self.check_disposed()?;
        Ok(user.user().access_failed_count)
    }

    /// Returns the incremented count.
    fn increment_access_failed_count(&self, user: &mut U) -> StoreResult<i32> {
        self.check_disposed()?;
        let inner = user.user_mut();
        inner.access_failed_count = inner.access_failed_count.saturating_add(1);
        Ok(inner.access_failed_count)
    }

    fn reset_access_failed_count(&self, user: &mut U) -> StoreResult<()> {
        self.check_disposed()?;
        user.user_mut().access_failed_count = 0;
        Ok(())
    }
}

/// Every user capability.
pub trait IdentityUserStore<U: UserEntity>:
    UserClaimStore<U>
    + UserLoginStore<U>
    + UserRoleStore<U>
    + UserAuthenticationTokenStore<U>
    + UserAttributeStore<U>
{
}

impl<U, S> IdentityUserStore<U> for S
where
    U: UserEntity,
    S: UserClaimStore<U>
        + UserLoginStore<U>
        + UserRoleStore<U>
        + UserAuthenticationTokenStore<U>
        + UserAttributeStore<U>,
{
}

/// Role persistence and the role-name accessors.
#[async_trait]
pub trait RoleStore<R: RoleEntity>: Send + Sync {
    /// Inserts the role; `DuplicateRoleName` when the normalized name is taken.
    async fn create(&self, role: &R) -> StoreResult<IdentityResult>;

    /// Writes the role if its concurrency stamp still matches storage.
    async fn update(&self, role: &mut R) -> StoreResult<IdentityResult>;

    async fn delete(&self, role: &R) -> StoreResult<IdentityResult>;

    async fn find_by_id(&self, role_id: &R::Key) -> StoreResult<Option<R>>;

    async fn find_by_name(&self, normalized_role_name: &str) -> StoreResult<Option<R>>;

    fn check_disposed(&self) -> StoreResult<()>;

    fn dispose(&self);

    fn get_role_id(&self, role: &R) -> StoreResult<R::Key> {
        self.check_disposed()?;
        Ok(role.role().id.clone())
    }

    fn get_role_name(&self, role: &R) -> StoreResult<Option<String>> {
        self.check_disposed()?;
        Ok(role.role().name.clone())
    }

    fn set_role_name(&self, role: &mut R, name: Option<&str>) -> StoreResult<()> {
        self.check_disposed()?;
        role.role_mut().name = name.map(str::to_string);
        Ok(())
    }

    fn get_normalized_role_name(&self, role: &R) -> StoreResult<Option<String>> {
        self.check_disposed()?;
        Ok(role.role().normalized_name.clone())
    }

    fn set_normalized_role_name(&self, role: &mut R, normalized: Option<&str>) -> StoreResult<()> {
        self.check_disposed()?;
        role.role_mut().normalized_name = normalized.map(str::to_string);
        Ok(())
    }
}

/// Claims owned by a role.
#[async_trait]
pub trait RoleClaimStore<R: RoleEntity>: RoleStore<R> {
    async fn get_claims(&self, role: &R) -> StoreResult<Vec<Claim>>;

    async fn add_claim(&self, role: &R, claim: &Claim) -> StoreResult<()>;

    /// Removes every stored claim of `role` matching `claim`.
    async fn remove_claim(&self, role: &R, claim: &Claim) -> StoreResult<()>;
}

/// Every role capability.
pub trait IdentityRoleStore<R: RoleEntity>: RoleClaimStore<R> {}

impl<R: RoleEntity, S: RoleClaimStore<R>> IdentityRoleStore<R> for S {}
