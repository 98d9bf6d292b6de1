//! Identity entity models.
//!
//! Each entity family has a base row type (`IdentityUser`, `IdentityRole`, ...)
//! and a trait (`UserEntity`, `RoleEntity`, ...) that stores are generic over.
//! Custom row types implement the trait to add columns or change how claims
//! are matched; the base types implement it with the standard columns.

pub mod role;
pub mod role_claim;
pub mod user;
pub mod user_claim;
pub mod user_login;
pub mod user_role;
pub mod user_token;

pub use role::{IdentityRole, RoleEntity};
pub use role_claim::{IdentityRoleClaim, RoleClaimEntity};
pub use user::{IdentityUser, UserEntity};
pub use user_claim::{IdentityUserClaim, UserClaimEntity};
pub use user_login::{IdentityUserLogin, UserLoginEntity};
pub use user_role::{IdentityUserRole, UserRoleEntity};
pub use user_token::{IdentityUserToken, UserTokenEntity};

/// Table names of the standard schema.
pub mod tables {
    pub const USERS: &str = "users";
    pub const ROLES: &str = "roles";
    pub const USER_CLAIMS: &str = "user_claims";
    pub const USER_ROLES: &str = "user_roles";
    pub const USER_LOGINS: &str = "user_logins";
    pub const USER_TOKENS: &str = "user_tokens";
    pub const ROLE_CLAIMS: &str = "role_claims";
}
