//! Error descriptions for recoverable store failures.
//!
//! Stores report concurrency conflicts and duplicate names through an
//! [`ErrorDescriber`], so hosts can localize or rephrase messages without
//! touching the stores.

use crate::result::IdentityError;

/// Produces the [`IdentityError`] values surfaced in failed results.
///
/// Every method has a default; override only the messages you need.
///
/// # Example
///
/// ```
/// use idstore_core::{ErrorDescriber, IdentityError};
///
/// struct Terse;
///
/// impl ErrorDescriber for Terse {
///     fn concurrency_failure(&self) -> IdentityError {
///         IdentityError::new("ConcurrencyFailure", "stale copy")
///     }
/// }
///
/// assert_eq!(Terse.concurrency_failure().description, "stale copy");
/// assert_eq!(Terse.default_error().code, "DefaultError");
/// ```
pub trait ErrorDescriber: Send + Sync {
    fn default_error(&self) -> IdentityError {
        IdentityError::new("DefaultError", "An unknown failure has occurred.")
    }

    /// The row was changed or removed since the caller read it.
    fn concurrency_failure(&self) -> IdentityError {
        IdentityError::new(
            "ConcurrencyFailure",
            "Optimistic concurrency failure, object has been modified.",
        )
    }

    fn duplicate_user_name(&self, user_name: &str) -> IdentityError {
        IdentityError::new(
            "DuplicateUserName",
            format!("User name '{user_name}' is already taken."),
        )
    }

    fn duplicate_email(&self, email: &str) -> IdentityError {
        IdentityError::new("DuplicateEmail", format!("Email '{email}' is already taken."))
    }

    fn duplicate_role_name(&self, role: &str) -> IdentityError {
        IdentityError::new(
            "DuplicateRoleName",
            format!("Role name '{role}' is already taken."),
        )
    }

    fn invalid_user_name(&self, user_name: &str) -> IdentityError {
        IdentityError::new(
            "InvalidUserName",
            format!("User name '{user_name}' is invalid, can only contain letters or digits."),
        )
    }

    fn invalid_role_name(&self, role: &str) -> IdentityError {
        IdentityError::new("InvalidRoleName", format!("Role name '{role}' is invalid."))
    }

    fn login_already_associated(&self) -> IdentityError {
        IdentityError::new(
            "LoginAlreadyAssociated",
            "A user with this login already exists.",
        )
    }

    fn user_already_in_role(&self, role: &str) -> IdentityError {
        IdentityError::new("UserAlreadyInRole", format!("User already in role '{role}'."))
    }

    fn user_not_in_role(&self, role: &str) -> IdentityError {
        IdentityError::new("UserNotInRole", format!("User is not in role '{role}'."))
    }
}

/// The standard messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorDescriber;

impl ErrorDescriber for DefaultErrorDescriber {}
