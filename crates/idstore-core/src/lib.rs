//! idstore Core Library
//!
//! Value types shared between the identity manager and the stores that persist
//! its entities.
//!
//! # Modules
//!
//! - [`claims`] - Claims asserted about a user or role
//! - [`login`] - External login descriptors
//! - [`result`] - Structured operation results (`IdentityResult`, `IdentityError`)
//! - [`describer`] - Error descriptions for recoverable store failures
//! - [`normalizer`] - Lookup key normalization
//!
//! # Example
//!
//! ```
//! use idstore_core::{Claim, DefaultErrorDescriber, ErrorDescriber, IdentityResult};
//!
//! let claim = Claim::new("department", "finance");
//! assert_eq!(claim.claim_type, "department");
//!
//! let describer = DefaultErrorDescriber;
//! let result = IdentityResult::failed([describer.concurrency_failure()]);
//! assert!(!result.succeeded());
//! ```

pub mod claims;
pub mod describer;
pub mod login;
pub mod normalizer;
pub mod result;

pub use claims::Claim;
pub use describer::{DefaultErrorDescriber, ErrorDescriber};
pub use login::UserLoginInfo;
pub use normalizer::{LookupNormalizer, UpperInvariantNormalizer};
pub use result::{IdentityError, IdentityFailure, IdentityResult};
