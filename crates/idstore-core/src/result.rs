//! Structured operation results.
//!
//! Recoverable failures (concurrency conflicts, duplicate names) are returned as
//! data so the identity manager can report them without treating them as faults.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// A described failure, identified by a stable code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityError {
    /// Machine-readable code (e.g. "ConcurrencyFailure").
    pub code: String,
    /// Human-readable description.
    pub description: String,
}

impl IdentityError {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
        }
    }
}

impl Display for IdentityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.description)
    }
}

/// Outcome of a store or manager operation.
///
/// # Example
///
/// ```
/// use idstore_core::{IdentityError, IdentityResult};
///
/// let ok = IdentityResult::success();
/// assert!(ok.succeeded());
///
/// let failed = IdentityResult::failed([IdentityError::new("DefaultError", "boom")]);
/// assert_eq!(failed.errors().len(), 1);
/// assert!(failed.into_result().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityResult {
    succeeded: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    errors: Vec<IdentityError>,
}

impl IdentityResult {
    /// A successful result.
    #[must_use]
    pub fn success() -> Self {
        Self {
            succeeded: true,
            errors: Vec::new(),
        }
    }

    /// A failed result carrying the given errors.
    pub fn failed(errors: impl IntoIterator<Item = IdentityError>) -> Self {
        Self {
            succeeded: false,
            errors: errors.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    #[must_use]
    pub fn errors(&self) -> &[IdentityError] {
        &self.errors
    }

    /// Returns true if the result failed with an error carrying `code`.
    #[must_use]
    pub fn has_error(&self, code: &str) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }

    /// Converts into a `Result`, for callers that prefer `?` propagation.
    pub fn into_result(self) -> Result<(), IdentityFailure> {
        if self.succeeded {
            Ok(())
        } else {
            Err(IdentityFailure {
                errors: self.errors,
            })
        }
    }
}

impl Display for IdentityResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.succeeded {
            return write!(f, "Succeeded");
        }
        let codes: Vec<&str> = self.errors.iter().map(|e| e.code.as_str()).collect();
        write!(f, "Failed : {}", codes.join(","))
    }
}

/// Error form of a failed [`IdentityResult`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("identity operation failed: {}", join_errors(.errors))]
pub struct IdentityFailure {
    /// The described failures.
    pub errors: Vec<IdentityError>,
}

fn join_errors(errors: &[IdentityError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success() {
        let result = IdentityResult::success();
        assert!(result.succeeded());
        assert!(result.errors().is_empty());
        assert_eq!(result.to_string(), "Succeeded");
        assert!(result.into_result().is_ok());
    }

    #[test]
    fn test_failed_display_lists_codes() {
        let result = IdentityResult::failed([
            IdentityError::new("A", "first"),
            IdentityError::new("B", "second"),
        ]);
        assert!(!result.succeeded());
        assert!(result.has_error("B"));
        assert!(!result.has_error("C"));
        assert_eq!(result.to_string(), "Failed : A,B");
    }

    #[test]
    fn test_into_result_carries_errors() {
        let err = IdentityResult::failed([IdentityError::new("X", "bad")])
            .into_result()
            .unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.to_string(), "identity operation failed: X: bad");
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&IdentityResult::success()).unwrap();
        assert_eq!(json, r#"{"succeeded":true}"#);

        let failed = IdentityResult::failed([IdentityError::new("X", "bad")]);
        let value: serde_json::Value = serde_json::to_value(&failed).unwrap();
        assert_eq!(value["errors"][0]["code"], "X");
    }
}
