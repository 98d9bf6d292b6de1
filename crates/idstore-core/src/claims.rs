//! Claims
//!
//! A claim is a `(type, value, issuer)` triple describing an attribute asserted
//! about a user or role. Stores persist claims as rows owned by the user or role.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// A statement about a subject, as consumed by authorization logic.
///
/// # Example
///
/// ```
/// use idstore_core::Claim;
///
/// let claim = Claim::new("role", "auditor").with_issuer("corp-ldap");
/// assert_eq!(claim.issuer.as_deref(), Some("corp-ldap"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Claim {
    /// The claim type (e.g. "email", "department").
    #[serde(rename = "type")]
    pub claim_type: String,

    /// The claim value.
    pub value: String,

    /// Who asserted the claim, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
}

impl Claim {
    /// Creates a claim without an issuer.
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
            issuer: None,
        }
    }

    /// Sets the issuer of this claim.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Returns true if both claims share type and value, ignoring the issuer.
    #[must_use]
    pub fn same_type_and_value(&self, other: &Claim) -> bool {
        self.claim_type == other.claim_type && self.value == other.value
    }
}

impl Display for Claim {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.claim_type, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_has_no_issuer() {
        let claim = Claim::new("c", "v");
        assert_eq!(claim.claim_type, "c");
        assert_eq!(claim.value, "v");
        assert!(claim.issuer.is_none());
    }

    #[test]
    fn test_same_type_and_value_ignores_issuer() {
        let a = Claim::new("c", "v").with_issuer("i1");
        let b = Claim::new("c", "v").with_issuer("i2");
        assert!(a.same_type_and_value(&b));
        assert_ne!(a, b);
        assert!(!a.same_type_and_value(&Claim::new("c", "other")));
    }

    #[test]
    fn test_display() {
        assert_eq!(Claim::new("dept", "finance").to_string(), "dept: finance");
    }

    #[test]
    fn test_serialization_uses_type_key() {
        let json = serde_json::to_string(&Claim::new("dept", "finance")).unwrap();
        assert!(json.contains("\"type\":\"dept\""));
        assert!(!json.contains("issuer"));

        let parsed: Claim =
            serde_json::from_str(r#"{"type":"c","value":"v","issuer":"i"}"#).unwrap();
        assert_eq!(parsed, Claim::new("c", "v").with_issuer("i"));
    }
}
