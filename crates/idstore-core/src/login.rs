//! External login descriptors.

use serde::{Deserialize, Serialize};

/// Information about an external login linked to a user.
///
/// `(login_provider, provider_key)` identifies the external account uniquely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserLoginInfo {
    /// The provider name (e.g. "google", "github").
    pub login_provider: String,

    /// The user's identifier at the provider.
    pub provider_key: String,

    /// Display name for the provider, shown in UIs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_display_name: Option<String>,
}

impl UserLoginInfo {
    pub fn new(
        login_provider: impl Into<String>,
        provider_key: impl Into<String>,
        provider_display_name: Option<String>,
    ) -> Self {
        Self {
            login_provider: login_provider.into(),
            provider_key: provider_key.into(),
            provider_display_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let login = UserLoginInfo::new("github", "12345", Some("GitHub".to_string()));
        assert_eq!(login.login_provider, "github");
        assert_eq!(login.provider_key, "12345");
        assert_eq!(login.provider_display_name.as_deref(), Some("GitHub"));
    }
}
